//! sol2move command line interface
//!
//! A thin wrapper around the transpile API: argument parsing, file IO and
//! colored diagnostics live here; everything else is the library. Exit
//! code 0 on success, 1 on any error.
//!
//! Usage:
//!   sol2move convert <INPUT.json> [options]
//!
//! The input is a Source AST as tagged JSON, produced by an external
//! parser frontend.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use sol2move::{
    transpile, CallStyle, Diagnostic, OptimizationLevel, Severity, TranspileOptions,
    TranspileOutput,
};

fn main() -> ExitCode {
    let matches = Command::new("sol2move")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Transpile Solidity-style contract ASTs to Aptos Move modules")
        .subcommand_required(true)
        .subcommand(
            Command::new("convert")
                .about("Convert a Source AST (tagged JSON) into Move modules")
                .arg(
                    Arg::new("input")
                        .help("Source AST file (tagged JSON)")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .value_name("DIR")
                        .help("Output directory")
                        .default_value("./output"),
                )
                .arg(
                    Arg::new("address")
                        .long("address")
                        .value_name("HEX")
                        .help("Module address printed in headers and the manifest")
                        .default_value("0xCAFE"),
                )
                .arg(
                    Arg::new("package")
                        .long("package")
                        .value_name("NAME")
                        .help("Package name for the manifest"),
                )
                .arg(
                    Arg::new("no-manifest")
                        .long("no-manifest")
                        .help("Skip Move.toml generation")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("fungible-asset")
                        .long("fungible-asset")
                        .help("Lower ERC-20-shaped contracts to the fungible-asset template")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("digital-asset")
                        .long("digital-asset")
                        .help("Lower ERC-721-shaped contracts to the digital-asset template")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("context-dir")
                        .long("context-dir")
                        .value_name("DIR")
                        .help("Directory of additional Source AST files used for resolution only"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .help("Post-process output through the external formatter when wired")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("compile-check")
                        .long("compile-check")
                        .help("Run the external compile check when a compiler is wired")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("specs")
                        .long("specs")
                        .help("Include derived specification blocks")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("optimize")
                        .long("optimize")
                        .value_name("LEVEL")
                        .help("Resource partition: low, medium or high")
                        .default_value("medium"),
                )
                .arg(
                    Arg::new("call-style")
                        .long("call-style")
                        .value_name("STYLE")
                        .help("Call syntax: module or receiver")
                        .default_value("module"),
                )
                .arg(
                    Arg::new("index-notation")
                        .long("index-notation")
                        .help("Render vector and global borrows with bracket indexing")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the full result payload as JSON to stdout")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("convert", sub)) => run_convert(sub),
        _ => ExitCode::FAILURE,
    }
}

fn run_convert(matches: &clap::ArgMatches) -> ExitCode {
    let input = matches.get_one::<String>("input").expect("required arg");
    let out_dir = PathBuf::from(matches.get_one::<String>("out-dir").expect("has default"));

    let source = match fs::read_to_string(input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read `{}`: {}", input, err);
            return ExitCode::FAILURE;
        }
    };

    let level = matches.get_one::<String>("optimize").expect("has default");
    let optimization_level = match OptimizationLevel::parse(level) {
        Some(level) => level,
        None => {
            eprintln!("error: unknown optimization level `{}`", level);
            return ExitCode::FAILURE;
        }
    };
    let call_style = match matches
        .get_one::<String>("call-style")
        .expect("has default")
        .as_str()
    {
        "module" => CallStyle::ModuleQualified,
        "receiver" => CallStyle::Receiver,
        other => {
            eprintln!("error: unknown call style `{}`", other);
            return ExitCode::FAILURE;
        }
    };

    let mut options = TranspileOptions {
        module_address: matches
            .get_one::<String>("address")
            .expect("has default")
            .clone(),
        package_name: matches.get_one::<String>("package").cloned(),
        generate_manifest: !matches.get_flag("no-manifest"),
        target_as_fungible_asset: matches.get_flag("fungible-asset"),
        target_as_digital_asset: matches.get_flag("digital-asset"),
        format: matches.get_flag("format"),
        compile_check: matches.get_flag("compile-check"),
        generate_specs: matches.get_flag("specs"),
        optimization_level,
        call_style,
        index_notation: matches.get_flag("index-notation"),
        ..TranspileOptions::default()
    };

    if let Some(context_dir) = matches.get_one::<String>("context-dir") {
        options.context_sources = collect_context_sources(Path::new(context_dir));
    }

    let output = transpile(&source, &options);

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(err) => eprintln!("error: cannot serialize result: {}", err),
        }
    } else {
        report_diagnostics(&output);
    }

    if output.success {
        if let Err(err) = output.write_to_dir(&out_dir) {
            eprintln!("error: cannot write output: {}", err);
            return ExitCode::FAILURE;
        }
        if !matches.get_flag("json") {
            for module in &output.modules {
                println!(
                    "wrote {}",
                    out_dir
                        .join("sources")
                        .join(format!("{}.move", module.name))
                        .display()
                );
            }
            if output.manifest.is_some() {
                println!("wrote {}", out_dir.join("Move.toml").display());
            }
        }
    }

    if output.success && output.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Every `.json` file under the context directory, in path order
fn collect_context_sources(dir: &Path) -> Vec<String> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().map(|e| e == "json").unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
        .into_iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .collect()
}

fn report_diagnostics(output: &TranspileOutput) {
    let choice = if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);
    for diagnostic in output.errors.iter().chain(output.warnings.iter()) {
        print_diagnostic(&mut stderr, diagnostic);
    }
}

fn print_diagnostic(stream: &mut StandardStream, diagnostic: &Diagnostic) {
    let (label, color) = match diagnostic.severity {
        Severity::Error => ("error", Color::Red),
        Severity::Warning => ("warning", Color::Yellow),
    };
    let _ = stream.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stream, "{}", label);
    let _ = stream.reset();
    let _ = writeln!(stream, ": {}", diagnostic.message);
}

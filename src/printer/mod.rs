//! Target printer
//!
//! Deterministic concrete-syntax emission for the Target AST: the same AST
//! always yields identical bytes. Two rendering options exist, both purely
//! syntactic:
//!
//! - call style: module-qualified (`table::borrow(&t, k)`) or receiver
//!   (`t.borrow(k)`) for a closed allow-list of standard-library functions;
//! - index notation: vector borrows render as `v[i]` and global borrows as
//!   `T[@addr]`.
//!
//! Numeric literals in scientific notation are expanded to decimal digit
//! strings, leading zeros are stripped, hex passes through. A literal that
//! already carries the suffix of an enclosing cast prints without the cast.

use regex::Regex;

use crate::move_ast::{
    AbilitySet, ConstantDef, MoveBinOp, MoveExpr, MoveExprKind, MoveFunction, MoveModule,
    MoveStmt, MoveStructDef, MoveType, MoveVisibility, SpecBlock, SpecTargetKind, UseDecl,
};
use crate::options::CallStyle;

const INDENT: &str = "    ";

/// Rendering options, a strict subset of the transpile options
#[derive(Debug, Clone)]
pub struct PrinterOptions {
    pub call_style: CallStyle,
    pub index_notation: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        PrinterOptions {
            call_style: CallStyle::ModuleQualified,
            index_notation: false,
        }
    }
}

/// Standard-library functions the receiver style may rewrite. First
/// argument must be the receiver (possibly behind `&`/`&mut`, which the
/// rewrite strips — the Target infers the borrow).
const RECEIVER_FUNCTIONS: &[(&str, &[&str])] = &[
    (
        "vector",
        &[
            "borrow",
            "borrow_mut",
            "push_back",
            "pop_back",
            "length",
            "contains",
            "is_empty",
        ],
    ),
    (
        "table",
        &[
            "borrow",
            "borrow_mut",
            "borrow_with_default",
            "add",
            "upsert",
            "remove",
            "contains",
        ],
    ),
    ("string", &["length", "append", "bytes", "is_empty"]),
    ("option", &["is_some", "is_none", "borrow", "extract"]),
    ("simple_map", &["borrow", "contains_key", "add", "upsert"]),
];

fn is_receiver_function(module: &str, func: &str) -> bool {
    RECEIVER_FUNCTIONS
        .iter()
        .any(|(m, funcs)| *m == module && funcs.contains(&func))
}

/// Render a single expression with the given options
pub fn render_expr(expr: &MoveExpr, options: &PrinterOptions) -> String {
    MovePrinter::new(options.clone()).expr_str(expr)
}

/// Deterministic emitter for Target modules
pub struct MovePrinter {
    options: PrinterOptions,
}

impl Default for MovePrinter {
    fn default() -> Self {
        MovePrinter::new(PrinterOptions::default())
    }
}

impl MovePrinter {
    pub fn new(options: PrinterOptions) -> Self {
        MovePrinter { options }
    }

    /// Print a whole module
    pub fn print_module(&self, module: &MoveModule) -> String {
        let mut out = String::new();
        out.push_str(&format!("module {}::{} {{\n", module.address, module.name));

        for use_decl in &module.uses {
            out.push_str(&self.use_line(use_decl));
        }
        if !module.uses.is_empty() {
            out.push('\n');
        }

        for friend in &module.friends {
            out.push_str(&format!("{}friend {};\n", INDENT, friend));
        }
        if !module.friends.is_empty() {
            out.push('\n');
        }

        for constant in &module.constants {
            out.push_str(&self.constant_lines(constant));
        }
        if !module.constants.is_empty() {
            out.push('\n');
        }

        for struct_def in &module.structs {
            out.push_str(&self.struct_lines(struct_def));
            if let Some(spec) = self.spec_for(module, SpecTargetKind::Struct, &struct_def.name) {
                out.push_str(&self.spec_lines(spec));
            }
            out.push('\n');
        }

        for function in &module.functions {
            out.push_str(&self.function_lines(function));
            if let Some(spec) = self.spec_for(module, SpecTargetKind::Function, &function.name) {
                out.push_str(&self.spec_lines(spec));
            }
            out.push('\n');
        }

        if let Some(spec) = self.spec_for(module, SpecTargetKind::Module, &module.name) {
            out.push_str(&self.spec_lines(spec));
            out.push('\n');
        }

        // Drop the blank line before the closing brace.
        while out.ends_with("\n\n") {
            out.pop();
        }
        out.push_str("}\n");
        out
    }

    fn spec_for<'s>(
        &self,
        module: &'s MoveModule,
        kind: SpecTargetKind,
        target: &str,
    ) -> Option<&'s SpecBlock> {
        module
            .specs
            .iter()
            .find(|s| s.kind == kind && s.target == target && !s.is_empty())
    }

    fn use_line(&self, use_decl: &UseDecl) -> String {
        if use_decl.members.is_empty() {
            format!("{}use {};\n", INDENT, use_decl.path)
        } else {
            format!(
                "{}use {}::{{{}}};\n",
                INDENT,
                use_decl.path,
                use_decl.members.join(", ")
            )
        }
    }

    fn constant_lines(&self, constant: &ConstantDef) -> String {
        let mut out = String::new();
        if let Some(doc) = &constant.doc {
            out.push_str(&format!("{}/// {}\n", INDENT, doc));
        }
        out.push_str(&format!(
            "{}const {}: {} = {};\n",
            INDENT,
            constant.name,
            self.type_str(&constant.ty),
            constant.value
        ));
        out
    }

    fn struct_lines(&self, struct_def: &MoveStructDef) -> String {
        let mut out = String::new();
        if struct_def.is_event {
            out.push_str(&format!("{}#[event]\n", INDENT));
        }
        out.push_str(&format!(
            "{}struct {}{} {{\n",
            INDENT,
            struct_def.name,
            self.abilities_str(&struct_def.abilities)
        ));
        for field in &struct_def.fields {
            out.push_str(&format!(
                "{}{}{}: {},\n",
                INDENT,
                INDENT,
                field.name,
                self.type_str(&field.ty)
            ));
        }
        out.push_str(&format!("{}}}\n", INDENT));
        out
    }

    fn abilities_str(&self, abilities: &AbilitySet) -> String {
        if abilities.is_empty() {
            String::new()
        } else {
            format!(" has {}", abilities.names().join(", "))
        }
    }

    fn function_lines(&self, function: &MoveFunction) -> String {
        let mut out = String::new();
        if function.is_view {
            out.push_str(&format!("{}#[view]\n", INDENT));
        }

        let mut header = String::new();
        header.push_str(INDENT);
        match function.visibility {
            MoveVisibility::Private => {}
            MoveVisibility::Public => header.push_str("public "),
            MoveVisibility::Friend => header.push_str("public(friend) "),
            MoveVisibility::Package => header.push_str("public(package) "),
        }
        if function.is_entry {
            header.push_str("entry ");
        }
        if function.is_inline {
            header.push_str("inline ");
        }
        header.push_str("fun ");
        header.push_str(&function.name);
        header.push('(');
        let params: Vec<String> = function
            .params
            .iter()
            .map(|(name, ty)| format!("{}: {}", name, self.type_str(ty)))
            .collect();
        header.push_str(&params.join(", "));
        header.push(')');
        match function.returns.as_slice() {
            [] => {}
            [single] => header.push_str(&format!(": {}", self.type_str(single))),
            multiple => {
                let items: Vec<String> =
                    multiple.iter().map(|ty| self.type_str(ty)).collect();
                header.push_str(&format!(": ({})", items.join(", ")));
            }
        }
        if !function.acquires.is_empty() {
            header.push_str(&format!(" acquires {}", function.acquires.join(", ")));
        }
        header.push_str(" {\n");
        out.push_str(&header);

        for stmt in &function.body {
            out.push_str(&self.stmt_lines(stmt, 2));
        }
        out.push_str(&format!("{}}}\n", INDENT));
        out
    }

    // -------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------

    fn stmt_lines(&self, stmt: &MoveStmt, depth: usize) -> String {
        let pad = INDENT.repeat(depth);
        match stmt {
            MoveStmt::Let { name, ty, value } => match (ty, value) {
                (Some(ty), Some(value)) => format!(
                    "{}let {}: {} = {};\n",
                    pad,
                    name,
                    self.type_str(ty),
                    self.expr_str(value)
                ),
                (Some(ty), None) => format!("{}let {}: {};\n", pad, name, self.type_str(ty)),
                (None, Some(value)) => {
                    format!("{}let {} = {};\n", pad, name, self.expr_str(value))
                }
                (None, None) => format!("{}let {};\n", pad, name),
            },
            MoveStmt::LetTuple { names, value } => format!(
                "{}let ({}) = {};\n",
                pad,
                names.join(", "),
                self.expr_str(value)
            ),
            MoveStmt::Assign { target, value } => format!(
                "{}{} = {};\n",
                pad,
                self.expr_str(target),
                self.expr_str(value)
            ),
            MoveStmt::Expr(expr) => match &expr.kind {
                MoveExprKind::Unsupported { pattern } => {
                    format!("{}/* unsupported: {} */\n", pad, pattern)
                }
                _ => format!("{}{};\n", pad, self.expr_str(expr)),
            },
            MoveStmt::If {
                cond,
                then_block,
                else_block,
            } => {
                // If-statements take the trailing terminator required by
                // the Target grammar.
                let mut out = format!("{}if ({}) {{\n", pad, self.expr_str(cond));
                for inner in then_block {
                    out.push_str(&self.stmt_lines(inner, depth + 1));
                }
                match else_block {
                    Some(else_block) => {
                        out.push_str(&format!("{}}} else {{\n", pad));
                        for inner in else_block {
                            out.push_str(&self.stmt_lines(inner, depth + 1));
                        }
                        out.push_str(&format!("{}}};\n", pad));
                    }
                    None => out.push_str(&format!("{}}};\n", pad)),
                }
                out
            }
            MoveStmt::While { cond, body } => {
                let mut out = format!("{}while ({}) {{\n", pad, self.expr_str(cond));
                for inner in body {
                    out.push_str(&self.stmt_lines(inner, depth + 1));
                }
                out.push_str(&format!("{}}};\n", pad));
                out
            }
            MoveStmt::Return(Some(value)) => {
                format!("{}return {};\n", pad, self.expr_str(value))
            }
            MoveStmt::Return(None) => format!("{}return;\n", pad),
            MoveStmt::Abort(code) => format!("{}abort {};\n", pad, self.expr_str(code)),
            MoveStmt::Break => format!("{}break;\n", pad),
            MoveStmt::Continue => format!("{}continue;\n", pad),
            MoveStmt::Unsupported { pattern } => {
                format!("{}/* unsupported: {} */\n", pad, pattern)
            }
        }
    }

    // -------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------

    pub fn expr_str(&self, expr: &MoveExpr) -> String {
        match &expr.kind {
            MoveExprKind::Literal { digits, suffix } => {
                let text = normalize_literal(digits);
                match suffix {
                    Some(ty) => format!("{}{}", text, ty.suffix().unwrap_or("")),
                    None => text,
                }
            }
            MoveExprKind::BoolLit(value) => value.to_string(),
            MoveExprKind::AddressLit(addr) => format!("@{}", addr),
            MoveExprKind::ByteStringLit(text) => format!("b\"{}\"", text),
            MoveExprKind::Ident(name) => name.clone(),
            MoveExprKind::Borrow { mutable, expr } => {
                format!(
                    "&{}{}",
                    if *mutable { "mut " } else { "" },
                    self.operand_str(expr)
                )
            }
            MoveExprKind::Deref(inner) => {
                if self.options.index_notation {
                    if let Some(text) = self.vector_index_str(inner) {
                        return text;
                    }
                }
                format!("*{}", self.operand_str(inner))
            }
            MoveExprKind::Field { base, field } => {
                format!("{}.{}", self.operand_str(base), field)
            }
            MoveExprKind::Call {
                module,
                func,
                type_args,
                args,
            } => self.call_str(module.as_deref(), func, type_args, args),
            MoveExprKind::BorrowGlobal { mutable, ty, addr } => {
                if self.options.index_notation {
                    if *mutable {
                        format!("&mut {}[{}]", ty, self.expr_str(addr))
                    } else {
                        format!("{}[{}]", ty, self.expr_str(addr))
                    }
                } else if *mutable {
                    format!("borrow_global_mut<{}>({})", ty, self.expr_str(addr))
                } else {
                    format!("borrow_global<{}>({})", ty, self.expr_str(addr))
                }
            }
            MoveExprKind::Exists { ty, addr } => {
                format!("exists<{}>({})", ty, self.expr_str(addr))
            }
            MoveExprKind::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                format!(
                    "{} {} {}",
                    self.binary_operand_str(lhs, prec, false),
                    op.symbol(),
                    self.binary_operand_str(rhs, prec, true)
                )
            }
            MoveExprKind::Not(inner) => format!("!{}", self.operand_str(inner)),
            MoveExprKind::Cast { expr: inner, ty } => {
                // A literal that already carries the matching suffix needs
                // no cast around it.
                if let MoveExprKind::Literal {
                    digits,
                    suffix: Some(suffix),
                } = &inner.kind
                {
                    if suffix == ty {
                        return format!(
                            "{}{}",
                            normalize_literal(digits),
                            suffix.suffix().unwrap_or("")
                        );
                    }
                }
                format!("({} as {})", self.expr_str(inner), self.type_str(ty))
            }
            MoveExprKind::Pack { name, fields } => {
                if fields.is_empty() {
                    format!("{} {{}}", name)
                } else {
                    let items: Vec<String> = fields
                        .iter()
                        .map(|(field, value)| format!("{}: {}", field, self.expr_str(value)))
                        .collect();
                    format!("{} {{ {} }}", name, items.join(", "))
                }
            }
            MoveExprKind::VectorLit(items) => {
                let rendered: Vec<String> = items.iter().map(|i| self.expr_str(i)).collect();
                format!("vector[{}]", rendered.join(", "))
            }
            MoveExprKind::Tuple(items) => {
                let rendered: Vec<String> = items.iter().map(|i| self.expr_str(i)).collect();
                format!("({})", rendered.join(", "))
            }
            MoveExprKind::IfExpr {
                cond,
                then_value,
                else_value,
            } => format!(
                "if ({}) {} else {}",
                self.expr_str(cond),
                self.operand_str(then_value),
                self.operand_str(else_value)
            ),
            MoveExprKind::Unsupported { pattern } => {
                format!("/* unsupported: {} */", pattern)
            }
        }
    }

    /// Operand position: composite expressions get parentheses so the
    /// reading matches the AST. A dereference feeding a field access in
    /// particular must keep its parentheses.
    fn operand_str(&self, expr: &MoveExpr) -> String {
        match &expr.kind {
            MoveExprKind::Binary { .. }
            | MoveExprKind::Cast { .. }
            | MoveExprKind::IfExpr { .. } => format!("({})", self.expr_str(expr)),
            MoveExprKind::Deref(inner) => {
                if self.options.index_notation {
                    if let Some(text) = self.vector_index_str(inner) {
                        return text;
                    }
                }
                format!("(*{})", self.operand_str(inner))
            }
            _ => self.expr_str(expr),
        }
    }

    fn binary_operand_str(&self, expr: &MoveExpr, parent_prec: u8, is_right: bool) -> String {
        if let MoveExprKind::Binary { op, .. } = &expr.kind {
            let child_prec = op.precedence();
            if child_prec < parent_prec || (child_prec == parent_prec && is_right) {
                return format!("({})", self.expr_str(expr));
            }
            return self.expr_str(expr);
        }
        self.operand_str(expr)
    }

    fn call_str(
        &self,
        module: Option<&str>,
        func: &str,
        type_args: &[MoveType],
        args: &[MoveExpr],
    ) -> String {
        let generics = if type_args.is_empty() {
            String::new()
        } else {
            let items: Vec<String> = type_args.iter().map(|ty| self.type_str(ty)).collect();
            format!("<{}>", items.join(", "))
        };

        if self.options.index_notation {
            if let Some(text) = self.indexed_call_str(module, func, args) {
                return text;
            }
        }

        if self.options.call_style == CallStyle::Receiver {
            if let (Some(module_name), [receiver, rest @ ..]) = (module, args) {
                if is_receiver_function(module_name, func) {
                    // The borrow on the receiver is inferred by the Target;
                    // strip it.
                    let receiver_text = match &receiver.kind {
                        MoveExprKind::Borrow { expr, .. } => self.operand_str(expr),
                        _ => self.operand_str(receiver),
                    };
                    let rendered: Vec<String> =
                        rest.iter().map(|a| self.expr_str(a)).collect();
                    return format!(
                        "{}.{}{}({})",
                        receiver_text,
                        func,
                        generics,
                        rendered.join(", ")
                    );
                }
            }
        }

        let rendered: Vec<String> = args.iter().map(|a| self.expr_str(a)).collect();
        match module {
            Some(module) => format!("{}::{}{}({})", module, func, generics, rendered.join(", ")),
            None => format!("{}{}({})", func, generics, rendered.join(", ")),
        }
    }

    /// `&v[i]` / `&mut v[i]` for bare vector borrows under index notation
    fn indexed_call_str(
        &self,
        module: Option<&str>,
        func: &str,
        args: &[MoveExpr],
    ) -> Option<String> {
        if module != Some("vector") || args.len() != 2 {
            return None;
        }
        let receiver = match &args[0].kind {
            MoveExprKind::Borrow { expr, .. } => self.operand_str(expr),
            _ => self.operand_str(&args[0]),
        };
        match func {
            "borrow" => Some(format!("&{}[{}]", receiver, self.expr_str(&args[1]))),
            "borrow_mut" => Some(format!("&mut {}[{}]", receiver, self.expr_str(&args[1]))),
            _ => None,
        }
    }

    /// `v[i]` for a dereferenced vector borrow under index notation
    fn vector_index_str(&self, borrow_call: &MoveExpr) -> Option<String> {
        if let MoveExprKind::Call {
            module,
            func,
            args,
            ..
        } = &borrow_call.kind
        {
            if module.as_deref() == Some("vector")
                && (func == "borrow" || func == "borrow_mut")
                && args.len() == 2
            {
                let receiver = match &args[0].kind {
                    MoveExprKind::Borrow { expr, .. } => self.operand_str(expr),
                    _ => self.operand_str(&args[0]),
                };
                return Some(format!("{}[{}]", receiver, self.expr_str(&args[1])));
            }
        }
        None
    }

    // -------------------------------------------------------------------
    // Types and specs
    // -------------------------------------------------------------------

    pub fn type_str(&self, ty: &MoveType) -> String {
        match ty {
            MoveType::U8 => "u8".to_string(),
            MoveType::U16 => "u16".to_string(),
            MoveType::U32 => "u32".to_string(),
            MoveType::U64 => "u64".to_string(),
            MoveType::U128 => "u128".to_string(),
            MoveType::U256 => "u256".to_string(),
            MoveType::Bool => "bool".to_string(),
            MoveType::Address => "address".to_string(),
            MoveType::Signer => "signer".to_string(),
            MoveType::String => "string::String".to_string(),
            MoveType::Vector(inner) => format!("vector<{}>", self.type_str(inner)),
            MoveType::Table(key, value) => {
                format!("Table<{}, {}>", self.type_str(key), self.type_str(value))
            }
            MoveType::Struct(name) => name.clone(),
            MoveType::External { name, type_args, .. } => {
                if type_args.is_empty() {
                    name.clone()
                } else {
                    let items: Vec<String> =
                        type_args.iter().map(|t| self.type_str(t)).collect();
                    format!("{}<{}>", name, items.join(", "))
                }
            }
            MoveType::Ref { mutable, inner } => {
                format!("&{}{}", if *mutable { "mut " } else { "" }, self.type_str(inner))
            }
        }
    }

    fn spec_lines(&self, spec: &SpecBlock) -> String {
        let mut out = String::new();
        let target = match spec.kind {
            SpecTargetKind::Module => "module".to_string(),
            _ => spec.target.clone(),
        };
        out.push_str(&format!("{}spec {} {{\n", INDENT, target));
        let pad = INDENT.repeat(2);
        for pragma in &spec.pragmas {
            out.push_str(&format!("{}pragma {};\n", pad, pragma));
        }
        for requires in &spec.requires {
            out.push_str(&format!("{}requires {};\n", pad, requires));
        }
        for aborts in &spec.aborts_if {
            match &aborts.code {
                Some(code) => out.push_str(&format!(
                    "{}aborts_if {} with {};\n",
                    pad, aborts.cond, code
                )),
                None => out.push_str(&format!("{}aborts_if {};\n", pad, aborts.cond)),
            }
        }
        for modifies in &spec.modifies {
            out.push_str(&format!("{}modifies {};\n", pad, modifies));
        }
        for ensures in &spec.ensures {
            out.push_str(&format!("{}ensures {};\n", pad, ensures));
        }
        for invariant in &spec.invariants {
            out.push_str(&format!("{}invariant {};\n", pad, invariant));
        }
        out.push_str(&format!("{}}}\n", INDENT));
        out
    }
}

/// Expand scientific notation, strip leading zeros, pass hex through
pub fn normalize_literal(text: &str) -> String {
    if text.starts_with("0x") || text.starts_with("0X") {
        return text.to_string();
    }

    let scientific = Regex::new(r"^(\d+)(?:\.(\d+))?[eE]\+?(\d+)$").unwrap();
    if let Some(captures) = scientific.captures(text) {
        let int_part = captures.get(1).map(|m| m.as_str()).unwrap_or("0");
        let frac_part = captures.get(2).map(|m| m.as_str()).unwrap_or("");
        let exponent: usize = captures
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        if exponent >= frac_part.len() {
            let mut digits = String::new();
            digits.push_str(int_part);
            digits.push_str(frac_part);
            digits.push_str(&"0".repeat(exponent - frac_part.len()));
            return strip_leading_zeros(&digits);
        }
        // A fractional value cannot be an integer literal; leave the text
        // alone and let the validator reject it.
        return text.to_string();
    }

    if text.chars().all(|c| c.is_ascii_digit()) {
        return strip_leading_zeros(text);
    }
    text.to_string()
}

fn strip_leading_zeros(digits: &str) -> String {
    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scientific_notation_expands() {
        assert_eq!(normalize_literal("1e18"), "1000000000000000000");
        assert_eq!(normalize_literal("2e3"), "2000");
        assert_eq!(normalize_literal("1.5e3"), "1500");
    }

    #[test]
    fn leading_zeros_strip_except_zero() {
        assert_eq!(normalize_literal("007"), "7");
        assert_eq!(normalize_literal("0"), "0");
        assert_eq!(normalize_literal("000"), "0");
    }

    #[test]
    fn hex_passes_through() {
        assert_eq!(normalize_literal("0xff"), "0xff");
        assert_eq!(normalize_literal("0x00"), "0x00");
    }

    #[test]
    fn deref_field_access_keeps_parens() {
        let printer = MovePrinter::default();
        let expr = MoveExpr::field(
            MoveExpr::deref(MoveExpr::call(
                Some("table"),
                "borrow",
                vec![MoveExpr::ident("t"), MoveExpr::ident("k")],
            )),
            "reserve",
        );
        assert_eq!(printer.expr_str(&expr), "(*table::borrow(t, k)).reserve");
    }

    #[test]
    fn receiver_style_strips_the_borrow() {
        let printer = MovePrinter::new(PrinterOptions {
            call_style: CallStyle::Receiver,
            index_notation: false,
        });
        let expr = MoveExpr::call(
            Some("vector"),
            "push_back",
            vec![
                MoveExpr::borrow(true, MoveExpr::ident("v")),
                MoveExpr::ident("x"),
            ],
        );
        assert_eq!(printer.expr_str(&expr), "v.push_back(x)");
    }

    #[test]
    fn equal_precedence_right_operand_is_parenthesized() {
        let printer = MovePrinter::default();
        let expr = MoveExpr::binary(
            MoveBinOp::Sub,
            MoveExpr::ident("a"),
            MoveExpr::binary(MoveBinOp::Sub, MoveExpr::ident("b"), MoveExpr::ident("c")),
        );
        assert_eq!(printer.expr_str(&expr), "a - (b - c)");
    }
}

//! Package manifest synthesis
//!
//! Emits the Target package manifest (`Move.toml`). The `[addresses]`
//! block lists the package address and, only when some emitted module
//! references the runtime shim, the shim's address as well.

use crate::runtime_shim::{SHIM_ADDRESS_NAME, SHIM_DEFAULT_ADDRESS};

/// Render the manifest text
pub fn generate(package_name: &str, address: &str, include_shim: bool) -> String {
    let mut out = String::new();
    out.push_str("[package]\n");
    out.push_str(&format!("name = \"{}\"\n", package_name));
    out.push_str("version = \"1.0.0\"\n");
    out.push_str("upgrade_policy = \"compatible\"\n");
    out.push('\n');
    out.push_str("[addresses]\n");
    out.push_str(&format!("{} = \"{}\"\n", package_name, address));
    if include_shim {
        out.push_str(&format!(
            "{} = \"{}\"\n",
            SHIM_ADDRESS_NAME, SHIM_DEFAULT_ADDRESS
        ));
    }
    out.push('\n');
    out.push_str("[dependencies.AptosFramework]\n");
    out.push_str("git = \"https://github.com/aptos-labs/aptos-core.git\"\n");
    out.push_str("rev = \"mainnet\"\n");
    out.push_str("subdir = \"aptos-move/framework/aptos-framework\"\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shim_address_is_listed_only_when_referenced() {
        let with = generate("counter", "0xCAFE", true);
        let without = generate("counter", "0xCAFE", false);
        assert!(with.contains("sol_runtime = \"0x51\""));
        assert!(!without.contains("sol_runtime"));
        assert!(without.contains("counter = \"0xCAFE\""));
    }
}

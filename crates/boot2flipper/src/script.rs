//! iPXE boot script synthesis and validation.
//!
//! Grounded in the original firmware's `ipxe/script_generator.c` and `ipxe/ipxe_validator.c`.

use crate::config::DeviceConfig;

const MAX_SCRIPT_LINES: usize = 200;

/// Renders the iPXE script text for `config`: DHCP or static-IP network setup, then either a
/// chainload or a drop to shell, matching the branching of the original generator but using
/// [`DeviceConfig::resolved_interface`] in place of its undefined-behaviour `has_interface` read.
pub fn render_boot_script(config: &DeviceConfig) -> String {
    let iface = config.resolved_interface();
    let mut script = String::from("#!ipxe\n");

    match &config.static_ip {
        None => {
            script.push_str("# Boot2Flipper - DHCP Mode\n\n");
            script.push_str("echo Boot2Flipper: Configuring network (DHCP)\n");
            script.push_str(&format!("dhcp {iface} || goto failed\n\n"));
            script.push_str("echo Network configured:\n");
            script.push_str(&format!("echo IP: ${{{iface}/ip}}\n"));
            script.push_str(&format!("echo Gateway: ${{{iface}/gateway}}\n"));
            script.push_str(&format!("echo DNS: ${{{iface}/dns}}\n\n"));
        }
        Some(static_ip) => {
            script.push_str("# Boot2Flipper - Static IP Mode\n\n");
            script.push_str("echo Boot2Flipper: Configuring network (Static IP)\n\n");
            script.push_str("# Configure static IP\n");
            script.push_str(&format!("set {iface}/ip {}\n", static_ip.ip_addr));
            script.push_str(&format!("set {iface}/netmask {}\n", static_ip.subnet_mask));
            script.push_str(&format!("set {iface}/gateway {}\n", static_ip.gateway));
            script.push_str(&format!("set dns {}\n\n", static_ip.dns));
            script.push_str("# Open network interface\n");
            script.push_str(&format!("ifopen {iface} || goto failed\n\n"));
            script.push_str("echo Network configured:\n");
            script.push_str(&format!("echo IP: ${{{iface}/ip}}\n"));
            script.push_str(&format!("echo Netmask: ${{{iface}/netmask}}\n"));
            script.push_str(&format!("echo Gateway: ${{{iface}/gateway}}\n"));
            script.push_str("echo DNS: ${dns}\n\n");
        }
    }

    if config.chainload_enabled {
        script.push_str(&format!("echo Chainloading: {}\n", config.chainload_url));
        script.push_str(&format!(
            "chain --autofree {} || goto failed\n",
            config.chainload_url
        ));
    } else {
        script.push_str("echo Network configured successfully\n");
        script.push_str("echo Chainloading disabled, dropping to shell\n");
        script.push_str("shell\n");
        script.push_str("goto end\n");
    }

    script.push_str("\n:failed\n");
    script.push_str("echo Dropping to shell\n");
    script.push_str("shell\n\n");
    script.push_str(":end\n");
    script
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("script does not start with the #!ipxe shebang")]
    MissingShebang,
    #[error("script exceeds the maximum of {0} lines")]
    TooManyLines(usize),
    #[error("script contains a bare carriage return, which iPXE's line parser rejects")]
    BareCarriageReturn,
}

/// Performs the minimal structural checks the original's `ipxe_validator.c` performs: this is
/// deliberately not a full iPXE grammar validator.
pub fn validate_boot_script(script: &str) -> Result<(), ScriptError> {
    if !script.starts_with("#!ipxe") {
        return Err(ScriptError::MissingShebang);
    }
    if script.contains('\r') {
        return Err(ScriptError::BareCarriageReturn);
    }
    let lines = script.lines().count();
    if lines > MAX_SCRIPT_LINES {
        return Err(ScriptError::TooManyLines(MAX_SCRIPT_LINES));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticIpConfig;

    #[test]
    fn dhcp_script_uses_resolved_interface_and_chains() {
        let config = DeviceConfig::default();
        let script = render_boot_script(&config);
        assert!(script.starts_with("#!ipxe\n"));
        assert!(script.contains("dhcp net0 || goto failed"));
        assert!(script.contains("chain --autofree http://boot.ipxe.org/demo/boot.php"));
        validate_boot_script(&script).unwrap();
    }

    #[test]
    fn static_ip_script_sets_address_fields() {
        let mut config = DeviceConfig::default();
        config.static_ip = Some(StaticIpConfig::default());
        config.network_interface = Some("net2".into());
        let script = render_boot_script(&config);
        assert!(script.contains("set net2/ip 192.168.1.10"));
        assert!(script.contains("ifopen net2 || goto failed"));
        validate_boot_script(&script).unwrap();
    }

    #[test]
    fn chainload_disabled_drops_to_shell_instead_of_chaining() {
        let mut config = DeviceConfig::default();
        config.chainload_enabled = false;
        let script = render_boot_script(&config);
        assert!(!script.contains("chain --autofree"));
        assert!(script.contains("Chainloading disabled, dropping to shell"));
    }

    #[test]
    fn validator_rejects_missing_shebang() {
        assert_eq!(
            validate_boot_script("echo hi\n"),
            Err(ScriptError::MissingShebang)
        );
    }

    #[test]
    fn validator_rejects_bare_carriage_return() {
        assert_eq!(
            validate_boot_script("#!ipxe\r\necho hi\n"),
            Err(ScriptError::BareCarriageReturn)
        );
    }
}

//! Shared helper functions for CLI commands.

use crate::models::version::{DISABLED, ENABLED};

/// Parse a plugin version key: `disabled`, `enabled` or a numeric key.
pub fn parse_plugin_version(s: &str) -> Result<i32, String> {
    match s.to_ascii_lowercase().as_str() {
        "disabled" | "off" | "no" => Ok(DISABLED),
        "enabled" | "on" | "yes" => Ok(ENABLED),
        other => match other.parse::<i32>() {
            Ok(key) if key >= DISABLED => Ok(key),
            _ => Err(format!(
                "expected 'disabled', 'enabled' or a version key, got '{}'",
                s
            )),
        },
    }
}

/// Major and minor numbers from a dotted version string like `2.0.0.4`.
pub fn split_version(version: &str) -> Result<(i32, i32), String> {
    let mut parts = version.split('.');
    let major = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| format!("invalid browser version '{}'", version))?;
    let minor = match parts.next() {
        Some(p) => p
            .trim()
            .parse()
            .map_err(|_| format!("invalid browser version '{}'", version))?,
        None => 0,
    };
    Ok((major, minor))
}

/// Parse a bind address that can be:
/// - Just a port: "3040" -> 127.0.0.1:3040
/// - Just a host: "0.0.0.0" -> 0.0.0.0:<default port>
/// - Host and port: "0.0.0.0:3040"
pub fn parse_bind_address(bind: &str, default_port: u16) -> (String, u16) {
    if let Ok(port) = bind.parse::<u16>() {
        return ("127.0.0.1".to_string(), port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.to_string(), port);
        }
    }

    (bind.to_string(), default_port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plugin_version() {
        assert_eq!(parse_plugin_version("disabled"), Ok(DISABLED));
        assert_eq!(parse_plugin_version("Enabled"), Ok(ENABLED));
        assert_eq!(parse_plugin_version("5"), Ok(5));
        assert!(parse_plugin_version("0").is_err());
        assert!(parse_plugin_version("maybe").is_err());
    }

    #[test]
    fn test_split_version() {
        assert_eq!(split_version("2.0.0.4"), Ok((2, 0)));
        assert_eq!(split_version("3.5"), Ok((3, 5)));
        assert_eq!(split_version("9"), Ok((9, 0)));
        assert!(split_version("beta").is_err());
    }

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(parse_bind_address("8080", 3040), ("127.0.0.1".to_string(), 8080));
        assert_eq!(parse_bind_address("0.0.0.0", 3040), ("0.0.0.0".to_string(), 3040));
        assert_eq!(
            parse_bind_address("0.0.0.0:9000", 3040),
            ("0.0.0.0".to_string(), 9000)
        );
    }
}

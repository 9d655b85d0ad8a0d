//! Server configuration, read from the environment by the binary.

use huarong_room::RoomConfig;
use serde::{Deserialize, Serialize};

/// Address used when neither `HUARONG_BIND` nor `PORT` is set.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Full listen address, e.g. `127.0.0.1:4000`. Wins over `PORT`.
pub const BIND_VAR: &str = "HUARONG_BIND";

/// Port only; the server then listens on every interface.
pub const PORT_VAR: &str = "PORT";

/// `1`/`true` to honour room operations from occupants only.
pub const STRICT_MEMBERSHIP_VAR: &str = "HUARONG_STRICT_MEMBERSHIP";

/// An environment variable held a value the server can't use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid port {0:?}: expected an integer between 0 and 65535")]
    InvalidPort(String),

    #[error("invalid bind address {0:?}: expected host:port")]
    InvalidBindAddr(String),

    #[error("invalid value {value:?} for {var}: expected true or false")]
    InvalidFlag { var: &'static str, value: String },
}

/// Everything needed to start a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] naming the first malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = non_blank(lookup(BIND_VAR)) {
            if !is_host_port(&addr) {
                return Err(ConfigError::InvalidBindAddr(addr));
            }
            config.bind_addr = addr;
        } else if let Some(port) = non_blank(lookup(PORT_VAR)) {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(value) = non_blank(lookup(STRICT_MEMBERSHIP_VAR)) {
            config.room.strict_membership =
                parse_flag(STRICT_MEMBERSHIP_VAR, value)?;
        }

        Ok(config)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `host:port` where the port parses; the host is resolved at
/// bind time.
fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(!config.room.strict_membership);
    }

    #[test]
    fn test_port_binds_all_interfaces() {
        let config =
            ServerConfig::from_lookup(lookup(&[("PORT", "8080")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_bind_wins_over_port() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HUARONG_BIND", "127.0.0.1:4000"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:4000");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HUARONG_BIND", "  "),
            ("PORT", ""),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_invalid_port_is_reported() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "70000")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("70000".into()));
    }

    #[test]
    fn test_invalid_bind_addr_is_reported() {
        for addr in ["localhost", ":3000", "host:port"] {
            let err =
                ServerConfig::from_lookup(lookup(&[("HUARONG_BIND", addr)]))
                    .unwrap_err();
            assert_eq!(err, ConfigError::InvalidBindAddr(addr.into()));
        }
    }

    #[test]
    fn test_ipv6_bind_addr_is_accepted() {
        let config =
            ServerConfig::from_lookup(lookup(&[("HUARONG_BIND", "[::1]:3000")]))
                .unwrap();
        assert_eq!(config.bind_addr, "[::1]:3000");
    }

    #[test]
    fn test_strict_membership_flag() {
        for (value, expected) in
            [("1", true), ("TRUE", true), ("false", false), ("0", false)]
        {
            let config = ServerConfig::from_lookup(lookup(&[(
                "HUARONG_STRICT_MEMBERSHIP",
                value,
            )]))
            .unwrap();
            assert_eq!(config.room.strict_membership, expected, "{value}");
        }
    }

    #[test]
    fn test_invalid_flag_names_the_variable() {
        let err = ServerConfig::from_lookup(lookup(&[(
            "HUARONG_STRICT_MEMBERSHIP",
            "maybe",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("HUARONG_STRICT_MEMBERSHIP"));
        assert!(err.to_string().contains("maybe"));
    }
}

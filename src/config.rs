//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load environment variables: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Invalid configuration value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Directory scanned for `*.md` DIPs at startup
    pub dips_dir: PathBuf,
    /// Refuse documents with error-severity violations
    pub strict: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            dips_dir: PathBuf::from("./dips"),
            strict: false,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub registry: RegistryConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine; a malformed one is not
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let server = ServerConfig {
            host: parse_var(&lookup, "HOST")?.unwrap_or(defaults.server.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.server.port),
        };

        let cors = CorsConfig {
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors.allowed_origins),
        };

        let registry = RegistryConfig {
            dips_dir: lookup("DIPS_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.registry.dips_dir),
            strict: match lookup("DIPS_STRICT") {
                Some(value) => parse_bool("DIPS_STRICT", &value)?,
                None => defaults.registry.strict,
            },
        };

        Ok(Self {
            server,
            cors,
            registry,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(None),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_default_registry_config() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.registry.dips_dir, PathBuf::from("./dips"));
        assert!(!settings.registry.strict);
    }

    #[test]
    fn test_values_from_environment() {
        let settings = Settings::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("DIPS_DIR", "/srv/dips"),
            ("DIPS_STRICT", "yes"),
        ]))
        .unwrap();

        assert_eq!(settings.server.host, Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.cors.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(settings.registry.dips_dir, PathBuf::from("/srv/dips"));
        assert!(settings.registry.strict);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Settings::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "PORT", .. }));

        let err = Settings::from_lookup(lookup(&[("DIPS_STRICT", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "DIPS_STRICT", .. }));
    }
}

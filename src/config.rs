//! Service configuration loaded from environment variables.
//!
//! - `PORT` - Listen port (default: 8083)
//! - `CATALOG_PATH` - OlaClick menu export (default: data/catalog.json)
//! - `CART_DATA_DIR` - Directory for per-session cart files (default: data/carts)
//! - `WHATSAPP_BUSINESS_NUMBER` - Number orders are sent to (default: 5511933580273)

use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_CATALOG_PATH: &str = "data/catalog.json";
const DEFAULT_CART_DATA_DIR: &str = "data/carts";
const DEFAULT_WHATSAPP_NUMBER: &str = "5511933580273";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub catalog_path: PathBuf,
    pub cart_data_dir: PathBuf,
    pub whatsapp_number: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("PORT".into(), e.to_string()))?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            port,
            catalog_path: lookup("CATALOG_PATH").map_or_else(|| DEFAULT_CATALOG_PATH.into(), PathBuf::from),
            cart_data_dir: lookup("CART_DATA_DIR").map_or_else(|| DEFAULT_CART_DATA_DIR.into(), PathBuf::from),
            whatsapp_number: lookup("WHATSAPP_BUSINESS_NUMBER").unwrap_or_else(|| DEFAULT_WHATSAPP_NUMBER.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.catalog_path, PathBuf::from("data/catalog.json"));
        assert_eq!(config.cart_data_dir, PathBuf::from("data/carts"));
        assert_eq!(config.whatsapp_number, "5511933580273");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[("PORT", "9000"), ("CART_DATA_DIR", "/var/carts")])).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.cart_data_dir, PathBuf::from("/var/carts"));
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(Config::from_lookup(lookup(&[("PORT", "eighty")])), Err(ConfigError::InvalidEnvVar(..))));
    }
}

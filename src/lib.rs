//! EzPods Storefront
//!
//! Cart core for a pod/vape storefront.
//!
//! ## Features
//! - Modifier-aware cart store with order-independent line identity
//! - Pluggable cart persistence (JSON file, in-memory)
//! - Catalog snapshots from OlaClick menu exports
//! - Order summaries and WhatsApp checkout links
//! - HTTP API over per-session carts

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod storage;

use thiserror::Error;

pub use catalog::{Catalog, CatalogError};
pub use config::{Config, ConfigError};
pub use domain::aggregates::{CartStore, LineItem, ModifierChoice, OrderSummary, Product};
pub use domain::value_objects::Price;
pub use storage::{CartStorage, JsonFileStorage, MemoryStorage, StorageError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Loads the catalog and prepares the cart directory for the HTTP service.
pub fn build_state(config: &Config) -> Result<api::AppState> {
    let catalog = Catalog::load(&config.catalog_path)?;
    tracing::info!(products = catalog.len(), path = %config.catalog_path.display(), "catalog loaded");
    std::fs::create_dir_all(&config.cart_data_dir).map_err(StorageError::from)?;
    Ok(api::AppState::new(catalog, api::CartSessions::new(&config.cart_data_dir), &config.whatsapp_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_state() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.json");
        std::fs::write(&catalog_path, catalog::tests::MENU).unwrap();
        let config = Config {
            port: 0,
            catalog_path,
            cart_data_dir: dir.path().join("carts"),
            whatsapp_number: "11933580273".into(),
        };
        let state = build_state(&config).unwrap();
        assert_eq!(state.catalog.len(), 3);
        assert!(config.cart_data_dir.is_dir());
    }

    #[test]
    fn test_build_state_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            port: 0,
            catalog_path: dir.path().join("missing.json"),
            cart_data_dir: dir.path().join("carts"),
            whatsapp_number: String::new(),
        };
        assert!(matches!(build_state(&config), Err(StorefrontError::Catalog(_))));
    }
}

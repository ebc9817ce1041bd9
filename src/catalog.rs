//! Catalog snapshot.
//!
//! Products come from an OlaClick menu export (`{"data": [category, ...]}`),
//! read once at startup and kept in memory.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use crate::domain::aggregates::Product;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("Malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct MenuResponse {
    data: Vec<MenuCategory>,
}

#[derive(Debug, Deserialize)]
struct MenuCategory {
    #[serde(default)]
    name: String,
    #[serde(default)]
    position: i32,
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let mut menu: MenuResponse = serde_json::from_str(raw)?;
        menu.data.sort_by_key(|c| c.position);
        let mut catalog = Catalog::default();
        for category in menu.data {
            tracing::debug!(category = %category.name, products = category.products.len(), "catalog category");
            for product in category.products {
                if catalog.index.contains_key(&product.id) {
                    tracing::warn!(product_id = %product.id, "duplicate product in catalog, keeping first");
                    continue;
                }
                catalog.index.insert(product.id.clone(), catalog.products.len());
                catalog.products.push(product);
            }
        }
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| CatalogError::Read { path: path.display().to_string(), source })?;
        Self::from_json(&raw)
    }

    pub fn product(&self, id: &str) -> Option<&Product> { self.index.get(id).map(|&i| &self.products[i]) }

    pub fn visible_products(&self) -> impl Iterator<Item = &Product> { self.products.iter().filter(|p| p.visible) }

    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MENU: &str = r#"{"data": [
        {"id": "c2", "name": "Essências", "position": 2, "products": [
            {"id": "p3", "name": "Juice", "visible": false,
             "product_variants": [{"id": "v3", "price": 40, "stock": 1}]}
        ]},
        {"id": "c1", "name": "Pods", "position": 1, "products": [
            {"id": "p1", "name": "Ignite V50",
             "images": [{"image_url": "https://img/p1.png"}],
             "product_variants": [{"id": "v1", "price": 89.9, "stock": 3}],
             "modifier_categories": [{"id": "flavor", "name": "Sabor", "min_modifiers": 1,
                "max_modifiers": 1, "required": true, "modifiers": [
                    {"id": "mint", "name": "Menta", "price": 0},
                    {"id": "grape", "name": "Uva", "price": 5}
                ]}]},
            {"id": "p2", "name": "Elfbar", "product_variants": [{"id": "v2", "price": 60, "stock": 0}]}
        ]}
    ]}"#;

    #[test]
    fn test_catalog_order_and_lookup() {
        let catalog = Catalog::from_json(MENU).unwrap();
        assert_eq!(catalog.len(), 3);
        let ids: Vec<&str> = catalog.visible_products().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(catalog.product("p3").map(|p| p.visible), Some(false));
        assert!(catalog.product("nope").is_none());
    }

    #[test]
    fn test_duplicate_products_keep_first() {
        let raw = r#"{"data": [{"id": "c", "name": "A", "products": [
            {"id": "p", "name": "First"}, {"id": "p", "name": "Second"}]}]}"#;
        let catalog = Catalog::from_json(raw).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.product("p").unwrap().name, "First");
    }

    #[test]
    fn test_catalog_errors() {
        assert!(matches!(Catalog::from_json("[]"), Err(CatalogError::Malformed(_))));
        assert!(matches!(Catalog::load("/definitely/not/here.json"), Err(CatalogError::Read { .. })));
    }
}

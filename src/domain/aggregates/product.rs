//! Product Aggregate
//!
//! Catalog records as delivered by the OlaClick menu API. The cart only reads
//! them; nothing in this crate mutates a product.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use crate::domain::aggregates::cart::ModifierChoice;
use crate::domain::value_objects::Price;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub product_variants: Vec<Variant>,
    #[serde(default)]
    pub modifier_categories: Vec<ModifierCategory>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductImage { pub image_url: String }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifierCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub min_modifiers: u32,
    #[serde(default)]
    pub max_modifiers: u32,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub position: i32,
}

fn visible_by_default() -> bool { true }

impl Product {
    /// Unit price: the first variant's price, zero when the product has none.
    pub fn base_price(&self) -> Price {
        self.product_variants.first().map(|v| v.price).unwrap_or(Price::ZERO)
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(|i| i.image_url.as_str())
    }

    pub fn category(&self, category_id: &str) -> Option<&ModifierCategory> {
        self.modifier_categories.iter().find(|c| c.id == category_id)
    }

    /// Finds a modifier and its category by id pair.
    pub fn resolve_modifier(&self, category_id: &str, modifier_id: &str) -> Option<(&ModifierCategory, &Modifier)> {
        let category = self.category(category_id)?;
        let modifier = category.modifiers.iter().find(|m| m.id == modifier_id)?;
        Some((category, modifier))
    }

    /// Checks a selection against the category cardinality rules.
    ///
    /// The cart store accepts any selection; storefront surfaces call this
    /// before adding to the cart.
    pub fn validate_selection(&self, choices: &[ModifierChoice]) -> Result<(), SelectionError> {
        let mut picks: HashMap<&str, Vec<&str>> = HashMap::new();
        for choice in choices {
            let category = self.category(&choice.category_id)
                .ok_or_else(|| SelectionError::UnknownCategory(choice.category_id.clone()))?;
            if !category.modifiers.iter().any(|m| m.id == choice.modifier_id) {
                return Err(SelectionError::UnknownModifier {
                    category: category.name.clone(),
                    modifier_id: choice.modifier_id.clone(),
                });
            }
            let chosen = picks.entry(category.id.as_str()).or_default();
            if chosen.contains(&choice.modifier_id.as_str()) {
                return Err(SelectionError::Duplicate(choice.modifier_id.clone()));
            }
            chosen.push(choice.modifier_id.as_str());
        }

        for category in &self.modifier_categories {
            let count = picks.get(category.id.as_str()).map_or(0, Vec::len) as u32;
            let min = if category.required { category.min_modifiers.max(1) } else { category.min_modifiers };
            if count < min && (category.required || count > 0) {
                return Err(SelectionError::TooFew { category: category.name.clone(), min, got: count });
            }
            if category.max_modifiers > 0 && count > category.max_modifiers {
                return Err(SelectionError::TooMany { category: category.name.clone(), max: category.max_modifiers, got: count });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Unknown modifier category: {0}")]
    UnknownCategory(String),

    #[error("Unknown modifier {modifier_id} in {category}")]
    UnknownModifier { category: String, modifier_id: String },

    #[error("Modifier selected twice: {0}")]
    Duplicate(String),

    #[error("{category} needs at least {min} selection(s), got {got}")]
    TooFew { category: String, min: u32, got: u32 },

    #[error("{category} allows at most {max} selection(s), got {got}")]
    TooMany { category: String, max: u32, got: u32 },
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn modifier(id: &str, name: &str, cents: i64) -> Modifier {
        Modifier { id: id.into(), name: name.into(), price: Price::from_cents(cents), position: 0 }
    }

    pub(crate) fn product(id: &str, cents: i64, categories: Vec<ModifierCategory>) -> Product {
        Product {
            id: id.into(), name: format!("Pod {id}"), description: None, position: 0, visible: true,
            images: vec![ProductImage { image_url: format!("https://cdn.example/{id}.png") }],
            product_variants: vec![Variant { id: format!("{id}-v"), price: Price::from_cents(cents), original_price: None, stock: 5 }],
            modifier_categories: categories,
        }
    }

    pub(crate) fn flavors(required: bool, min: u32, max: u32) -> ModifierCategory {
        ModifierCategory {
            id: "flavor".into(), name: "Sabor".into(), min_modifiers: min, max_modifiers: max, required,
            modifiers: vec![modifier("mint", "Menta", 0), modifier("grape", "Uva", 300), modifier("ice", "Gelo", 150)],
        }
    }

    fn pick(category: &str, modifier: &str) -> ModifierChoice { ModifierChoice::new(category, modifier) }

    #[test]
    fn test_deserialize_olaclick_shape() {
        let json = r#"{
            "id": "p1", "name": "Ignite V50", "visible": true,
            "images": [{"image_url": "https://img/p1.png"}],
            "product_variants": [{"id": "v1", "price": 89.9, "original_price": 99.9, "stock": 3}],
            "modifier_categories": [{"id": "c1", "name": "Sabor", "min_modifiers": 1, "max_modifiers": 1,
                "required": true, "modifiers": [{"id": "m1", "name": "Menta", "price": 0, "position": 1}]}]
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.base_price(), Price::from_cents(8990));
        assert_eq!(p.primary_image(), Some("https://img/p1.png"));
        assert!(p.resolve_modifier("c1", "m1").is_some());
        assert!(p.resolve_modifier("c1", "m2").is_none());
    }

    #[test]
    fn test_base_price_without_variants() {
        let mut p = product("p", 1000, vec![]);
        p.product_variants.clear();
        assert_eq!(p.base_price(), Price::ZERO);
    }

    #[test]
    fn test_required_category_needs_a_pick() {
        let p = product("p", 1000, vec![flavors(true, 0, 1)]);
        assert_eq!(p.validate_selection(&[]), Err(SelectionError::TooFew { category: "Sabor".into(), min: 1, got: 0 }));
        assert!(p.validate_selection(&[pick("flavor", "mint")]).is_ok());
    }

    #[test]
    fn test_optional_category_may_be_empty() {
        let p = product("p", 1000, vec![flavors(false, 2, 3)]);
        assert!(p.validate_selection(&[]).is_ok());
        assert!(matches!(p.validate_selection(&[pick("flavor", "mint")]), Err(SelectionError::TooFew { .. })));
    }

    #[test]
    fn test_max_modifiers_enforced() {
        let p = product("p", 1000, vec![flavors(true, 1, 2)]);
        let err = p.validate_selection(&[pick("flavor", "mint"), pick("flavor", "grape"), pick("flavor", "ice")]).unwrap_err();
        assert_eq!(err, SelectionError::TooMany { category: "Sabor".into(), max: 2, got: 3 });
    }

    #[test]
    fn test_unknown_and_duplicate_picks() {
        let p = product("p", 1000, vec![flavors(false, 0, 3)]);
        assert_eq!(p.validate_selection(&[pick("size", "xl")]), Err(SelectionError::UnknownCategory("size".into())));
        assert!(matches!(p.validate_selection(&[pick("flavor", "lemon")]), Err(SelectionError::UnknownModifier { .. })));
        assert_eq!(p.validate_selection(&[pick("flavor", "mint"), pick("flavor", "mint")]), Err(SelectionError::Duplicate("mint".into())));
    }
}

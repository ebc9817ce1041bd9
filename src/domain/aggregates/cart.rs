//! Cart Aggregate
//!
//! One line item per distinct (product, modifier selection) pair. Line item ids
//! are derived from the selection, so the same pairs picked in any order land
//! on the same line.

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::product::Product;
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Price, Quantity};
use crate::storage::CartStorage;

const UNNAMED_PRODUCT: &str = "Produto sem nome";

/// A requested (category, modifier) pair, as sent by the product page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierChoice {
    pub category_id: String,
    pub modifier_id: String,
}

impl ModifierChoice {
    pub fn new(category_id: impl Into<String>, modifier_id: impl Into<String>) -> Self {
        Self { category_id: category_id.into(), modifier_id: modifier_id.into() }
    }

    fn key(&self) -> String { format!("{}:{}", self.category_id, self.modifier_id) }
}

/// A modifier resolved against the catalog at add time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedModifier {
    pub category_id: String,
    pub category_name: String,
    pub modifier_id: String,
    pub modifier_name: String,
    pub modifier_price: Price,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredLineItem")]
pub struct LineItem {
    id: String,
    product_id: String,
    product_name: String,
    product_image: String,
    base_price: Price,
    quantity: Quantity,
    selected_modifiers: Vec<SelectedModifier>,
    total_price: Price,
}

/// Persisted shape. The stored total is ignored and rebuilt from its parts.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLineItem {
    id: String,
    product_id: String,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    product_image: String,
    #[serde(default)]
    base_price: Price,
    quantity: Quantity,
    #[serde(default)]
    selected_modifiers: Vec<SelectedModifier>,
}

impl From<StoredLineItem> for LineItem {
    fn from(s: StoredLineItem) -> Self {
        let mut item = LineItem {
            id: s.id, product_id: s.product_id, product_name: s.product_name,
            product_image: s.product_image, base_price: s.base_price, quantity: s.quantity,
            selected_modifiers: s.selected_modifiers, total_price: Price::ZERO,
        };
        item.recalculate();
        item
    }
}

impl LineItem {
    pub fn id(&self) -> &str { &self.id }
    pub fn product_id(&self) -> &str { &self.product_id }
    pub fn product_name(&self) -> &str { &self.product_name }
    pub fn product_image(&self) -> &str { &self.product_image }
    pub fn base_price(&self) -> Price { self.base_price }
    pub fn quantity(&self) -> u32 { self.quantity.value() }
    pub fn selected_modifiers(&self) -> &[SelectedModifier] { &self.selected_modifiers }
    pub fn total_price(&self) -> Price { self.total_price }

    /// Base price plus every modifier surcharge, for a single unit.
    pub fn unit_price(&self) -> Price {
        self.base_price + self.selected_modifiers.iter().map(|m| m.modifier_price).sum::<Price>()
    }

    fn set_quantity(&mut self, quantity: Quantity) {
        self.quantity = quantity;
        self.recalculate();
    }

    fn recalculate(&mut self) { self.total_price = self.unit_price().multiply(self.quantity.value()); }
}

/// Line item id for a product and a set of requested pairs.
///
/// Pairs are sorted before joining, so selection order never matters.
/// Unresolvable pairs still take part in the key.
pub fn line_item_id(product_id: &str, choices: &[ModifierChoice]) -> String {
    let mut keys: Vec<String> = choices.iter().map(ModifierChoice::key).collect();
    keys.sort();
    format!("{}-{}", product_id, keys.join("|"))
}

/// Cart state for one shopper: ordered line items plus the drawer flag.
///
/// Every change is written through the storage port; no-ops are not.
#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    items: Vec<LineItem>,
    is_open: bool,
    storage: S,
    events: Vec<DomainEvent>,
}

impl<S: CartStorage> CartStore<S> {
    /// Opens a cart from whatever the storage holds.
    pub fn open(storage: S) -> Self {
        let items = storage.load();
        tracing::debug!(items = items.len(), "cart loaded");
        Self { items, is_open: false, storage, events: vec![] }
    }

    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn is_open(&self) -> bool { self.is_open }
    pub fn storage(&self) -> &S { &self.storage }

    pub fn total_items(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity())).sum() }
    pub fn total_price(&self) -> Price { self.items.iter().map(|i| i.total_price).sum() }

    pub fn add_item(&mut self, product: &Product, choices: &[ModifierChoice], quantity: u32) {
        let quantity = Quantity::new(quantity);
        if quantity.is_zero() {
            tracing::debug!(product_id = %product.id, "ignoring add with zero quantity");
            return;
        }

        let id = line_item_id(&product.id, choices);
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == id) {
            let increased = existing.quantity.add(quantity.value());
            existing.set_quantity(increased);
            let event = CartEvent::QuantityIncreased { item_id: id, by: quantity.value(), quantity: increased.value() };
            self.raise_event(DomainEvent::Cart(event));
        } else {
            let selected_modifiers: Vec<SelectedModifier> = choices.iter()
                .filter_map(|c| {
                    let Some((category, modifier)) = product.resolve_modifier(&c.category_id, &c.modifier_id) else {
                        tracing::debug!(product_id = %product.id, category_id = %c.category_id, modifier_id = %c.modifier_id, "dropping unresolved modifier");
                        return None;
                    };
                    Some(SelectedModifier {
                        category_id: category.id.clone(), category_name: category.name.clone(),
                        modifier_id: modifier.id.clone(), modifier_name: modifier.name.clone(),
                        modifier_price: modifier.price,
                    })
                })
                .collect();
            let product_name = if product.name.trim().is_empty() { UNNAMED_PRODUCT.to_string() } else { product.name.clone() };
            let mut item = LineItem {
                id: id.clone(), product_id: product.id.clone(), product_name,
                product_image: product.primary_image().unwrap_or_default().to_string(),
                base_price: product.base_price(), quantity, selected_modifiers, total_price: Price::ZERO,
            };
            item.recalculate();
            self.items.push(item);
            let event = CartEvent::ItemAdded { item_id: id, product_id: product.id.clone(), quantity: quantity.value() };
            self.raise_event(DomainEvent::Cart(event));
        }
        self.persist();
    }

    /// Sets a line's quantity. Below one is a no-op; use `remove_item` to delete.
    pub fn update_quantity(&mut self, item_id: &str, quantity: u32) {
        if quantity < 1 { return; }
        let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) else { return };
        if item.quantity() == quantity { return; }
        item.set_quantity(Quantity::new(quantity));
        let event = CartEvent::QuantityUpdated { item_id: item_id.to_string(), quantity, total: item.total_price };
        self.raise_event(DomainEvent::Cart(event));
        self.persist();
    }

    pub fn remove_item(&mut self, item_id: &str) {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before { return; }
        self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { item_id: item_id.to_string() }));
        self.persist();
    }

    pub fn clear_cart(&mut self) {
        let removed = self.items.len();
        self.items.clear();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared { removed }));
        self.persist();
    }

    /// Sets the drawer flag, or flips it when `open` is `None`.
    pub fn toggle_cart(&mut self, open: Option<bool>) { self.is_open = open.unwrap_or(!self.is_open); }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn persist(&self) { self.storage.save(&self.items); }
}

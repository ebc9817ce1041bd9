//! Domain events
use crate::domain::value_objects::Price;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    ItemAdded { item_id: String, product_id: String, quantity: u32 },
    QuantityIncreased { item_id: String, by: u32, quantity: u32 },
    QuantityUpdated { item_id: String, quantity: u32, total: Price },
    ItemRemoved { item_id: String },
    Cleared { removed: usize },
}

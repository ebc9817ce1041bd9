//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Modifier, ModifierCategory, Product, ProductImage, SelectionError, Variant};
pub use order::{whatsapp_url, CheckoutError, CustomerDetails, OrderLine, OrderSummary};
pub use cart::{line_item_id, CartStore, LineItem, ModifierChoice, SelectedModifier};

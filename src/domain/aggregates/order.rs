//! Order Aggregate
//!
//! The checkout hand-off: a frozen summary of the cart plus the text sent to
//! the store's WhatsApp number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};
use crate::domain::aggregates::cart::CartStore;
use crate::domain::value_objects::Price;
use crate::storage::CartStorage;

const ORDER_PREFIX: &str = "EZPODS";
const DESCRIPTION_LIMIT: usize = 200;
const COUNTRY_CODE: &str = "55";
const GREETING: &str = "Olá! Gostaria de comprar os seguintes produtos:";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: String,
    pub product_name: String,
    pub modifier_names: Vec<String>,
    pub quantity: u32,
    pub line_total: Price,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub lines: Vec<OrderLine>,
    pub total: Price,
    pub total_items: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "brazilian_phone")]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { return Err(ValidationError::new("blank")); }
    Ok(())
}

/// At least area code plus an 8-digit number, ignoring punctuation.
fn brazilian_phone(value: &str) -> Result<(), ValidationError> {
    if value.chars().filter(char::is_ascii_digit).count() < 10 {
        return Err(ValidationError::new("phone_too_short"));
    }
    Ok(())
}

impl OrderSummary {
    pub fn from_cart<S: CartStorage>(cart: &CartStore<S>) -> Result<Self, CheckoutError> {
        Self::from_cart_at(cart, Utc::now())
    }

    pub fn from_cart_at<S: CartStorage>(cart: &CartStore<S>, now: DateTime<Utc>) -> Result<Self, CheckoutError> {
        if cart.is_empty() { return Err(CheckoutError::EmptyCart); }
        let lines = cart.items().iter().map(|item| OrderLine {
            item_id: item.id().to_string(),
            product_name: item.product_name().to_string(),
            modifier_names: item.selected_modifiers().iter().map(|m| m.modifier_name.clone()).collect(),
            quantity: item.quantity(),
            line_total: item.total_price(),
        }).collect();
        Ok(Self {
            order_id: format!("{ORDER_PREFIX}-{}", now.timestamp_millis()),
            lines,
            total: cart.total_price(),
            total_items: cart.total_items(),
            created_at: now,
        })
    }

    /// Text listing every line and the total, ready for a chat message.
    pub fn cart_message(&self) -> String {
        let lines: Vec<String> = self.lines.iter().map(|line| {
            let modifiers = if line.modifier_names.is_empty() {
                String::new()
            } else {
                format!(" ({})", line.modifier_names.join(", "))
            };
            format!("- {}{} ({}x) - {}", line.product_name, modifiers, line.quantity, line.line_total)
        }).collect();
        format!("{GREETING}\n\n{}\n\nTotal: {}", lines.join("\n"), self.total)
    }

    /// Short `2x Name, 1x Other` description for payment links.
    pub fn description(&self) -> String {
        let full = self.lines.iter()
            .map(|l| format!("{}x {}", l.quantity, l.product_name))
            .collect::<Vec<_>>()
            .join(", ");
        full.chars().take(DESCRIPTION_LIMIT).collect()
    }
}

/// `https://wa.me/{number}?text={message}` with the number normalized to
/// digits and the Brazilian country code.
pub fn whatsapp_url(phone_number: &str, message: &str) -> String {
    let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
    let full = if digits.starts_with(COUNTRY_CODE) { digits } else { format!("{COUNTRY_CODE}{digits}") };
    format!("https://wa.me/{}?text={}", full, urlencoding::encode(message))
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid customer details: {0}")]
    InvalidCustomer(#[from] validator::ValidationErrors),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::domain::aggregates::cart::ModifierChoice;
    use crate::domain::aggregates::product::tests::{flavors, product};
    use crate::storage::MemoryStorage;

    fn filled_cart() -> CartStore<MemoryStorage> {
        let b = product("B", 1500, vec![flavors(false, 0, 2)]);
        let mut cart = CartStore::open(MemoryStorage::default());
        cart.add_item(&b, &[ModifierChoice::new("flavor", "grape"), ModifierChoice::new("flavor", "ice")], 2);
        cart.add_item(&product("A", 1000, vec![]), &[], 1);
        cart
    }

    #[test]
    fn test_summary_from_cart() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let summary = OrderSummary::from_cart_at(&filled_cart(), now).unwrap();
        assert_eq!(summary.order_id, format!("EZPODS-{}", now.timestamp_millis()));
        assert_eq!(summary.lines.len(), 2);
        assert_eq!(summary.lines[0].modifier_names, vec!["Uva", "Gelo"]);
        assert_eq!(summary.lines[0].line_total, Price::from_cents(3900));
        assert_eq!(summary.total, Price::from_cents(4900));
        assert_eq!(summary.total_items, 3);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let cart = CartStore::open(MemoryStorage::default());
        assert!(matches!(OrderSummary::from_cart(&cart), Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn test_cart_message() {
        let summary = OrderSummary::from_cart(&filled_cart()).unwrap();
        assert_eq!(
            summary.cart_message(),
            "Olá! Gostaria de comprar os seguintes produtos:\n\n\
             - Pod B (Uva, Gelo) (2x) - R$ 39,00\n\
             - Pod A (1x) - R$ 10,00\n\n\
             Total: R$ 49,00"
        );
    }

    #[test]
    fn test_description_truncated() {
        let mut summary = OrderSummary::from_cart(&filled_cart()).unwrap();
        assert_eq!(summary.description(), "2x Pod B, 1x Pod A");
        summary.lines[0].product_name = "x".repeat(300);
        assert_eq!(summary.description().chars().count(), 200);
    }

    #[test]
    fn test_whatsapp_url() {
        assert_eq!(whatsapp_url("(11) 93358-0273", "Olá mundo"), "https://wa.me/5511933580273?text=Ol%C3%A1%20mundo");
        assert_eq!(whatsapp_url("5511933580273", "a\nb"), "https://wa.me/5511933580273?text=a%0Ab");
    }

    #[test]
    fn test_customer_validation() {
        let ok = CustomerDetails { name: "Ana".into(), phone: "(11) 99999-9999".into(), email: None };
        assert!(ok.validate().is_ok());

        let blank = CustomerDetails { name: "  ".into(), ..ok.clone() };
        assert!(blank.validate().is_err());

        let short_phone = CustomerDetails { phone: "9999-999".into(), ..ok.clone() };
        assert!(short_phone.validate().is_err());

        let bad_email = CustomerDetails { email: Some("nope".into()), ..ok };
        assert!(bad_email.validate().is_err());
    }
}

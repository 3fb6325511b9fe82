//! Orders and shipping details.
//!
//! An order is an immutable record of a completed checkout: the priced line
//! items, the grand total actually charged, and the shipping details the
//! buyer supplied. Items and shipping details are stored as JSON documents
//! alongside the order row.

use chrono::{DateTime, Utc};
use copperleaf_core::{Email, EmailError, OrderId, OrderStatus, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One priced line of an order, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    /// Grand total charged to the wallet, including tax and shipping.
    pub total_amount: Decimal,
    pub shipping_details: ShippingDetails,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub shipping_details: ShippingDetails,
    pub status: OrderStatus,
}

/// Validated shipping details, as stored on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub recipient: String,
    pub email: Email,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Raw shipping details as submitted at checkout, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetailsInput {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShippingDetailsError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field {0} exceeds {1} characters")]
    FieldTooLong(&'static str, usize),
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
}

/// Longest accepted value for any free-form shipping field.
const MAX_FIELD_LENGTH: usize = 200;

impl ShippingDetailsInput {
    /// Validate and normalize the submitted details.
    ///
    /// All fields are trimmed. Every field except `address_line2` is
    /// required, and no field may exceed 200 characters.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing, overlong, or malformed
    /// field.
    pub fn parse(self) -> Result<ShippingDetails, ShippingDetailsError> {
        let email = Email::parse(&self.email)?;
        let address_line2 = match self.address_line2.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(line) => Some(required_field("address_line2", line)?),
        };
        Ok(ShippingDetails {
            recipient: required_field("recipient", &self.recipient)?,
            email,
            address_line1: required_field("address_line1", &self.address_line1)?,
            address_line2,
            city: required_field("city", &self.city)?,
            postal_code: required_field("postal_code", &self.postal_code)?,
            country: required_field("country", &self.country)?,
        })
    }
}

fn required_field(name: &'static str, value: &str) -> Result<String, ShippingDetailsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ShippingDetailsError::MissingField(name));
    }
    if trimmed.len() > MAX_FIELD_LENGTH {
        return Err(ShippingDetailsError::FieldTooLong(name, MAX_FIELD_LENGTH));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn input() -> ShippingDetailsInput {
        ShippingDetailsInput {
            recipient: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            address_line1: "1 Analytical Way".to_owned(),
            address_line2: None,
            city: "London".to_owned(),
            postal_code: "N1 7AA".to_owned(),
            country: "GB".to_owned(),
        }
    }

    #[test]
    fn test_parse_trims_fields() {
        let mut raw = input();
        raw.recipient = "  Ada Lovelace  ".to_owned();
        raw.city = "\tLondon\n".to_owned();

        let details = raw.parse().unwrap();
        assert_eq!(details.recipient, "Ada Lovelace");
        assert_eq!(details.city, "London");
    }

    #[test]
    fn test_parse_rejects_missing_required_field() {
        let mut raw = input();
        raw.postal_code = "   ".to_owned();

        assert_eq!(
            raw.parse().unwrap_err(),
            ShippingDetailsError::MissingField("postal_code")
        );
    }

    #[test]
    fn test_parse_rejects_overlong_field() {
        let mut raw = input();
        raw.address_line1 = "x".repeat(201);

        assert_eq!(
            raw.parse().unwrap_err(),
            ShippingDetailsError::FieldTooLong("address_line1", 200)
        );
    }

    #[test]
    fn test_parse_rejects_bad_email() {
        let mut raw = input();
        raw.email = "not-an-email".to_owned();

        assert!(matches!(
            raw.parse().unwrap_err(),
            ShippingDetailsError::Email(_)
        ));
    }

    #[test]
    fn test_blank_address_line2_becomes_none() {
        let mut raw = input();
        raw.address_line2 = Some("   ".to_owned());

        let details = raw.parse().unwrap();
        assert_eq!(details.address_line2, None);
    }

    #[test]
    fn test_present_address_line2_is_kept() {
        let mut raw = input();
        raw.address_line2 = Some(" Flat 2 ".to_owned());

        let details = raw.parse().unwrap();
        assert_eq!(details.address_line2.as_deref(), Some("Flat 2"));
    }

    #[test]
    fn test_shipping_details_serde_roundtrip() {
        let details = input().parse().unwrap();
        let json = serde_json::to_value(&details).unwrap();
        let back: ShippingDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, details);
    }

    #[test]
    fn test_order_item_serde_roundtrip() {
        let item = OrderItem {
            product_id: ProductId::from("sku-1"),
            name: "Widget".to_owned(),
            unit_price: dec!(19.99),
            quantity: 2,
            line_total: dec!(39.98),
        };
        let json = serde_json::to_value(&item).unwrap();
        let back: OrderItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}

//! Cart aggregate.
//!
//! A cart is one document per user: mutating a line always rewrites the whole
//! cart inside a unit of work, so partial line updates cannot interleave.
//! Totals are derived on read, never stored.
//!
//! Line snapshots (`name`, `unit_price`, `stock`) are display data captured
//! from the catalog when the line was last touched. They are NOT trusted at
//! checkout; checkout revalidates and reprices every line against the live
//! catalog.

use chrono::{DateTime, Utc};
use copperleaf_core::{ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;

/// A user's shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a cart, keyed by product id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Product name as seen when the line was last touched.
    pub name: String,
    /// Unit price as seen when the line was last touched.
    pub unit_price: Decimal,
    /// Stock level as seen when the line was last touched.
    pub stock: i64,
}

impl CartLine {
    /// Quantity times the snapshot unit price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Sum of line quantities.
    pub total_items: u32,
    /// Sum of line totals at snapshot prices.
    pub total_price: Decimal,
}

impl Cart {
    /// An empty cart for a user. Carts are created on first access, so this
    /// is also what reads return before any line was added.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Insert or update the line for a product, refreshing its snapshots.
    ///
    /// An existing line keeps its position; a new line is appended. The
    /// caller decides the final quantity (merge rules live in the cart
    /// service).
    pub fn put_line(&mut self, product: &Product, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = quantity;
            line.name.clone_from(&product.name);
            line.unit_price = product.price;
            line.stock = product.stock;
        } else {
            self.lines.push(CartLine {
                product_id: product.id.clone(),
                quantity,
                name: product.name.clone(),
                unit_price: product.price,
                stock: product.stock,
            });
        }
        self.updated_at = Utc::now();
    }

    /// Remove the line for a product. Returns whether a line was removed.
    pub fn remove_line(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        let removed = self.lines.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Remove all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.updated_at = Utc::now();
    }

    /// Compute totals from the current lines.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals {
            total_items: self.lines.iter().map(|l| l.quantity).sum(),
            total_price: self.lines.iter().map(CartLine::line_total).sum(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn product(id: &str, price: Decimal, stock: i64) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            price,
            stock,
        }
    }

    #[test]
    fn test_put_line_appends_then_updates_in_place() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.put_line(&product("a", dec!(10.00), 5), 1);
        cart.put_line(&product("b", dec!(2.50), 9), 2);

        // Updating "a" must not move it to the end.
        cart.put_line(&product("a", dec!(10.00), 5), 3);
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.lines.first().unwrap().product_id.as_str(), "a");
        assert_eq!(cart.lines.first().unwrap().quantity, 3);
    }

    #[test]
    fn test_put_line_refreshes_snapshots() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.put_line(&product("a", dec!(10.00), 5), 1);

        let mut repriced = product("a", dec!(12.00), 3);
        repriced.name = "Renamed".to_owned();
        cart.put_line(&repriced, 2);

        let line = cart.line(&ProductId::from("a")).unwrap();
        assert_eq!(line.unit_price, dec!(12.00));
        assert_eq!(line.stock, 3);
        assert_eq!(line.name, "Renamed");
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.put_line(&product("a", dec!(1.00), 5), 1);

        assert!(cart.remove_line(&ProductId::from("a")));
        assert!(cart.is_empty());
        assert!(!cart.remove_line(&ProductId::from("a")));
    }

    #[test]
    fn test_totals_sum_quantities_and_line_totals() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.put_line(&product("a", dec!(19.99), 5), 2);
        cart.put_line(&product("b", dec!(0.01), 100), 3);

        let totals = cart.totals();
        assert_eq!(totals.total_items, 5);
        assert_eq!(totals.total_price, dec!(40.01));
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let totals = Cart::empty(UserId::new(1)).totals();
        assert_eq!(totals.total_items, 0);
        assert_eq!(totals.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.put_line(&product("a", dec!(1.00), 5), 1);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_lines_serde_roundtrip() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.put_line(&product("a", dec!(10.50), 5), 2);

        let json = serde_json::to_value(&cart.lines).unwrap();
        let lines: Vec<CartLine> = serde_json::from_value(json).unwrap();
        assert_eq!(lines, cart.lines);
    }
}

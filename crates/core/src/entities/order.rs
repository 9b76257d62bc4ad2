//! Order records (`orders`, `order_items`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Money, OrderId, OrderItemId, OrderStatus, ProductId, ProfileId};

/// A purchase linking a customer to a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: ProfileId,
    pub her_host_id: ProfileId,
    /// Authoritative order total. Revenue is summed from this, never from
    /// line items.
    pub total_amount: Money,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    pub shipping_address: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Lifecycle status, treating an unset column as pending.
    #[must_use]
    pub fn lifecycle(&self) -> OrderStatus {
        self.status.unwrap_or_default()
    }
}

/// A line item of an order. Not joined by any dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub price: Money,
    pub quantity: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

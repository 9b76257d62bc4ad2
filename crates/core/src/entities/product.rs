//! Product records (`products`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::Pricing;
use crate::types::{Money, ProductId, ProductStatus, ProfileId};

/// A product listed by a host, optionally sourced from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub her_host_id: ProfileId,
    #[serde(default)]
    pub her_supplier_id: Option<ProfileId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub bulk_price: Option<Money>,
    #[serde(default)]
    pub bulk_quantity: Option<i32>,
    #[serde(default)]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Moderation status, treating an unset column as pending.
    #[must_use]
    pub fn moderation(&self) -> ProductStatus {
        self.status.unwrap_or_default()
    }

    /// Whether the product is marked featured.
    #[must_use]
    pub fn featured(&self) -> bool {
        self.is_featured.unwrap_or(false)
    }

    /// Image URLs (empty when none were uploaded).
    #[must_use]
    pub fn image_urls(&self) -> &[String] {
        self.images.as_deref().unwrap_or_default()
    }

    /// The price fields that feed pricing derivation.
    #[must_use]
    pub const fn pricing(&self) -> Pricing {
        Pricing {
            price: self.price,
            sale_price: self.sale_price,
            bulk_price: self.bulk_price,
            bulk_quantity: self.bulk_quantity,
        }
    }
}

//! Status enums for marketplace entities.
//!
//! Each enum is a closed set matching the backend's Postgres enum of the same
//! name. An unknown value on the wire is a deserialization error, not a
//! silent fallback.

use serde::{Deserialize, Serialize};

/// Order lifecycle status (`order_status`).
///
/// Progresses `pending -> confirmed -> processing -> shipped -> delivered`,
/// with `cancelled` reachable from any state before delivery. Transitions are
/// enforced by the backend; the storefront only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Product moderation status (`product_status`).
///
/// Products are created `pending` and move to `approved` or `rejected` only
/// through an admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ProductStatus {
    /// All statuses.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Reward claim status (`reward_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl RewardStatus {
    /// All statuses.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Approved, Self::Rejected, Self::Paid];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }
}

macro_rules! impl_display_from_str {
    ($ty:ident, $what:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|status| status.as_str() == s)
                    .ok_or_else(|| format!(concat!("invalid ", $what, ": {}"), s))
            }
        }
    };
}

impl_display_from_str!(OrderStatus, "order status");
impl_display_from_str!(ProductStatus, "product status");
impl_display_from_str!(RewardStatus, "reward status");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_names() {
        let names: Vec<_> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
        assert_eq!(
            names,
            ["pending", "confirmed", "processing", "shipped", "delivered", "cancelled"]
        );
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_product_status_round_trip_through_from_str() {
        for status in ProductStatus::ALL {
            assert_eq!(status.as_str().parse::<ProductStatus>().unwrap(), status);
        }
        assert!("archived".parse::<ProductStatus>().is_err());
    }

    #[test]
    fn test_reward_status_is_closed() {
        assert!(serde_json::from_str::<RewardStatus>("\"paid\"").is_ok());
        assert!(serde_json::from_str::<RewardStatus>("\"refunded\"").is_err());
    }
}

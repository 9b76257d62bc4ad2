//! Dashboard aggregation.
//!
//! Every figure on a dashboard is derived from the rows that dashboard already
//! fetched. Nothing here issues a per-item lookup.

use crate::cache::EntityCache;
use crate::entities::{Order, Product, Profile, Referral, RewardClaim, RewardMilestone};
use crate::types::{Money, ProductId, ProductStatus, ProfileId};

/// Default reward credited per successful referral.
pub const DEFAULT_REFERRAL_REWARD: i64 = 100;

/// Whether a product is waiting on moderation.
#[must_use]
pub fn is_pending_product(product: &Product) -> bool {
    product.moderation() == ProductStatus::Pending
}

/// Sum of order totals. Line items are never consulted.
#[must_use]
pub fn revenue(orders: &[Order]) -> Money {
    orders.iter().map(|o| o.total_amount).sum()
}

// =============================================================================
// Customer
// =============================================================================

/// Referral program totals for one referrer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralStats {
    pub count: usize,
    pub earnings: Money,
}

impl ReferralStats {
    /// Flat reward per referral.
    #[must_use]
    pub fn from_referrals(referrals: &[Referral], reward_per_referral: Money) -> Self {
        let count = referrals.len();
        let earnings = u32::try_from(count)
            .map_or(Money::ZERO, |n| reward_per_referral.times(n));
        Self { count, earnings }
    }
}

/// Everything the customer dashboard renders.
#[derive(Debug, Clone, Default)]
pub struct CustomerDashboard {
    pub orders: Vec<Order>,
    pub featured: Vec<Product>,
    pub referrals: Vec<Referral>,
    pub milestones: Vec<RewardMilestone>,
    pub claims: Vec<RewardClaim>,
}

impl CustomerDashboard {
    /// Number of orders placed.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Referral totals at the given per-referral reward.
    #[must_use]
    pub fn referral_stats(&self, reward_per_referral: Money) -> ReferralStats {
        ReferralStats::from_referrals(&self.referrals, reward_per_referral)
    }
}

// =============================================================================
// Host
// =============================================================================

/// Headline figures on the host dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStats {
    pub total_products: usize,
    pub active_products: usize,
    pub total_orders: usize,
    pub total_revenue: Money,
}

/// Everything the host (and supplier) dashboard renders.
#[derive(Debug, Clone, Default)]
pub struct HostDashboard {
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
}

impl HostDashboard {
    /// Derive headline figures.
    #[must_use]
    pub fn stats(&self) -> HostStats {
        HostStats {
            total_products: self.products.len(),
            active_products: self
                .products
                .iter()
                .filter(|p| p.moderation() == ProductStatus::Approved)
                .count(),
            total_orders: self.orders.len(),
            total_revenue: revenue(&self.orders),
        }
    }
}

// =============================================================================
// Admin
// =============================================================================

/// Headline figures on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminStats {
    pub total_users: usize,
    /// Profiles awaiting approval plus products awaiting moderation.
    pub pending_approvals: usize,
    pub total_products: usize,
    pub total_orders: usize,
}

/// Everything the admin dashboard renders.
///
/// Profiles and products sit in entity caches so approvals can be applied by
/// ID once the backend acknowledges them.
#[derive(Debug, Clone, Default)]
pub struct AdminDashboard {
    pub profiles: EntityCache<Profile>,
    pub products: EntityCache<Product>,
    pub orders: Vec<Order>,
}

impl AdminDashboard {
    /// Assemble from fetched rows.
    #[must_use]
    pub fn new(profiles: Vec<Profile>, products: Vec<Product>, orders: Vec<Order>) -> Self {
        Self {
            profiles: EntityCache::from_rows(profiles),
            products: EntityCache::from_rows(products),
            orders,
        }
    }

    /// Profiles waiting on approval, in fetch order.
    pub fn pending_profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter().filter(|p| p.awaiting_approval())
    }

    /// Products waiting on moderation, in fetch order.
    pub fn pending_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| is_pending_product(p))
    }

    /// Derive headline figures.
    #[must_use]
    pub fn stats(&self) -> AdminStats {
        AdminStats {
            total_users: self.profiles.len(),
            pending_approvals: self.pending_profiles().count() + self.pending_products().count(),
            total_products: self.products.len(),
            total_orders: self.orders.len(),
        }
    }

    /// Record an acknowledged profile approval.
    ///
    /// Prefers the row the backend returned; falls back to flipping the flag
    /// on the cached row. Returns `false` if the profile is not cached.
    pub fn apply_profile_approval(&mut self, id: ProfileId, acknowledged: Option<Profile>) -> bool {
        match acknowledged {
            Some(row) if row.id == id => self.profiles.replace(row).is_some(),
            _ => self.profiles.update(&id, |p| p.is_approved = Some(true)),
        }
    }

    /// Record an acknowledged product status change.
    pub fn apply_product_status(
        &mut self,
        id: ProductId,
        status: ProductStatus,
        acknowledged: Option<Product>,
    ) -> bool {
        match acknowledged {
            Some(row) if row.id == id => self.products.replace(row).is_some(),
            _ => self.products.update(&id, |p| p.status = Some(status)),
        }
    }
}

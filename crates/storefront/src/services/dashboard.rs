//! Per-role dashboard loading and admin moderation.
//!
//! Each dashboard issues one query per table it shows and derives every
//! figure from those rows. Every page load refetches. The last rendered
//! snapshot is kept per `(profile, sign-in generation)` only so an
//! acknowledged moderation can be applied to it by ID and shown once, on the
//! redirect that follows the action.

use std::future::ready;
use std::sync::Arc;
use std::time::Duration;

use herhouse_core::dashboard::{AdminDashboard, CustomerDashboard, HostDashboard};
use herhouse_core::{
    DashboardView, Order, Product, ProductId, ProductStatus, Profile, ProfileId, Referral,
    RewardClaim, RewardMilestone,
};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use crate::backend::{BackendClient, BackendError, TableQuery};
use crate::services::CatalogService;

const PROFILES: &str = "profiles";
const PRODUCTS: &str = "products";
const ORDERS: &str = "orders";
const REFERRALS: &str = "referrals";
const MILESTONES: &str = "reward_milestones";
const CLAIMS: &str = "reward_claims";

/// Featured products shown on the customer dashboard.
const FEATURED_LIMIT: usize = 6;

/// How long a rendered snapshot can still receive moderation changes.
const SNAPSHOT_TTL: Duration = Duration::from_secs(30);

/// Snapshot cache key: viewer profile and sign-in generation.
pub type SnapshotKey = (ProfileId, u64);

/// A loaded dashboard.
#[derive(Debug, Clone)]
pub enum DashboardSnapshot {
    Admin(Arc<AdminDashboard>),
    Host(Arc<HostDashboard>),
    Customer(Arc<CustomerDashboard>),
}

impl DashboardSnapshot {
    /// The dashboard this snapshot renders.
    #[must_use]
    pub const fn view(&self) -> DashboardView {
        match self {
            Self::Admin(_) => DashboardView::Admin,
            Self::Host(_) => DashboardView::Host,
            Self::Customer(_) => DashboardView::Customer,
        }
    }
}

/// The last snapshot rendered for a viewer.
#[derive(Debug, Clone)]
struct Rendered {
    snapshot: DashboardSnapshot,
    /// Moderation changed it since it was last shown.
    patched: bool,
}

#[derive(Serialize)]
struct ApprovalPatch {
    is_approved: bool,
}

#[derive(Serialize)]
struct StatusPatch {
    status: ProductStatus,
}

/// Loads dashboards and applies admin moderation.
#[derive(Clone)]
pub struct DashboardService {
    backend: BackendClient,
    catalog: CatalogService,
    rendered: Cache<SnapshotKey, Rendered>,
}

impl DashboardService {
    #[must_use]
    pub fn new(backend: BackendClient, catalog: CatalogService) -> Self {
        let rendered = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(SNAPSHOT_TTL)
            .build();

        Self {
            backend,
            catalog,
            rendered,
        }
    }

    /// Take the snapshot moderation patched since it was last shown.
    ///
    /// Returns it at most once; later loads refetch.
    pub async fn take_patched(&self, key: SnapshotKey) -> Option<DashboardSnapshot> {
        let result = self
            .rendered
            .entry(key)
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) if entry.value().patched => Op::Put(Rendered {
                        snapshot: entry.into_value().snapshot,
                        patched: false,
                    }),
                    _ => Op::Nop,
                };
                ready(op)
            })
            .await;

        match result {
            CompResult::ReplacedWith(entry) => {
                debug!("Showing moderated dashboard snapshot");
                Some(entry.into_value().snapshot)
            }
            _ => None,
        }
    }

    /// Keep the snapshot just rendered for this sign-in.
    pub async fn remember(&self, key: SnapshotKey, snapshot: DashboardSnapshot) {
        self.rendered
            .insert(
                key,
                Rendered {
                    snapshot,
                    patched: false,
                },
            )
            .await;
    }

    /// Fetch the dashboard `view` for `profile`, acting as the viewer.
    ///
    /// # Errors
    ///
    /// Returns an error if any required table cannot be read.
    #[instrument(skip(self, profile, token), fields(profile_id = %profile.id))]
    pub async fn fetch(
        &self,
        profile: &Profile,
        view: DashboardView,
        token: &str,
    ) -> Result<DashboardSnapshot, BackendError> {
        match view {
            DashboardView::Admin => self
                .fetch_admin(token)
                .await
                .map(|d| DashboardSnapshot::Admin(Arc::new(d))),
            DashboardView::Host => self
                .fetch_host(profile.id, token)
                .await
                .map(|d| DashboardSnapshot::Host(Arc::new(d))),
            DashboardView::Customer => self
                .fetch_customer(profile.id, token)
                .await
                .map(|d| DashboardSnapshot::Customer(Arc::new(d))),
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        query: TableQuery,
        token: &str,
    ) -> Result<Vec<T>, BackendError> {
        self.backend.select(&query, Some(token)).await
    }

    /// Rows that only decorate a dashboard: failures are logged and shown as
    /// empty.
    async fn select_optional<T: DeserializeOwned>(&self, query: TableQuery, token: &str) -> Vec<T> {
        let table = query.table();
        self.select(query, token).await.unwrap_or_else(|e| {
            warn!(table, error = %e, "Optional dashboard rows unavailable");
            Vec::new()
        })
    }

    async fn fetch_admin(&self, token: &str) -> Result<AdminDashboard, BackendError> {
        let (profiles, products, orders) = tokio::try_join!(
            self.select::<Profile>(TableQuery::new(PROFILES).newest_first(), token),
            self.select::<Product>(TableQuery::new(PRODUCTS).newest_first(), token),
            self.select::<Order>(TableQuery::new(ORDERS).newest_first(), token),
        )?;

        Ok(AdminDashboard::new(profiles, products, orders))
    }

    async fn fetch_host(&self, host: ProfileId, token: &str) -> Result<HostDashboard, BackendError> {
        let (products, orders) = tokio::try_join!(
            self.select::<Product>(
                TableQuery::new(PRODUCTS).eq("her_host_id", host).newest_first(),
                token,
            ),
            self.select::<Order>(
                TableQuery::new(ORDERS).eq("her_host_id", host).newest_first(),
                token,
            ),
        )?;

        Ok(HostDashboard { products, orders })
    }

    async fn fetch_customer(
        &self,
        customer: ProfileId,
        token: &str,
    ) -> Result<CustomerDashboard, BackendError> {
        let required = async {
            tokio::try_join!(
                self.select::<Order>(
                    TableQuery::new(ORDERS)
                        .eq("customer_id", customer)
                        .newest_first(),
                    token,
                ),
                self.select::<Product>(
                    TableQuery::new(PRODUCTS)
                        .eq("status", ProductStatus::Approved.as_str())
                        .eq("is_featured", true)
                        .limit(FEATURED_LIMIT),
                    token,
                ),
                self.select::<Referral>(
                    TableQuery::new(REFERRALS).eq("referrer_id", customer),
                    token,
                ),
            )
        };
        let (required, milestones, claims) = tokio::join!(
            required,
            self.select_optional::<RewardMilestone>(
                TableQuery::new(MILESTONES).eq("is_active", true),
                token,
            ),
            self.select_optional::<RewardClaim>(
                TableQuery::new(CLAIMS).eq("user_id", customer),
                token,
            ),
        );
        let (orders, featured, referrals) = required?;

        Ok(CustomerDashboard {
            orders,
            featured,
            referrals,
            milestones,
            claims,
        })
    }

    // =========================================================================
    // Admin moderation
    // =========================================================================

    /// Approve a profile. The rendered admin snapshot changes only after the
    /// backend acknowledges.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token), fields(profile_id = %id))]
    pub async fn approve_profile(
        &self,
        key: SnapshotKey,
        id: ProfileId,
        token: &str,
    ) -> Result<(), BackendError> {
        let row: Profile = self
            .backend
            .update(PROFILES, id, &ApprovalPatch { is_approved: true }, Some(token))
            .await?;

        self.apply_admin(key, |admin| admin.apply_profile_approval(id, Some(row)))
            .await;
        Ok(())
    }

    /// Approve or reject a product. The rendered admin snapshot changes only
    /// after the backend acknowledges; the public listing is invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn set_product_status(
        &self,
        key: SnapshotKey,
        id: ProductId,
        status: ProductStatus,
        token: &str,
    ) -> Result<(), BackendError> {
        let row: Product = self
            .backend
            .update(PRODUCTS, id, &StatusPatch { status }, Some(token))
            .await?;

        self.apply_admin(key, |admin| admin.apply_product_status(id, status, Some(row)))
            .await;
        self.catalog.invalidate().await;
        Ok(())
    }

    /// Apply `change` to the rendered admin snapshot and mark it patched.
    ///
    /// Runs as one atomic update of the cache entry, so concurrent moderation
    /// by the same admin keeps every change.
    async fn apply_admin(
        &self,
        key: SnapshotKey,
        change: impl FnOnce(&mut AdminDashboard) -> bool,
    ) {
        let result = self
            .rendered
            .entry(key)
            .and_compute_with(|entry| {
                let op = match entry.map(moka::Entry::into_value) {
                    Some(Rendered {
                        snapshot: DashboardSnapshot::Admin(current),
                        ..
                    }) => {
                        let mut updated = (*current).clone();
                        if change(&mut updated) {
                            Op::Put(Rendered {
                                snapshot: DashboardSnapshot::Admin(Arc::new(updated)),
                                patched: true,
                            })
                        } else {
                            Op::Nop
                        }
                    }
                    _ => Op::Nop,
                };
                ready(op)
            })
            .await;

        if !matches!(result, CompResult::ReplacedWith(_)) {
            debug!("Moderated row not in rendered snapshot");
        }
    }
}

//! Role dashboards rendered at `/`.
//!
//! Not a route of its own: the home handler routes a signed-in visitor here
//! once their profile is resolved.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Redirect, Response};
use herhouse_core::dashboard::{
    AdminDashboard, AdminStats, CustomerDashboard, HostDashboard, HostStats, revenue,
};
use herhouse_core::{DashboardView, Order, Profile, ProfileRole, RewardMilestone, UserRole};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::is_current;
use crate::models::{Flash, SessionContext};
use crate::routes::PageChrome;
use crate::routes::products::ProductCard;
use crate::services::{DashboardSnapshot, SnapshotKey};
use crate::state::AppState;

/// Orders listed on the admin dashboard.
const RECENT_ORDERS: usize = 10;

// =============================================================================
// View Types
// =============================================================================

/// The viewer's own profile, prefilled into the edit form.
pub struct ProfileView {
    pub full_name: String,
    pub email: String,
    pub initial: String,
    pub role: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub avatar_url: String,
    /// Hosts and suppliers also edit their storefront.
    pub has_store: bool,
    pub store_name: String,
    pub store_slug: String,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            initial: profile.initial(),
            role: profile.role.label().to_owned(),
            phone: text(&profile.phone),
            address: text(&profile.address),
            city: text(&profile.city),
            avatar_url: text(&profile.avatar_url),
            has_store: matches!(
                profile.role,
                ProfileRole::Known(UserRole::Host | UserRole::Supplier)
            ),
            store_name: text(&profile.store_name),
            store_slug: text(&profile.store_slug),
        }
    }
}

/// Order table row.
pub struct OrderRow {
    pub order_number: String,
    pub status: &'static str,
    pub total: String,
    pub placed_on: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            status: order.lifecycle().as_str(),
            total: order.total_amount.to_string(),
            placed_on: order
                .created_at
                .map(|at| at.format("%b %-d, %Y").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Profile awaiting admin approval.
pub struct PendingProfileRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub store_name: Option<String>,
}

impl From<&Profile> for PendingProfileRow {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.to_string(),
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            role: profile.role.label().to_owned(),
            store_name: profile.store_name.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Reward milestone with the customer's progress toward it.
pub struct MilestoneRow {
    pub title: String,
    pub description: String,
    /// "3 / 10 referrals" for referral milestones.
    pub progress: Option<String>,
    /// Progress toward the target, 0 to 100.
    pub percent: usize,
    pub reward: Option<String>,
    /// Status of the customer's claim, if they made one.
    pub claim: Option<&'static str>,
}

impl MilestoneRow {
    fn new(milestone: &RewardMilestone, dashboard: &CustomerDashboard) -> Self {
        let progress = milestone.referral_progress(dashboard.referrals.len());
        Self {
            title: milestone.title.clone(),
            description: milestone.description.clone().unwrap_or_default(),
            progress: progress.map(|(done, target)| format!("{done} / {target} referrals")),
            percent: progress
                .filter(|(_, target)| *target > 0)
                .map_or(0, |(done, target)| done * 100 / target),
            reward: milestone.reward_amount.map(|amount| amount.to_string()),
            claim: dashboard
                .claims
                .iter()
                .find(|claim| claim.milestone_id == milestone.id)
                .map(|claim| claim.status.unwrap_or_default().as_str()),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/admin.html")]
pub struct AdminDashboardTemplate {
    pub chrome: PageChrome,
    pub profile: ProfileView,
    pub stats: AdminStats,
    pub revenue: String,
    pub pending_profiles: Vec<PendingProfileRow>,
    pub pending_products: Vec<ProductCard>,
    /// Most recent orders only.
    pub orders: Vec<OrderRow>,
}

impl AdminDashboardTemplate {
    fn new(chrome: PageChrome, profile: &Profile, dashboard: &AdminDashboard) -> Self {
        Self {
            chrome,
            profile: ProfileView::from(profile),
            stats: dashboard.stats(),
            revenue: revenue(&dashboard.orders).to_string(),
            pending_profiles: dashboard
                .pending_profiles()
                .map(PendingProfileRow::from)
                .collect(),
            pending_products: dashboard.pending_products().map(ProductCard::from).collect(),
            orders: dashboard
                .orders
                .iter()
                .take(RECENT_ORDERS)
                .map(OrderRow::from)
                .collect(),
        }
    }
}

/// Host and supplier dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/host.html")]
pub struct HostDashboardTemplate {
    pub chrome: PageChrome,
    pub profile: ProfileView,
    pub awaiting_approval: bool,
    pub stats: HostStats,
    pub products: Vec<ProductCard>,
    pub orders: Vec<OrderRow>,
}

impl HostDashboardTemplate {
    fn new(chrome: PageChrome, profile: &Profile, dashboard: &HostDashboard) -> Self {
        Self {
            chrome,
            profile: ProfileView::from(profile),
            awaiting_approval: profile.awaiting_approval(),
            stats: dashboard.stats(),
            products: dashboard.products.iter().map(ProductCard::from).collect(),
            orders: dashboard.orders.iter().map(OrderRow::from).collect(),
        }
    }
}

/// Customer and affiliate dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/customer.html")]
pub struct CustomerDashboardTemplate {
    pub chrome: PageChrome,
    pub profile: ProfileView,
    pub order_count: usize,
    pub referral_code: String,
    pub referral_count: usize,
    pub referral_earnings: String,
    pub orders: Vec<OrderRow>,
    pub featured: Vec<ProductCard>,
    pub milestones: Vec<MilestoneRow>,
}

impl CustomerDashboardTemplate {
    fn new(
        chrome: PageChrome,
        profile: &Profile,
        dashboard: &CustomerDashboard,
        state: &AppState,
    ) -> Self {
        let referrals = dashboard.referral_stats(state.config().referral_reward);
        Self {
            chrome,
            profile: ProfileView::from(profile),
            order_count: dashboard.order_count(),
            referral_code: profile
                .referral_code
                .clone()
                .filter(|code| !code.is_empty())
                .unwrap_or_else(|| "N/A".to_owned()),
            referral_count: referrals.count,
            referral_earnings: referrals.earnings.to_string(),
            orders: dashboard.orders.iter().map(OrderRow::from).collect(),
            featured: dashboard.featured.iter().map(ProductCard::from).collect(),
            milestones: dashboard
                .milestones
                .iter()
                .map(|milestone| MilestoneRow::new(milestone, dashboard))
                .collect(),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Empty dashboard shown when loading fails.
fn empty(view: DashboardView) -> DashboardSnapshot {
    match view {
        DashboardView::Admin => DashboardSnapshot::Admin(Arc::default()),
        DashboardView::Host => DashboardSnapshot::Host(Arc::default()),
        DashboardView::Customer => DashboardSnapshot::Customer(Arc::default()),
    }
}

/// Render the `view` dashboard for `profile`.
///
/// Refetches on every load, except right after a moderation action where the
/// patched snapshot is shown once. A snapshot fetched for a sign-in that
/// ended mid-request is dropped and the visitor is sent back to `/`.
#[instrument(skip_all, fields(profile_id = %profile.id, ?view))]
pub async fn render(
    state: &AppState,
    session: &Session,
    context: &SessionContext,
    mut chrome: PageChrome,
    profile: &Profile,
    view: DashboardView,
) -> Response {
    let key: SnapshotKey = (profile.id, context.generation);
    let dashboards = state.dashboards();

    let patched = dashboards
        .take_patched(key)
        .await
        .filter(|snapshot| snapshot.view() == view);

    let snapshot = if let Some(snapshot) = patched {
        snapshot
    } else {
        match dashboards.fetch(profile, view, context.access_token()).await {
            Ok(snapshot) => {
                if !is_current(session, context).await {
                    tracing::debug!("Sign-in changed while loading dashboard, discarding");
                    return Redirect::to("/").into_response();
                }
                dashboards.remember(key, snapshot.clone()).await;
                snapshot
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load dashboard data");
                chrome.push(Flash::error("Error", "Failed to load dashboard data"));
                empty(view)
            }
        }
    };

    match snapshot {
        DashboardSnapshot::Admin(dashboard) => {
            AdminDashboardTemplate::new(chrome, profile, &dashboard).into_response()
        }
        DashboardSnapshot::Host(dashboard) => {
            HostDashboardTemplate::new(chrome, profile, &dashboard).into_response()
        }
        DashboardSnapshot::Customer(dashboard) => {
            CustomerDashboardTemplate::new(chrome, profile, &dashboard, state).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herhouse_core::{
        ClaimId, IdentityId, MilestoneId, OrderId, ProfileId, Referral, ReferralId, RewardClaim,
        RewardStatus,
    };
    use serde_json::json;

    use super::*;

    fn profile(role: &str) -> Profile {
        serde_json::from_value(json!({
            "id": ProfileId::random(),
            "user_id": IdentityId::random(),
            "email": "amna@example.pk",
            "full_name": "Amna",
            "role": role,
        }))
        .unwrap()
    }

    fn milestone(target: i32) -> RewardMilestone {
        serde_json::from_value(json!({
            "id": MilestoneId::random(),
            "title": "Spread the word",
            "target_referrals": target,
            "reward_amount": 500,
        }))
        .unwrap()
    }

    #[test]
    fn test_profile_view_store_fields_for_hosts_only() {
        assert!(ProfileView::from(&profile("her_host")).has_store);
        assert!(ProfileView::from(&profile("her_supplier")).has_store);
        assert!(!ProfileView::from(&profile("her_customer")).has_store);
        assert!(!ProfileView::from(&profile("something_new")).has_store);
    }

    #[test]
    fn test_order_row() {
        let order: Order = serde_json::from_value(json!({
            "id": OrderId::random(),
            "order_number": "HH-0042",
            "customer_id": ProfileId::random(),
            "her_host_id": ProfileId::random(),
            "total_amount": 12500,
            "shipping_address": "Karachi",
            "phone": "0300",
            "created_at": "2024-03-05T10:00:00Z",
        }))
        .unwrap();

        let row = OrderRow::from(&order);
        assert_eq!(row.status, "pending");
        assert_eq!(row.total, "PKR 12,500");
        assert_eq!(row.placed_on, "Mar 5, 2024");
    }

    #[test]
    fn test_milestone_progress_and_claim() {
        let customer = ProfileId::random();
        let milestone = milestone(4);
        let dashboard = CustomerDashboard {
            referrals: (0..3)
                .map(|_| Referral {
                    id: ReferralId::random(),
                    referrer_id: customer,
                    referred_id: ProfileId::random(),
                    referral_code: "HH1".to_owned(),
                    created_at: None,
                })
                .collect(),
            claims: vec![RewardClaim {
                id: ClaimId::random(),
                user_id: customer,
                milestone_id: milestone.id,
                status: Some(RewardStatus::Approved),
                proof_url: None,
                admin_notes: None,
                claimed_at: None,
                processed_at: None,
            }],
            ..CustomerDashboard::default()
        };

        let row = MilestoneRow::new(&milestone, &dashboard);
        assert_eq!(row.progress.as_deref(), Some("3 / 4 referrals"));
        assert_eq!(row.percent, 75);
        assert_eq!(row.reward.as_deref(), Some("PKR 500"));
        assert_eq!(row.claim, Some("approved"));
    }

    #[test]
    fn test_milestone_with_zero_target() {
        let row = MilestoneRow::new(&milestone(0), &CustomerDashboard::default());
        assert_eq!(row.percent, 0);
        assert_eq!(row.claim, None);
    }

    #[test]
    fn test_empty_snapshot_matches_view() {
        for view in [DashboardView::Admin, DashboardView::Host, DashboardView::Customer] {
            assert_eq!(empty(view).view(), view);
        }
    }
}

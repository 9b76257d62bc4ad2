//! User roles and the role-to-dashboard mapping.

use serde::{Deserialize, Serialize};

/// Marketplace role (`user_role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Marketplace operator.
    #[serde(rename = "admin")]
    Admin,
    /// Wholesale supplier listing products for hosts.
    #[serde(rename = "her_supplier")]
    Supplier,
    /// Reseller running a storefront.
    #[serde(rename = "her_host")]
    Host,
    /// Shopper. The default role for a freshly bootstrapped profile.
    #[serde(rename = "her_customer")]
    Customer,
    /// Affiliate earning referral rewards.
    #[serde(rename = "her_affiliate_partner")]
    AffiliatePartner,
}

impl UserRole {
    /// All roles.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Supplier,
        Self::Host,
        Self::Customer,
        Self::AffiliatePartner,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Supplier => "her_supplier",
            Self::Host => "her_host",
            Self::Customer => "her_customer",
            Self::AffiliatePartner => "her_affiliate_partner",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Supplier => "HerSupplier",
            Self::Host => "HerHost",
            Self::Customer => "HerCustomer",
            Self::AffiliatePartner => "Affiliate Partner",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("invalid user role: {s}"))
    }
}

/// The role value stored on a profile row.
///
/// The backend enum may grow before this code does, so a profile can carry a
/// role string we do not know. That value is kept verbatim instead of failing
/// the whole profile load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileRole {
    Known(UserRole),
    Unrecognized(String),
}

impl ProfileRole {
    /// Classify a raw role string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.parse::<UserRole>()
            .map_or_else(|_| Self::Unrecognized(raw.to_owned()), Self::Known)
    }

    /// Whether this is exactly the customer role.
    #[must_use]
    pub const fn is_customer(&self) -> bool {
        matches!(self, Self::Known(UserRole::Customer))
    }

    /// Label for display.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Known(role) => role.label(),
            Self::Unrecognized(raw) => raw,
        }
    }

    /// The dashboard this role is routed to.
    #[must_use]
    pub const fn dashboard(&self) -> DashboardView {
        DashboardView::for_role(self)
    }
}

impl From<UserRole> for ProfileRole {
    fn from(role: UserRole) -> Self {
        Self::Known(role)
    }
}

/// One of the three dashboards a signed-in user can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardView {
    Admin,
    Host,
    Customer,
}

impl DashboardView {
    /// Total mapping from a profile role to its dashboard.
    ///
    /// Suppliers share the host dashboard. Affiliates and any role this build
    /// does not recognise land on the customer dashboard.
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn for_role(role: &ProfileRole) -> Self {
        match role {
            ProfileRole::Known(UserRole::Admin) => Self::Admin,
            ProfileRole::Known(UserRole::Host) => Self::Host,
            ProfileRole::Known(UserRole::Supplier) => Self::Host,
            ProfileRole::Known(UserRole::Customer) => Self::Customer,
            ProfileRole::Known(UserRole::AffiliatePartner) => Self::Customer,
            ProfileRole::Unrecognized(_) => Self::Customer,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_for_every_known_role() {
        let cases = [
            ("admin", DashboardView::Admin),
            ("her_host", DashboardView::Host),
            ("her_supplier", DashboardView::Host),
            ("her_customer", DashboardView::Customer),
            ("her_affiliate_partner", DashboardView::Customer),
        ];
        for (raw, expected) in cases {
            assert_eq!(ProfileRole::parse(raw).dashboard(), expected, "role {raw}");
        }
    }

    #[test]
    fn test_unrecognized_roles_fall_back_to_customer() {
        for raw in ["", "moderator", "ADMIN", "her_host ", "super_admin"] {
            let role = ProfileRole::parse(raw);
            assert_eq!(role, ProfileRole::Unrecognized(raw.to_owned()));
            assert_eq!(role.dashboard(), DashboardView::Customer);
        }
    }

    #[test]
    fn test_profile_role_deserialization() {
        let known: ProfileRole = serde_json::from_str("\"her_supplier\"").unwrap();
        assert_eq!(known, ProfileRole::Known(UserRole::Supplier));

        let unknown: ProfileRole = serde_json::from_str("\"her_reseller\"").unwrap();
        assert_eq!(unknown, ProfileRole::Unrecognized("her_reseller".to_owned()));
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"her_reseller\"");
    }

    #[test]
    fn test_user_role_wire_names() {
        for role in UserRole::ALL {
            assert_eq!(serde_json::to_string(&role).unwrap(), format!("\"{role}\""));
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
    }
}

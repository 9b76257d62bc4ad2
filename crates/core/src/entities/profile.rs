//! Profile records (`profiles`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Identity;
use crate::types::{IdentityId, ProfileId, ProfileRole, UserRole};

/// A marketplace profile, one per identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    /// Identity this profile belongs to.
    pub user_id: IdentityId,
    pub email: String,
    pub full_name: String,
    pub role: ProfileRole,
    /// Unset until an admin approves a non-customer role.
    #[serde(default)]
    pub is_approved: Option<bool>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub referred_by_code: Option<String>,
    #[serde(default)]
    pub affiliate_code: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub store_slug: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Whether an admin has approved this profile.
    #[must_use]
    pub fn approved(&self) -> bool {
        self.is_approved.unwrap_or(false)
    }

    /// Whether this profile is waiting on admin approval.
    ///
    /// Customers never need approval; every other role (including roles this
    /// build does not recognise) does until `is_approved` is set.
    #[must_use]
    pub fn awaiting_approval(&self) -> bool {
        !self.approved() && !self.role.is_customer()
    }

    /// Name shown for a host on product pages.
    #[must_use]
    pub fn storefront_name(&self) -> &str {
        self.store_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.full_name)
    }

    /// First character of the display name, for avatars.
    #[must_use]
    pub fn initial(&self) -> String {
        self.full_name.chars().next().map(String::from).unwrap_or_default()
    }
}

/// Insert payload used when bootstrapping a profile on first sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    pub user_id: IdentityId,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

impl NewProfile {
    /// Default customer profile for a first-time identity.
    #[must_use]
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            user_id: identity.id,
            email: identity.email_or_empty(),
            full_name: identity.default_full_name(),
            role: UserRole::Customer,
        }
    }
}

/// Fields a user may change on their own profile.
///
/// Role and approval are absent; they change only through admin flows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Drop blank fields so an empty form input does not erase a value.
    #[must_use]
    pub fn without_blanks(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        }

        Self {
            full_name: keep(self.full_name),
            phone: keep(self.phone),
            address: keep(self.address),
            city: keep(self.city),
            store_name: keep(self.store_name),
            store_slug: keep(self.store_slug),
            avatar_url: keep(self.avatar_url),
        }
    }

    /// Whether the update carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(role: &str, is_approved: Option<bool>) -> Profile {
        serde_json::from_value(serde_json::json!({
            "id": ProfileId::random(),
            "user_id": IdentityId::random(),
            "email": "someone@example.pk",
            "full_name": "Someone",
            "role": role,
            "is_approved": is_approved,
        }))
        .unwrap()
    }

    #[test]
    fn test_deserializes_minimal_row() {
        let profile = row("her_host", None);
        assert_eq!(profile.role, ProfileRole::Known(UserRole::Host));
        assert!(profile.referral_code.is_none());
        assert!(!profile.approved());
    }

    #[test]
    fn test_awaiting_approval() {
        assert!(row("her_host", None).awaiting_approval());
        assert!(row("her_supplier", Some(false)).awaiting_approval());
        assert!(row("something_new", None).awaiting_approval());
        assert!(!row("her_host", Some(true)).awaiting_approval());
        assert!(!row("her_customer", None).awaiting_approval());
    }

    #[test]
    fn test_storefront_name_falls_back_to_full_name() {
        let mut profile = row("her_host", Some(true));
        assert_eq!(profile.storefront_name(), "Someone");
        profile.store_name = Some("Zara's Closet".to_owned());
        assert_eq!(profile.storefront_name(), "Zara's Closet");
    }

    #[test]
    fn test_new_profile_serializes_customer_role() {
        let identity = Identity {
            id: IdentityId::random(),
            email: Some("sana.malik@example.pk".parse().unwrap()),
            display_name: None,
        };
        let new = NewProfile::for_identity(&identity);
        assert_eq!(new.full_name, "sana.malik");
        assert_eq!(new.role, UserRole::Customer);

        let json = serde_json::to_value(&new).unwrap();
        assert_eq!(json["role"], "her_customer");
        assert_eq!(json["email"], "sana.malik@example.pk");
        assert!(json.get("is_approved").is_none());
    }

    #[test]
    fn test_profile_update_skips_blank_fields() {
        let update = ProfileUpdate {
            full_name: Some("  Hina  ".to_owned()),
            city: Some(String::new()),
            ..ProfileUpdate::default()
        }
        .without_blanks();
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "full_name": "Hina" }));
        assert!(ProfileUpdate::default().without_blanks().is_empty());
    }
}

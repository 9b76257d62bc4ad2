//! Authenticated identity as issued by the auth provider.

use serde::{Deserialize, Serialize};

use crate::types::{Email, IdentityId};

/// A signed-in identity.
///
/// Distinct from [`Profile`](crate::Profile): the identity is what the auth
/// provider vouches for, the profile is the marketplace record linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Auth provider user ID.
    pub id: IdentityId,
    /// Verified email, when the provider shares one.
    pub email: Option<Email>,
    /// Display name from the OAuth provider (`user_metadata.full_name`).
    pub display_name: Option<String>,
}

impl Identity {
    /// Name used for a freshly created profile.
    ///
    /// Prefers the provider display name, then the email local part, then
    /// the empty string.
    #[must_use]
    pub fn default_full_name(&self) -> String {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.email.as_ref().map(Email::local_part))
            .unwrap_or_default()
            .to_owned()
    }

    /// Email as stored on the profile (empty when the provider shares none).
    #[must_use]
    pub fn email_or_empty(&self) -> String {
        self.email
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

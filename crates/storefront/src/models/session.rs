//! Session-related types.
//!
//! Types stored in the session for authentication state.

use herhouse_core::Identity;
use serde::{Deserialize, Serialize};

use crate::backend::AuthTokens;

/// The signed-in user's session context.
///
/// Created at sign-in and dropped at sign-out. `generation` identifies the
/// sign-in it belongs to: any result computed for an older generation is
/// discarded instead of rendered or cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Identity the auth provider vouched for.
    pub identity: Identity,
    /// Tokens used for user-scoped backend calls.
    pub tokens: AuthTokens,
    /// Sign-in generation this context was created in.
    pub generation: u64,
}

impl SessionContext {
    /// Access token for backend calls.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the signed-in user's [`SessionContext`](super::SessionContext).
    pub const SESSION_CONTEXT: &str = "session_context";

    /// Key for the sign-in generation counter. Survives sign-out.
    pub const GENERATION: &str = "session_generation";

    /// Key for the PKCE verifier of an in-flight sign-in.
    pub const PKCE_VERIFIER: &str = "pkce_verifier";

    /// Key for the OAuth state (CSRF protection).
    pub const OAUTH_STATE: &str = "oauth_state";

    /// Key for pending flash notifications.
    pub const FLASH: &str = "flash";
}

//! Authentication extractors and session lifecycle.
//!
//! The signed-in user's [`SessionContext`] lives in the session. Extractors
//! refresh an expired access token on the way in; a failed refresh ends the
//! session and the request continues signed out.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use herhouse_core::{Email, Identity};
use tower_sessions::Session;

use crate::backend::AuthTokens;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{SessionContext, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, redirects to the sign-in flow.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(ctx): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", ctx.identity.default_full_name())
/// }
/// ```
pub struct RequireAuth(pub SessionContext);

/// Error returned when authentication is required but nobody is signed in.
pub enum AuthRejection {
    /// Redirect to sign-in (for HTML requests).
    RedirectToLogin,
    /// No session layer installed.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        current_session(state, session)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the signed-in user's context.
///
/// Unlike `RequireAuth`, this does not reject the request when signed out.
pub struct OptionalAuth(pub Option<SessionContext>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = match parts.extensions.get::<Session>() {
            Some(session) => current_session(state, session).await,
            None => None,
        };

        Ok(Self(context))
    }
}

/// Load the session context, refreshing an expired access token.
async fn current_session(state: &AppState, session: &Session) -> Option<SessionContext> {
    let mut context: SessionContext = session
        .get(session_keys::SESSION_CONTEXT)
        .await
        .ok()
        .flatten()?;

    if !context.tokens.is_expired() {
        return Some(context);
    }

    match state.auth().refresh(&context.tokens.refresh_token).await {
        Ok(refreshed) => {
            context.tokens = refreshed.tokens;
            if let Err(e) = session
                .insert(session_keys::SESSION_CONTEXT, &context)
                .await
            {
                tracing::error!("Failed to store refreshed tokens: {e}");
            }
            tracing::debug!("Access token refreshed");
            Some(context)
        }
        Err(e) => {
            tracing::warn!("Token refresh failed, signing out: {e}");
            if let Err(e) = end_session(session).await {
                tracing::error!("Failed to clear session after refresh failure: {e}");
            }
            None
        }
    }
}

/// Current sign-in generation (0 before the first sign-in).
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn current_generation(session: &Session) -> Result<u64, tower_sessions::session::Error> {
    Ok(session
        .get::<u64>(session_keys::GENERATION)
        .await?
        .unwrap_or_default())
}

/// Bump and return the sign-in generation.
async fn next_generation(session: &Session) -> Result<u64, tower_sessions::session::Error> {
    let generation = current_generation(session).await?.wrapping_add(1);
    session.insert(session_keys::GENERATION, generation).await?;
    Ok(generation)
}

/// Whether `context` still belongs to the session's current sign-in.
///
/// A session that cannot be read counts as changed.
pub async fn is_current(session: &Session, context: &SessionContext) -> bool {
    current_generation(session)
        .await
        .is_ok_and(|generation| generation == context.generation)
}

/// Start a new sign-in generation for `identity`.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn begin_session(
    session: &Session,
    identity: Identity,
    tokens: AuthTokens,
) -> Result<SessionContext, tower_sessions::session::Error> {
    // New session ID on sign-in (session fixation)
    session.cycle_id().await?;
    let generation = next_generation(session).await?;
    let context = SessionContext {
        identity,
        tokens,
        generation,
    };
    session
        .insert(session_keys::SESSION_CONTEXT, &context)
        .await?;

    set_sentry_user(
        &context.identity.id,
        context.identity.email.as_ref().map(Email::as_str),
    );
    Ok(context)
}

/// End the current sign-in, returning the context that was active.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn end_session(
    session: &Session,
) -> Result<Option<SessionContext>, tower_sessions::session::Error> {
    let context = session
        .remove::<SessionContext>(session_keys::SESSION_CONTEXT)
        .await?;
    next_generation(session).await?;
    clear_sentry_user();
    Ok(context)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use herhouse_core::IdentityId;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn identity() -> Identity {
        Identity {
            id: IdentityId::random(),
            email: Some("mehwish@example.pk".parse().unwrap()),
            display_name: Some("Mehwish".to_string()),
        }
    }

    fn tokens() -> AuthTokens {
        AuthTokens {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: Some(3600),
            obtained_at: chrono::Utc::now().timestamp(),
        }
    }

    #[tokio::test]
    async fn test_sign_in_and_out_bump_generation() {
        let session = session();
        assert_eq!(current_generation(&session).await.unwrap(), 0);

        let first = begin_session(&session, identity(), tokens()).await.unwrap();
        assert_eq!(first.generation, 1);
        assert!(is_current(&session, &first).await);

        let ended = end_session(&session).await.unwrap();
        assert_eq!(ended.as_ref(), Some(&first));
        assert!(!is_current(&session, &first).await);

        let second = begin_session(&session, identity(), tokens()).await.unwrap();
        assert_eq!(second.generation, 3);
        assert!(!is_current(&session, &first).await);
        assert!(is_current(&session, &second).await);
    }

    #[tokio::test]
    async fn test_end_session_without_sign_in() {
        let session = session();
        assert!(end_session(&session).await.unwrap().is_none());
        assert_eq!(current_generation(&session).await.unwrap(), 1);
    }
}

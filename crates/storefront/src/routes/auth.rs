//! Authentication route handlers.
//!
//! Sign-in is delegated to the backend's OAuth flow using PKCE. The verifier
//! and a CSRF state value are kept in the session between `/auth/login` and
//! `/auth/callback`.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::Url;

use crate::backend::{AuthError, Pkce, generate_random_string};
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::{OptionalAuth, begin_session, end_session};
use crate::models::{Flash, SessionContext, push_flash, session_keys};
use crate::state::AppState;

/// Length of the CSRF state value.
const STATE_LENGTH: usize = 32;

/// Query parameters the auth provider sends back.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Login
// =============================================================================

/// Start sign-in with the configured OAuth provider.
///
/// # Route
///
/// `GET /auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(context): OptionalAuth,
) -> Result<Response, AppError> {
    if context.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let pkce = Pkce::generate();
    let csrf_state = generate_random_string(STATE_LENGTH);

    session
        .insert(session_keys::PKCE_VERIFIER, &pkce.verifier)
        .await?;
    session
        .insert(session_keys::OAUTH_STATE, &csrf_state)
        .await?;

    let mut redirect_to = Url::parse(&state.config().callback_url()).map_err(AuthError::from)?;
    redirect_to
        .query_pairs_mut()
        .append_pair("state", &csrf_state);

    let url = state.auth().authorize_url(
        &state.config().oauth_provider,
        redirect_to.as_str(),
        &pkce,
    )?;

    Ok(Redirect::to(url.as_str()).into_response())
}

// =============================================================================
// Callback
// =============================================================================

/// Finish sign-in and start a new session generation.
///
/// # Route
///
/// `GET /auth/callback`
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match complete_sign_in(&state, &session, query).await {
        Ok(context) => {
            tracing::info!(user_id = %context.identity.id, "Signed in");
            add_breadcrumb("auth", "Signed in", None);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in failed");
            push_flash(&session, Flash::error("Sign-in Error", sign_in_message(&e))).await;
        }
    }

    Redirect::to("/").into_response()
}

async fn complete_sign_in(
    state: &AppState,
    session: &Session,
    query: CallbackQuery,
) -> Result<SessionContext, AppError> {
    // One-shot: a replayed callback finds nothing to match against
    let expected: Option<String> = session.remove(session_keys::OAUTH_STATE).await?;
    let verifier: Option<String> = session.remove(session_keys::PKCE_VERIFIER).await?;

    if let Some(error) = query.error {
        return Err(AuthError::Rejected {
            status: 400,
            message: query.error_description.unwrap_or(error),
        }
        .into());
    }

    if expected.is_none() || expected != query.state {
        return Err(AuthError::InvalidState.into());
    }
    let verifier = verifier.ok_or(AuthError::MissingVerifier)?;
    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    let signed_in = state.auth().exchange_code(&code, &verifier).await?;
    Ok(begin_session(session, signed_in.identity, signed_in.tokens).await?)
}

/// User-facing description of a failed sign-in.
fn sign_in_message(error: &AppError) -> &'static str {
    match error {
        AppError::Auth(AuthError::InvalidState | AuthError::MissingVerifier) => {
            "Your sign-in expired, please try again"
        }
        AppError::Auth(AuthError::Rejected { .. }) => "Sign-in was not completed",
        _ => "An unexpected error occurred",
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out.
///
/// Revokes the session at the auth provider (best effort), then ends the
/// local sign-in so in-flight work for it is discarded.
///
/// # Route
///
/// `POST /auth/logout`
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(context): OptionalAuth,
) -> Response {
    if let Some(context) = context
        && let Err(e) = state.auth().logout(context.access_token()).await
    {
        tracing::warn!("Failed to revoke session at auth provider: {e}");
    }

    match end_session(&session).await {
        Ok(Some(context)) => {
            tracing::info!(user_id = %context.identity.id, "Signed out");
            add_breadcrumb("auth", "Signed out", None);
        }
        Ok(None) => {}
        Err(e) => tracing::error!("Failed to clear session: {e}"),
    }

    Redirect::to("/").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_messages() {
        assert_eq!(
            sign_in_message(&AuthError::InvalidState.into()),
            "Your sign-in expired, please try again"
        );
        assert_eq!(
            sign_in_message(&AuthError::MissingVerifier.into()),
            "Your sign-in expired, please try again"
        );
        assert_eq!(
            sign_in_message(
                &AuthError::Rejected {
                    status: 400,
                    message: "access_denied".to_string(),
                }
                .into()
            ),
            "Sign-in was not completed"
        );
        assert_eq!(
            sign_in_message(&AppError::BadRequest("missing code".to_string())),
            "An unexpected error occurred"
        );
    }
}

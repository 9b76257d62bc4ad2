//! Profile route handlers.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use herhouse_core::{Profile, ProfileUpdate};
use tower_sessions::Session;
use tracing::instrument;

use crate::middleware::{RequireAuth, is_current};
use crate::models::{Flash, SessionContext, push_flash};
use crate::services::{
    BackendProfiles, ProfileError, ProfileResolution, resolve_profile, update_profile,
};
use crate::state::AppState;

/// Resolve the signed-in user's profile, creating it on first use.
///
/// # Errors
///
/// Returns an error if the profile can be neither fetched nor created.
pub async fn signed_in_profile(
    state: &AppState,
    context: &SessionContext,
) -> Result<Option<Profile>, ProfileError> {
    let store = BackendProfiles::new(state.backend(), context.access_token());
    Ok(match resolve_profile(&store, Some(&context.identity)).await? {
        ProfileResolution::Resolved(profile) => Some(profile),
        ProfileResolution::Unauthenticated => None,
    })
}

/// Update the signed-in user's own profile.
///
/// # Route
///
/// `POST /profile`
#[instrument(skip_all, fields(user_id = %context.identity.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(context): RequireAuth,
    Form(changes): Form<ProfileUpdate>,
) -> Response {
    let profile = match signed_in_profile(&state, &context).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return Redirect::to("/").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load profile for update");
            push_flash(&session, e.flash()).await;
            return Redirect::to("/").into_response();
        }
    };

    let store = BackendProfiles::new(state.backend(), context.access_token());
    let result = update_profile(&store, profile, changes).await;

    // Signed out (or in as someone else) while the update was in flight
    if !is_current(&session, &context).await {
        return Redirect::to("/").into_response();
    }

    match result {
        Ok(_) => {
            push_flash(
                &session,
                Flash::success("Profile Updated", "Your profile has been updated successfully"),
            )
            .await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update profile");
            push_flash(&session, e.flash()).await;
        }
    }

    Redirect::to("/").into_response()
}

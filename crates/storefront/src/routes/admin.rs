//! Admin moderation route handlers.
//!
//! Each action is applied to the backend first; the admin's rendered
//! dashboard is patched only once the backend acknowledges it.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use herhouse_core::{ProductId, ProductStatus, Profile, ProfileId, ProfileRole, UserRole};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::BackendError;
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::{RequireAuth, is_current};
use crate::models::{Flash, SessionContext, push_flash};
use crate::routes::profile::signed_in_profile;
use crate::services::SnapshotKey;
use crate::state::AppState;

/// Resolve the signed-in admin.
async fn require_admin(state: &AppState, context: &SessionContext) -> Result<Profile, AppError> {
    let profile = signed_in_profile(state, context)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::Unauthorized("sign in required".to_string()))?;

    if profile.role == ProfileRole::Known(UserRole::Admin) {
        Ok(profile)
    } else {
        tracing::warn!(profile_id = %profile.id, "Non-admin attempted moderation");
        Err(AppError::Forbidden("admin only".to_string()))
    }
}

/// Flash the outcome of a moderation action and return to the dashboard.
async fn finish(
    session: &Session,
    context: &SessionContext,
    result: Result<(), BackendError>,
    success: Flash,
    failure: &str,
) -> Response {
    // Signed out while the action was in flight: nothing to report
    if !is_current(session, context).await {
        return Redirect::to("/").into_response();
    }

    match result {
        Ok(()) => push_flash(session, success).await,
        Err(e) => {
            tracing::error!(error = %e, "{failure}");
            push_flash(session, Flash::error("Error", failure)).await;
        }
    }
    Redirect::to("/").into_response()
}

/// Approve a profile.
///
/// # Route
///
/// `POST /admin/profiles/{id}/approve`
#[instrument(skip(state, session, context))]
pub async fn approve_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(context): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let admin = require_admin(&state, &context).await?;
    let id: ProfileId = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid profile id: {id}")))?;

    let key: SnapshotKey = (admin.id, context.generation);
    let result = state
        .dashboards()
        .approve_profile(key, id, context.access_token())
        .await;

    if result.is_ok() {
        add_breadcrumb(
            "admin",
            "Approved profile",
            Some(&[("profile_id", id.to_string().as_str())]),
        );
    }

    Ok(finish(
        &session,
        &context,
        result,
        Flash::success("Approved", "Profile has been approved successfully"),
        "Failed to approve profile",
    )
    .await)
}

/// Approve a product.
///
/// # Route
///
/// `POST /admin/products/{id}/approve`
#[instrument(skip(state, session, context))]
pub async fn approve_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(context): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    moderate_product(
        &state,
        &session,
        &context,
        &id,
        ProductStatus::Approved,
        Flash::success("Approved", "Product has been approved successfully"),
        "Failed to approve product",
    )
    .await
}

/// Reject a product.
///
/// # Route
///
/// `POST /admin/products/{id}/reject`
#[instrument(skip(state, session, context))]
pub async fn reject_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(context): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    moderate_product(
        &state,
        &session,
        &context,
        &id,
        ProductStatus::Rejected,
        Flash::success("Rejected", "Product has been rejected"),
        "Failed to reject product",
    )
    .await
}

async fn moderate_product(
    state: &AppState,
    session: &Session,
    context: &SessionContext,
    id: &str,
    status: ProductStatus,
    success: Flash,
    failure: &str,
) -> Result<Response, AppError> {
    let admin = require_admin(state, context).await?;
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid product id: {id}")))?;

    let key: SnapshotKey = (admin.id, context.generation);
    let result = state
        .dashboards()
        .set_product_status(key, id, status, context.access_token())
        .await;

    if result.is_ok() {
        add_breadcrumb(
            "admin",
            "Moderated product",
            Some(&[
                ("product_id", id.to_string().as_str()),
                ("status", status.as_str()),
            ]),
        );
    }

    Ok(finish(session, context, result, success, failure).await)
}

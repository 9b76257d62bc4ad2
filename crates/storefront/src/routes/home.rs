//! Home page route handler.
//!
//! `/` is the role router's render target: the marketing page when signed
//! out, the role dashboard once the profile is resolved.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{OptionalAuth, is_current};
use crate::models::SessionContext;
use crate::routes::{PageChrome, dashboard};
use crate::services::{
    BackendProfiles, ProfileResolution, RouterEvent, RouterState, resolve_profile,
};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// One step of the "How HerHouse Works" section.
pub struct Step {
    pub title: &'static str,
    pub body: &'static str,
}

const STEPS: [Step; 3] = [
    Step {
        title: "Discover",
        body: "Browse curated fashion from verified HerHosts across Pakistan.",
    },
    Step {
        title: "Shop or Sell",
        body: "Buy for yourself, or open a storefront and sell to your own circle.",
    },
    Step {
        title: "Earn Rewards",
        body: "Invite friends with your referral code and earn on every sign-up.",
    },
];

/// Signed-out home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: PageChrome,
    pub steps: &'static [Step],
}

/// Shown while a signed-in visitor has no profile yet.
#[derive(Template, WebTemplate)]
#[template(path = "awaiting_profile.html")]
pub struct AwaitingProfileTemplate {
    pub chrome: PageChrome,
}

/// Shown while identity or profile are still resolving.
#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub chrome: PageChrome,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the home page or the visitor's dashboard.
#[instrument(skip(state, session, context))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(context): OptionalAuth,
) -> Response {
    let mut chrome = PageChrome::load(&session, context.is_some()).await;
    let router = RouterState::default()
        .apply(RouterEvent::IdentityResolved(context.as_ref().map(|c| c.identity.clone())));

    let (router, context) = match (router, context) {
        (router @ RouterState::LoadingProfile(_), Some(context)) => {
            let event = profile_event(&state, &context, &mut chrome).await;
            // The visitor signed out or in again while the profile loaded
            if !is_current(&session, &context).await {
                return Redirect::to("/").into_response();
            }
            (router.apply(event), Some(context))
        }
        (router, context) => (router, context),
    };

    match (router, context) {
        (RouterState::Routed { profile, view }, Some(context)) => {
            dashboard::render(&state, &session, &context, chrome, &profile, view).await
        }
        (RouterState::AwaitingProfile(_), _) => AwaitingProfileTemplate { chrome }.into_response(),
        (router, _) if router.is_loading() => LoadingTemplate { chrome }.into_response(),
        _ => HomeTemplate {
            chrome,
            steps: &STEPS,
        }
        .into_response(),
    }
}

/// Resolve the signed-in visitor's profile into a router event.
async fn profile_event(
    state: &AppState,
    context: &SessionContext,
    chrome: &mut PageChrome,
) -> RouterEvent {
    let store = BackendProfiles::new(state.backend(), context.access_token());
    match resolve_profile(&store, Some(&context.identity)).await {
        Ok(ProfileResolution::Resolved(profile)) => RouterEvent::ProfileResolved(profile),
        Ok(ProfileResolution::Unauthenticated) => RouterEvent::ProfileMissing,
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve profile");
            chrome.push(e.flash());
            RouterEvent::ProfileFailed
        }
    }
}

//! Role router.
//!
//! Decides what the root page shows: a loading indicator while identity and
//! profile are being resolved, the signed-out home page, a "setting up your
//! profile" notice, or the dashboard for the profile's role.
//!
//! ```text
//! LoadingIdentity --IdentityResolved(None)--> Unauthenticated
//! LoadingIdentity --IdentityResolved(Some)--> LoadingProfile
//! LoadingProfile  --ProfileResolved-------->  Routed(view)
//! LoadingProfile  --ProfileMissing|Failed-->  AwaitingProfile
//! any             --SignedIn|SignedOut----->  LoadingIdentity
//! ```

use herhouse_core::{DashboardView, Identity, Profile};

/// Where the root page currently stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RouterState {
    /// Waiting for the auth provider to report the session identity.
    #[default]
    LoadingIdentity,
    /// Identity known, profile lookup in flight.
    LoadingProfile(Identity),
    /// Nobody signed in.
    Unauthenticated,
    /// Signed in, but no profile is available yet.
    AwaitingProfile(Identity),
    /// Profile resolved and routed to its dashboard.
    Routed { profile: Profile, view: DashboardView },
}

/// Inputs that move the router between states.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    IdentityResolved(Option<Identity>),
    ProfileMissing,
    ProfileResolved(Profile),
    ProfileFailed,
    SignedIn,
    SignedOut,
}

impl RouterState {
    /// Apply `event`. Events that make no sense in the current state leave it
    /// unchanged.
    #[must_use]
    pub fn apply(self, event: RouterEvent) -> Self {
        match (self, event) {
            (_, RouterEvent::SignedIn | RouterEvent::SignedOut) => Self::LoadingIdentity,
            (Self::LoadingIdentity, RouterEvent::IdentityResolved(None)) => Self::Unauthenticated,
            (Self::LoadingIdentity, RouterEvent::IdentityResolved(Some(identity))) => {
                Self::LoadingProfile(identity)
            }
            (Self::LoadingProfile(_), RouterEvent::ProfileResolved(profile)) => {
                let view = profile.role.dashboard();
                Self::Routed { profile, view }
            }
            (
                Self::LoadingProfile(identity),
                RouterEvent::ProfileMissing | RouterEvent::ProfileFailed,
            ) => Self::AwaitingProfile(identity),
            (state, _) => state,
        }
    }

    /// Whether the page is still waiting on identity or profile.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::LoadingIdentity | Self::LoadingProfile(_))
    }

    /// Dashboard to render, once routed.
    #[must_use]
    pub const fn view(&self) -> Option<DashboardView> {
        match self {
            Self::Routed { view, .. } => Some(*view),
            _ => None,
        }
    }
}

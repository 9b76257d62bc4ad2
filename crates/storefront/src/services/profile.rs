//! Profile bootstrap.
//!
//! Every signed-in identity owns exactly one profile. The first time an
//! identity shows up without one, a customer profile is created for it.

use std::future::Future;

use herhouse_core::{Identity, IdentityId, NewProfile, Profile, ProfileId, ProfileUpdate};
use thiserror::Error;
use tracing::instrument;

use crate::backend::{BackendClient, BackendError, TableQuery};
use crate::models::Flash;

const PROFILES: &str = "profiles";

/// Profile reads and writes needed by the bootstrap.
pub trait ProfileStore {
    /// Fetch the profile linked to an identity.
    fn fetch_by_identity(
        &self,
        user_id: IdentityId,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    /// Insert a new profile and return it as persisted.
    fn insert(
        &self,
        profile: &NewProfile,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    /// Patch a profile and return it as persisted.
    fn update(
        &self,
        id: ProfileId,
        changes: &ProfileUpdate,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;
}

/// [`ProfileStore`] over the backend, acting as the signed-in user.
pub struct BackendProfiles<'a> {
    backend: &'a BackendClient,
    token: &'a str,
}

impl<'a> BackendProfiles<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, token: &'a str) -> Self {
        Self { backend, token }
    }
}

impl ProfileStore for BackendProfiles<'_> {
    async fn fetch_by_identity(&self, user_id: IdentityId) -> Result<Profile, BackendError> {
        self.backend
            .select_single(
                &TableQuery::new(PROFILES).eq("user_id", user_id),
                Some(self.token),
            )
            .await
    }

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
        self.backend.insert(PROFILES, profile, Some(self.token)).await
    }

    async fn update(&self, id: ProfileId, changes: &ProfileUpdate) -> Result<Profile, BackendError> {
        self.backend
            .update(PROFILES, id, changes, Some(self.token))
            .await
    }
}

/// Outcome of resolving the current visitor's profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileResolution {
    /// Nobody is signed in. Not an error.
    Unauthenticated,
    /// The signed-in identity's profile, existing or freshly created.
    Resolved(Profile),
}

/// Profile bootstrap and update failures.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to fetch profile: {0}")]
    Fetch(#[source] BackendError),

    #[error("failed to create profile: {0}")]
    Create(#[source] BackendError),

    #[error("failed to update profile: {0}")]
    Update(#[source] BackendError),
}

impl ProfileError {
    /// Notification shown to the user. The failure is retryable by reloading.
    #[must_use]
    pub fn flash(&self) -> Flash {
        match self {
            Self::Fetch(BackendError::Http(_) | BackendError::Parse(_)) => {
                Flash::error("Profile Error", "An unexpected error occurred")
            }
            Self::Fetch(_) => Flash::error("Profile Error", "Failed to fetch user profile"),
            Self::Create(_) => Flash::error("Profile Error", "Failed to create user profile"),
            Self::Update(_) => Flash::error("Update Error", "Failed to update profile"),
        }
    }
}

/// Find or create the profile for `identity`.
///
/// A missing profile is created with the customer role. If that insert loses
/// a race with a concurrent bootstrap for the same identity, the winner's row
/// is fetched and returned instead.
///
/// # Errors
///
/// Returns an error if the profile can be neither fetched nor created.
#[instrument(skip_all, fields(user_id = ?identity.map(|i| i.id)))]
pub async fn resolve_profile<S>(
    store: &S,
    identity: Option<&Identity>,
) -> Result<ProfileResolution, ProfileError>
where
    S: ProfileStore + Sync,
{
    let Some(identity) = identity else {
        return Ok(ProfileResolution::Unauthenticated);
    };

    match store.fetch_by_identity(identity.id).await {
        Ok(profile) => return Ok(ProfileResolution::Resolved(profile)),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(ProfileError::Fetch(e)),
    }

    tracing::info!("No profile for identity, creating customer profile");
    match store.insert(&NewProfile::for_identity(identity)).await {
        Ok(profile) => {
            tracing::info!(profile_id = %profile.id, "Profile created");
            Ok(ProfileResolution::Resolved(profile))
        }
        Err(e) if e.is_conflict() => {
            tracing::info!("Profile created concurrently, fetching existing row");
            store
                .fetch_by_identity(identity.id)
                .await
                .map(ProfileResolution::Resolved)
                .map_err(ProfileError::Fetch)
        }
        Err(e) => Err(ProfileError::Create(e)),
    }
}

/// Apply the user's own edits to `current`.
///
/// Blank fields are ignored; an update with nothing left returns `current`
/// without a backend call.
///
/// # Errors
///
/// Returns [`ProfileError::Update`] if the backend rejects the change.
#[instrument(skip_all, fields(profile_id = %current.id))]
pub async fn update_profile<S>(
    store: &S,
    current: Profile,
    changes: ProfileUpdate,
) -> Result<Profile, ProfileError>
where
    S: ProfileStore + Sync,
{
    let changes = changes.without_blanks();
    if changes.is_empty() {
        return Ok(current);
    }

    store
        .update(current.id, &changes)
        .await
        .map_err(ProfileError::Update)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use herhouse_core::{ProfileRole, UserRole};

    use super::*;

    /// In-memory store. `race` makes the first insert lose to a concurrent
    /// bootstrap that already wrote the row.
    #[derive(Default)]
    struct MemoryProfiles {
        rows: Mutex<Vec<Profile>>,
        inserts: AtomicUsize,
        race: bool,
        fail_insert: bool,
    }

    fn persisted(new: &NewProfile) -> Profile {
        serde_json::from_value(serde_json::json!({
            "id": ProfileId::random(),
            "user_id": new.user_id,
            "email": new.email,
            "full_name": new.full_name,
            "role": new.role,
        }))
        .unwrap()
    }

    impl ProfileStore for MemoryProfiles {
        async fn fetch_by_identity(&self, user_id: IdentityId) -> Result<Profile, BackendError> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.user_id == user_id)
                .cloned()
                .ok_or_else(|| BackendError::NotFound("profiles".to_string()))
        }

        async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_insert {
                return Err(BackendError::Api {
                    status: 500,
                    code: None,
                    message: "insert failed".to_string(),
                });
            }
            let row = persisted(profile);
            self.rows.lock().unwrap().push(row.clone());
            if self.race {
                return Err(BackendError::Conflict("profiles_user_id_key".to_string()));
            }
            Ok(row)
        }

        async fn update(
            &self,
            id: ProfileId,
            changes: &ProfileUpdate,
        ) -> Result<Profile, BackendError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| BackendError::NotFound("profiles".to_string()))?;
            if let Some(city) = &changes.city {
                row.city = Some(city.clone());
            }
            Ok(row.clone())
        }
    }

    fn identity() -> Identity {
        Identity {
            id: IdentityId::random(),
            email: Some("ayesha.khan@example.pk".parse().unwrap()),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn test_no_identity_is_unauthenticated() {
        let store = MemoryProfiles::default();
        let resolution = resolve_profile(&store, None).await.unwrap();
        assert_eq!(resolution, ProfileResolution::Unauthenticated);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_customer_profile() {
        let store = MemoryProfiles::default();
        let identity = identity();

        let ProfileResolution::Resolved(profile) =
            resolve_profile(&store, Some(&identity)).await.unwrap()
        else {
            panic!("expected a profile");
        };

        assert_eq!(profile.user_id, identity.id);
        assert_eq!(profile.full_name, "ayesha.khan");
        assert_eq!(profile.role, ProfileRole::Known(UserRole::Customer));
        assert_eq!(profile.is_approved, None);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let store = MemoryProfiles::default();
        let identity = identity();

        let first = resolve_profile(&store, Some(&identity)).await.unwrap();
        let second = resolve_profile(&store, Some(&identity)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_returns_existing_row() {
        let store = MemoryProfiles {
            race: true,
            ..Default::default()
        };
        let identity = identity();

        let resolution = resolve_profile(&store, Some(&identity)).await.unwrap();
        let ProfileResolution::Resolved(profile) = resolution else {
            panic!("expected a profile");
        };
        assert_eq!(profile.user_id, identity.id);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_failure_flashes_profile_error() {
        let store = MemoryProfiles {
            fail_insert: true,
            ..Default::default()
        };

        let err = resolve_profile(&store, Some(&identity())).await.unwrap_err();
        assert!(matches!(err, ProfileError::Create(_)));

        let flash = err.flash();
        assert_eq!(flash.title, "Profile Error");
        assert_eq!(flash.description, "Failed to create user profile");
    }

    #[tokio::test]
    async fn test_blank_update_skips_backend() {
        let store = MemoryProfiles::default();
        let ProfileResolution::Resolved(profile) =
            resolve_profile(&store, Some(&identity())).await.unwrap()
        else {
            panic!("expected a profile");
        };

        let unchanged = update_profile(
            &store,
            profile.clone(),
            ProfileUpdate {
                city: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(unchanged, profile);

        let updated = update_profile(
            &store,
            profile,
            ProfileUpdate {
                city: Some("Lahore".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.city.as_deref(), Some("Lahore"));
    }
}

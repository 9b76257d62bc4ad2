//! Business logic services for storefront.
//!
//! # Services
//!
//! - `profile` - Profile bootstrap and self-service updates
//! - `router` - Role router state machine for the root page
//! - `dashboard` - Per-role dashboard loading and admin moderation
//! - `catalog` - Approved product listing and product detail

pub mod catalog;
pub mod dashboard;
pub mod profile;
pub mod router;

pub use catalog::{CatalogService, ProductDetail};
pub use dashboard::{DashboardService, DashboardSnapshot, SnapshotKey};
pub use profile::{
    BackendProfiles, ProfileError, ProfileResolution, ProfileStore, resolve_profile,
    update_profile,
};
pub use router::{RouterEvent, RouterState};

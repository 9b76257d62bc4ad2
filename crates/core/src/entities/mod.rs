//! Entity records mirroring the hosted backend tables.
//!
//! Field names match the backend columns exactly so rows deserialize without
//! renames. Optional columns are `Option`; the backend is the only source of
//! truth and these values are read-derived copies.

pub mod identity;
pub mod order;
pub mod product;
pub mod profile;
pub mod referral;
pub mod reward;

pub use identity::Identity;
pub use order::{Order, OrderItem};
pub use product::Product;
pub use profile::{NewProfile, Profile, ProfileUpdate};
pub use referral::Referral;
pub use reward::{RewardClaim, RewardMilestone};

//! Session-backed models for the storefront.
//!
//! Marketplace records live in `herhouse-core`; this module holds what the
//! storefront keeps in the session between requests.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind, push_flash, take_flashes};
pub use session::{SessionContext, keys as session_keys};

//! HerHouse Core - Shared types and marketplace rules.
//!
//! This crate provides the types and pure business rules used by the
//! `storefront` binary and its integration tests:
//!
//! - Type-safe IDs, emails, money and closed status enums
//! - Entity records mirroring the hosted backend tables
//! - Role-to-dashboard mapping
//! - Pricing derivation (sale and bulk pricing)
//! - Product listing filter
//! - Dashboard aggregation and the entity cache used for post-write updates
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. The hosted backend owns every record; values here are transient
//! copies read from it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod catalog;
pub mod dashboard;
pub mod entities;
pub mod pricing;
pub mod types;

pub use cache::{EntityCache, Keyed};
pub use entities::*;
pub use types::*;

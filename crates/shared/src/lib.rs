//! GlowDesk Shared Types
//!
//! This crate contains the closed domain enumerations and ID wrappers shared
//! across the GlowDesk platform: plans, features, roles and per-plan quotas.

pub mod types;

pub use types::*;

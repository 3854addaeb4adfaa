//! Shard Types - Shared domain types
//!
//! This crate contains domain types used across the Shard VPN services:
//! - User identity
//! - Subscription durations, payment methods, notification thresholds
//! - Referral program types

pub mod referral;
pub mod subscription;
pub mod user;

pub use referral::*;
pub use subscription::*;
pub use user::*;

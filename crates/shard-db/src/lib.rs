//! Shard DB - Database abstractions
//!
//! SQLx-based storage layer for the Shard VPN services.
//!
//! # Example
//!
//! ```rust,ignore
//! use shard_db::{create_pool, Repositories};
//!
//! let pool = create_pool("postgres://localhost/shard").await?;
//! let repos = Repositories::new(pool);
//!
//! let subscriber = repos.subscribers.find(user_id).await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, DbPool};
pub use repo::*;

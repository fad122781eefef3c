//! Storage backends for the asset repository
//!
//! This module provides a trait-based abstraction over where assets,
//! reading history and alerts live.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` trait allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio actors
//! - **Atomic**: Every write method commits all of its effects or none
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database with WAL and migrations
//! - **In-Memory** (fallback): No persistence, for testing or ephemeral hubs
//!
//! ## Usage
//!
//! ```no_run
//! use aas_monitor::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./aas.db").await?;
//!     println!("{}", backend.get_stats().await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod retry;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use retry::{RetryPolicy, with_retry};
pub use schema::{IngestionCommit, ReadingQuery, RetentionOutcome, RetentionPolicy};

//! # shelf-store
//!
//! Star and note collections kept in a user's backing repository.
//!
//! This crate provides:
//! - `Shelf`: list, add, update and remove stars and notes
//! - `LocalCache`: per-user cache with a freshness window
//! - `Provisioner`: creates the repository and documents on first use
//! - `read_modify_write`: optimistic-concurrency editing of one document
//! - `MemoryStorage` / `FileStorage`: cache storages
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shelf_remote::{GitHubStore, TokenAuth};
//! use shelf_store::{FileStorage, Shelf, ShelfConfig};
//!
//! #[tokio::main]
//! async fn main() -> shelf_core::Result<()> {
//!     let auth = Arc::new(TokenAuth::from_env());
//!     let store = Arc::new(GitHubStore::from_env(auth.clone())?);
//!     let shelf = Shelf::new(
//!         store,
//!         auth,
//!         Arc::new(FileStorage::new(".shelf-cache")),
//!         ShelfConfig::from_env(),
//!     );
//!     for star in shelf.list_stars().await? {
//!         println!("{} {}", star.id, star.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cas;
pub mod config;
pub mod provision;
pub mod shelf;
pub mod stats;
pub mod storage;

pub use cache::{CachedCollection, LocalCache};
pub use cas::{read_collection, read_modify_write, Committed, Mutation, Snapshot};
pub use config::ShelfConfig;
pub use provision::Provisioner;
pub use shelf::{LinkOutcome, Shelf};
pub use stats::Stats;
pub use storage::{FileStorage, MemoryStorage};

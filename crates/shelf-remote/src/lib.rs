//! # shelf-remote
//!
//! Remote object repository clients for shelf.
//!
//! This crate provides:
//! - `GitHubStore`: the GitHub contents API as a compare-and-swap file store
//! - `MemoryStore`: an in-process store with the same contract
//! - `TokenAuth`: bearer-token authentication collaborator
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shelf_core::{RemoteStore, RepoRef};
//! use shelf_remote::{GitHubStore, TokenAuth};
//!
//! #[tokio::main]
//! async fn main() {
//!     let auth = Arc::new(TokenAuth::from_env());
//!     let store = GitHubStore::from_env(auth).unwrap();
//!     let repo = RepoRef::new("octocat", "shelf-data");
//!     let stars = store.read_file(&repo, "data/stars.json").await.unwrap();
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod memory;

pub use auth::TokenAuth;
pub use config::RemoteConfig;
pub use error::{to_shelf_error, RemoteErrorCode};
pub use github::GitHubStore;
pub use memory::{content_version, MemoryStore};

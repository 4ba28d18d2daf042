//! # shelf-core
//!
//! Core types, traits, and the document codec for shelf.
//!
//! shelf keeps two small JSON documents per user (starred items and notes)
//! in a version-controlled file host and edits them with optimistic
//! concurrency. This crate holds everything the storage layers share:
//! models, the error taxonomy, the codec, collaborator traits, defaults and
//! signed action links.

pub mod action_link;
pub mod codec;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use action_link::{generate_signature, verify_signature, ActionLink, LinkAction};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;

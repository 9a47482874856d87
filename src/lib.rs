//! Data-access layer and recommendation engine for browsing hash-typed keys
//! in Redis-compatible stores.
//!
//! The crate sits between an HTTP layer (not included) and the store's wire
//! protocol (owned by the [`client::ClientHandle`] collaborator). It turns
//! generic field-level CRUD requests into correctly-sequenced, feature-aware
//! command batches, drives cursor-based incremental scans with bounded result
//! sets, and evaluates heuristic recommendation rules over observed key
//! metadata.

pub mod client;
pub mod command;
pub mod error;
pub mod hash;
pub mod pattern;
pub mod recommendation;
pub mod scan;
pub mod value;

pub use client::{ClientFactory, ClientHandle, ClientIdentity, Feature};
pub use error::BrowserError;
pub use hash::HashBrowser;
pub use recommendation::{RecommendationService, RecommendationStore};

pub type Result<T> = std::result::Result<T, error::BrowserError>;

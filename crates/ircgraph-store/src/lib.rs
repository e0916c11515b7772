//! # ircgraph-store
//!
//! In-memory entity storage for the ircgraph bridge.
//!
//! The [`ContactRegistry`] holds servers, channels and users as sparse
//! contacts and owns the graph-wide invariants (unique identity digests,
//! acyclic parent links). The [`MessageRegistry`] keeps one message store per
//! owning contact. Both announce changes to observers through unbounded
//! `tokio::sync::mpsc` channels, so a UI task can follow the graph without
//! sharing it.

pub mod contacts;
pub mod messages;
pub mod models;

mod error;

pub use contacts::ContactRegistry;
pub use error::{Result, StoreError};
pub use messages::{MessageRegistry, MessageStore};
pub use models::*;

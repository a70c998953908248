//! Datastore abstraction for Drift
//!
//! Every entity kind lives in its own logical collection and is addressed by
//! its identity. Backends implement the small [`Datastore`] contract over
//! plain JSON-equivalent records; [`Store`] layers typed, settle-aware access
//! for anything implementing [`Entity`].
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryDatastore`] for tests and single-process runs
//! - [`YamlDatastore`] persisting one YAML document per record

pub mod datastore;
pub mod entity;
pub mod error;
pub mod filter;
pub mod memory;
pub mod store;
pub mod yaml;

pub use datastore::Datastore;
pub use entity::Entity;
pub use error::{Error, Result};
pub use filter::{Filter, Op};
pub use memory::MemoryDatastore;
pub use store::Store;
pub use yaml::{encode_id, YamlDatastore};

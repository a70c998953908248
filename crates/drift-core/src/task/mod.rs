//! Tasks: load settled entities, execute, persist, derive retries
//!
//! Status only moves forward (`pending -> running -> success | error`). A
//! retriable failure with budget left derives a fresh task linked through
//! `previous_id`, so the attempt history is an append-only chain.

mod executor;
mod handlers;
pub mod payload;

use serde_json::Value;

use crate::model::{Repository, Task, Update};

pub use executor::TaskExecutor;
pub use handlers::{execute, load};
pub use payload::{AddRepository, ApplyUpdate, CheckUpdates};

/// A task's entities, resolved and settled.
#[derive(Debug)]
pub enum Loaded {
    AddRepository(Repository),
    CheckUpdates(Repository),
    ApplyUpdate(Box<Update>),
}

/// Result of a successful attempt.
#[derive(Debug)]
pub struct Outcome {
    pub result: Value,
    /// Tasks to enqueue once this one is stored
    pub follow_ups: Vec<Task>,
}

impl Outcome {
    pub fn done(result: Value) -> Self {
        Self {
            result,
            follow_ups: Vec::new(),
        }
    }
}

//! Persistence of committed drops.
//!
//! # Responsibility
//! - Turn a drag commit into the minimal set of store writes.
//! - Run those writes as one tracked, non-blocking save action.
//!
//! # Invariants
//! - Local state is never rolled back here; recovery is a re-fetch driven by
//!   the caller.

pub mod batch;
pub mod batcher;
pub mod tracker;

pub use batch::SaveBatch;
pub use batcher::{PersistenceBatcher, SaveError, SaveFailure, SaveReceipt};
pub use tracker::{SaveAction, SaveCounters, SaveStatus, SaveTracker};

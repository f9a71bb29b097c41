//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate the drag machine, working set and persistence into the
//!   reordering API consumed by UI layers.
//! - Keep UI layers decoupled from store details.

pub mod reorder_service;

pub use reorder_service::{DropResult, PendingSave, ReorderService, SaveOutcome};

//! Domain model for ordered container items.
//!
//! # Responsibility
//! - Define canonical data structures used by ordering and drag logic.
//! - Keep one flat item shape for tasks, notes, group headers and gaps.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - Group membership is a derived back-reference, never a nested tree.

pub mod item;

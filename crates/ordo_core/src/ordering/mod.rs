//! Pure ordering algorithms over flat item sequences.
//!
//! # Responsibility
//! - Assign dense ranks (`normalize`).
//! - Derive group ownership and rebuild collapsed sequences (`groups`).
//!
//! # Invariants
//! - Nothing here performs I/O or touches shared state.

pub mod groups;
pub mod normalize;

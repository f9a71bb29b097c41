//! Drag interaction: geometry, targeting, timers and the session machine.
//!
//! # Responsibility
//! - Resolve what a dragged row is over on every pointer move (`collision`).
//! - Track one drag gesture from grab to drop (`machine`).
//!
//! # Invariants
//! - All time comes from an injected [`clock::Clock`].

pub mod clock;
pub mod collision;
pub mod geometry;
pub mod machine;

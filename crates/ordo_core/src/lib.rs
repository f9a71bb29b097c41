//! Core engine for ordered, groupable container lists.
//! Ordering, grouping and drag invariants live here and nowhere else.

pub mod board;
pub mod config;
pub mod db;
pub mod drag;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod persist;
pub mod service;
pub mod store;

pub use board::Board;
pub use config::{ConfigError, EngineConfig};
pub use drag::clock::{Clock, ManualClock, SystemClock};
pub use drag::collision::{resolve_collision, ActiveDrag, Collision};
pub use drag::geometry::{DragPointer, Droppable, DroppableKind, Point, Rect};
pub use drag::machine::{
    Commit, DragError, DragMachine, DragOutcome, DragPhase, DragUpdate, PendingSwitch,
};
pub use logging::{
    default_log_level, init_default_logging, init_logging, logging_status, LogLevel,
    LoggingError,
};
pub use model::item::{ContainerId, Item, ItemId, ItemSnapshot, ItemType};
pub use persist::{
    PersistenceBatcher, SaveBatch, SaveError, SaveFailure, SaveReceipt, SaveStatus, SaveTracker,
};
pub use service::{DropResult, PendingSave, ReorderService, SaveOutcome};
pub use store::events::{TaskEvent, TaskEventBus};
pub use store::memory::{InMemoryTaskStore, StoreCall, StoreOp};
pub use store::sqlite::SqliteTaskStore;
pub use store::{ItemPatch, NewItem, OrderUpdate, StoreError, StoreResult, TaskStore};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

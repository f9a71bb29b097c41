//! Publish/subscribe hub for task-store change notifications.
//!
//! # Responsibility
//! - Fan out store-side changes to every live subscriber.
//!
//! # Invariants
//! - The bus is injected into stores; there is no process-global instance.
//! - Publishing never blocks and never fails; closed subscribers are pruned.

use super::{ItemPatch, OrderUpdate};
use crate::model::item::{Item, ItemId};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::sync::{Arc, Mutex, PoisonError};

/// Change notification emitted after a successful store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Created(Item),
    Updated { id: ItemId, patch: ItemPatch },
    OrderUpdated(Vec<OrderUpdate>),
}

/// Cloneable handle to one shared subscriber list.
#[derive(Debug, Clone, Default)]
pub struct TaskEventBus {
    subscribers: Arc<Mutex<Vec<UnboundedSender<TaskEvent>>>>,
}

impl TaskEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber stream.
    pub fn subscribe(&self) -> UnboundedReceiver<TaskEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    /// Sends `event` to every live subscriber.
    pub fn publish(&self, event: TaskEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| sender.unbounded_send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

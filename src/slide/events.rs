//! Entity add/remove notifications that may arrive from other threads.
//!
//! Hosts push events through an [`EntityNotifier`]; the corrector drains the
//! queue at the start of every tick, so the tracked set never changes while
//! a tick is iterating it.

use crossbeam_channel::{Receiver, Sender};

use super::tracker::{EntityId, EntityInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEvent {
    Added(EntityInfo),
    Removed(EntityId),
}

/// Cloneable sending side handed to the host.
#[derive(Debug, Clone)]
pub struct EntityNotifier {
    tx: Sender<EntityEvent>,
}

impl EntityNotifier {
    pub fn added(&self, entity: EntityInfo) {
        // A disconnected receiver means the corrector is gone; nothing to do.
        let _ = self.tx.send(EntityEvent::Added(entity));
    }

    pub fn removed(&self, id: EntityId) {
        let _ = self.tx.send(EntityEvent::Removed(id));
    }
}

/// Receiving side owned by the corrector.
///
/// Closing drops the receiver, which disconnects every outstanding
/// [`EntityNotifier`]; later sends fail and are discarded by the notifier.
#[derive(Debug)]
pub(crate) struct EntityQueue {
    tx: Sender<EntityEvent>,
    rx: Option<Receiver<EntityEvent>>,
}

impl EntityQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx: Some(rx) }
    }

    pub(crate) fn close(&mut self) {
        self.rx = None;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    /// Events waiting for the next drain.
    pub(crate) fn pending(&self) -> usize {
        self.rx.as_ref().map(|rx| rx.len()).unwrap_or(0)
    }

    pub(crate) fn notifier(&self) -> EntityNotifier {
        EntityNotifier {
            tx: self.tx.clone(),
        }
    }

    /// Everything queued so far, in send order.
    pub(crate) fn drain(&self) -> Vec<EntityEvent> {
        match &self.rx {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }
}

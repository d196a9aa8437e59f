use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tubechat_types::{Channel, ConversationId};

use crate::events::{SessionEvent, SessionState};
use crate::reconciler::StreamHandle;
use crate::store::MessageStore;

const EVENT_CAPACITY: usize = 256;

/// Everything a session mutates. Guarded by one short-held mutex that is
/// never held across an await point.
#[derive(Default)]
pub(crate) struct Inner {
    pub state: SessionState,
    pub store: MessageStore,
    pub channel_id: Option<String>,
    pub channel: Option<Channel>,
    pub conversation_id: Option<ConversationId>,
    pub stream: Option<StreamHandle>,
    /// Bumped whenever a stream is opened or closed; a stream task only
    /// writes while its own generation is current.
    pub generation: u64,
}

impl Inner {
    /// Invalidate and abort the current stream, if any
    pub fn close_stream(&mut self) -> bool {
        self.generation += 1;
        match self.stream.take() {
            Some(handle) => {
                tracing::debug!(generation = handle.generation(), "Aborting message stream");
                handle.abort();
                true
            }
            None => false,
        }
    }
}

pub(crate) struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl Shared {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(SessionState::Uninitialized);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            state_tx,
            events_tx,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transition(&self, inner: &mut Inner, next: SessionState) {
        if inner.state == next {
            return;
        }
        tracing::info!(from = %inner.state, to = %next, "Session state change");
        inner.state = next;
        self.state_tx.send_replace(next);
    }

    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }
}

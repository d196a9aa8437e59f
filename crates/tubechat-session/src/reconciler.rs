use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tubechat_client::ConversationGateway;
use tubechat_types::{
    ConversationId, MessageRole, MessageStatus, WireMessage, WireStatus, PLACEHOLDER_ID,
};

use crate::error::StreamError;
use crate::events::{SessionEvent, SessionState};
use crate::shared::{Inner, Shared};
use crate::store::{MessageStore, Upserted};

/// Result of merging one streamed event into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub id: String,
    /// Status as displayed; unknown wire statuses show as `in_progress`
    pub status: MessageStatus,
    pub upserted: Upserted,
    /// Raw status string when it matched no known status
    pub unknown_status: Option<String>,
}

impl Applied {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Merges the events of one message stream into a [`MessageStore`].
///
/// Events without an id update the assistant message this stream wrote
/// last, starting with the placeholder.
#[derive(Debug, Clone)]
pub struct StreamReconciler {
    channel_id: String,
    last_assistant_id: String,
}

impl StreamReconciler {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            last_assistant_id: PLACEHOLDER_ID.to_string(),
        }
    }

    pub fn last_assistant_id(&self) -> &str {
        &self.last_assistant_id
    }

    /// Parse one `data` payload and upsert it.
    ///
    /// Undecodable payloads leave the store untouched and return
    /// [`StreamError::Protocol`].
    pub fn apply(
        &mut self,
        store: &mut MessageStore,
        payload: &str,
    ) -> Result<Applied, StreamError> {
        let wire = WireMessage::parse(payload)
            .map_err(|e| StreamError::protocol(format!("undecodable event: {}", e)))?;

        let has_timestamp = wire.created_at.is_some();
        let (mut message, wire_status) = wire.into_message(&self.channel_id, &self.last_assistant_id);

        // createdAt is fixed at creation
        if !has_timestamp {
            if let Some(existing) = store.upsert_target(&message.id) {
                message.created_at = existing.created_at;
            }
        }

        let unknown_status = match wire_status {
            WireStatus::Known(_) => None,
            WireStatus::Unknown(raw) => Some(raw),
        };
        let id = message.id.clone();
        let status = message.status;
        let role = message.role;

        let upserted = store.upsert(message);
        if role == MessageRole::Assistant {
            self.last_assistant_id = id.clone();
        }

        Ok(Applied {
            id,
            status,
            upserted,
            unknown_status,
        })
    }
}

/// Handle on a running stream task, held by the session
#[derive(Debug)]
pub struct StreamHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the task at its next suspension point. Writes it might still
    /// attempt are rejected by the session's generation check.
    pub fn abort(self) {
        self.task.abort();
    }
}

/// What a stream task needs to answer one submission
pub(crate) struct StreamRequest {
    pub channel_id: String,
    pub conversation_id: Option<ConversationId>,
    pub text: String,
}

/// Spawn the task consuming one message stream
pub(crate) fn open(
    gateway: Arc<dyn ConversationGateway>,
    shared: Arc<Shared>,
    generation: u64,
    request: StreamRequest,
) -> StreamHandle {
    let task = tokio::spawn(drive(gateway, shared, generation, request));
    StreamHandle { generation, task }
}

async fn drive(
    gateway: Arc<dyn ConversationGateway>,
    shared: Arc<Shared>,
    generation: u64,
    request: StreamRequest,
) {
    let mut reconciler = StreamReconciler::new(request.channel_id.clone());

    let conversation_id = match request.conversation_id {
        Some(id) => id,
        None => match gateway.create_conversation(&request.channel_id).await {
            Ok(id) => {
                if !record_conversation(&shared, generation, &id) {
                    return;
                }
                id
            }
            Err(e) => {
                let error = StreamError::transport(format!("failed to create conversation: {}", e));
                fail(&shared, generation, &reconciler, error);
                return;
            }
        },
    };

    let mut stream = match gateway
        .open_message_stream(&conversation_id, &request.text)
        .await
    {
        Ok(stream) => stream,
        Err(e) => {
            let error = StreamError::transport(format!("failed to open stream: {}", e));
            fail(&shared, generation, &reconciler, error);
            return;
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(payload) => {
                if handle_payload(&shared, generation, &mut reconciler, &payload) {
                    return;
                }
            }
            Err(e) => {
                fail(&shared, generation, &reconciler, StreamError::transport(e.to_string()));
                return;
            }
        }
    }

    fail(
        &shared,
        generation,
        &reconciler,
        StreamError::transport("stream ended before a terminal status"),
    );
}

/// Lock the session if `generation` is still the live stream
fn lock_current(shared: &Shared, generation: u64) -> Option<std::sync::MutexGuard<'_, Inner>> {
    let inner = shared.lock();
    if inner.generation == generation {
        Some(inner)
    } else {
        tracing::debug!(generation, "Ignoring stale stream");
        None
    }
}

fn record_conversation(shared: &Shared, generation: u64, id: &ConversationId) -> bool {
    let Some(mut inner) = lock_current(shared, generation) else {
        return false;
    };
    tracing::info!(conversation_id = %id, "Created conversation for first message");
    inner.conversation_id = Some(id.clone());
    true
}

/// Apply one payload; returns true once the stream should stop
pub(crate) fn handle_payload(
    shared: &Shared,
    generation: u64,
    reconciler: &mut StreamReconciler,
    payload: &str,
) -> bool {
    let Some(mut inner) = lock_current(shared, generation) else {
        return true;
    };

    match reconciler.apply(&mut inner.store, payload) {
        Ok(applied) => {
            tracing::debug!(id = %applied.id, status = %applied.status, "Stream event applied");
            if let Some(raw) = &applied.unknown_status {
                let error = StreamError::protocol(format!("unknown status: {}", raw));
                tracing::warn!(id = %applied.id, "{}", error);
                shared.emit(SessionEvent::ProtocolError {
                    detail: error.detail().to_string(),
                });
            }
            shared.emit(SessionEvent::MessagesChanged);

            if applied.is_terminal() {
                finish(shared, &mut inner, applied.status);
                return true;
            }
            false
        }
        Err(error) => {
            tracing::warn!("{}", error);
            shared.emit(SessionEvent::ProtocolError {
                detail: error.detail().to_string(),
            });
            false
        }
    }
}

/// Transport failure: the last assistant message this stream wrote is
/// marked failed and the submission ends.
pub(crate) fn fail(
    shared: &Shared,
    generation: u64,
    reconciler: &StreamReconciler,
    error: StreamError,
) {
    let Some(mut inner) = lock_current(shared, generation) else {
        return;
    };

    tracing::warn!(id = %reconciler.last_assistant_id(), "{}", error);
    if inner.store.mark_failed(reconciler.last_assistant_id()) {
        shared.emit(SessionEvent::MessagesChanged);
    }
    shared.emit(SessionEvent::TransportError {
        detail: error.detail().to_string(),
    });
    finish(shared, &mut inner, MessageStatus::Failed);
}

fn finish(shared: &Shared, inner: &mut Inner, status: MessageStatus) {
    // Detach our own handle; the task is about to return
    inner.stream = None;
    inner.generation += 1;
    shared.emit(SessionEvent::SendingEnded { status });
    if inner.state == SessionState::Sending {
        shared.transition(inner, SessionState::Ready);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubechat_types::{Message, WORKING_MARKER};

    fn pending_store() -> MessageStore {
        let mut store = MessageStore::new();
        store.append(Message::user("UC1", "hi"));
        store.append(Message::placeholder("UC1"));
        store
    }

    fn sending_shared() -> (Shared, u64) {
        let shared = Shared::new();
        let generation = {
            let mut inner = shared.lock();
            inner.store = pending_store();
            inner.channel_id = Some("UC1".to_string());
            shared.transition(&mut inner, SessionState::Sending);
            inner.generation = 7;
            inner.generation
        };
        (shared, generation)
    }

    #[test]
    fn test_completed_event_replaces_placeholder() {
        let mut store = pending_store();
        let mut reconciler = StreamReconciler::new("UC1");

        let applied = reconciler
            .apply(&mut store, r#"{"id":"abc","status":"completed","content":"Hello!"}"#)
            .unwrap();

        assert!(applied.is_terminal());
        assert_eq!(applied.upserted, Upserted::Replaced(1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[1].content, "Hello!");
        assert_eq!(store.messages()[1].role, MessageRole::Assistant);
        assert_eq!(reconciler.last_assistant_id(), "abc");
    }

    #[test]
    fn test_enum_name_status_from_backend() {
        let mut store = pending_store();
        let mut reconciler = StreamReconciler::new("UC1");

        let applied = reconciler
            .apply(
                &mut store,
                r#"{"id":"abc","role":"ASSISTANT","status":"IN_PROGRESS","content":"Hel","additional_kwargs":{}}"#,
            )
            .unwrap();

        assert_eq!(applied.status, MessageStatus::InProgress);
        assert!(!applied.is_terminal());
    }

    #[test]
    fn test_rejected_and_regenerated_are_not_terminal() {
        let mut store = pending_store();
        let mut reconciler = StreamReconciler::new("UC1");

        for status in ["rejected", "REGENRATED", "regenerated"] {
            let payload = format!(r#"{{"id":"abc","status":"{}","content":"x"}}"#, status);
            let applied = reconciler.apply(&mut store, &payload).unwrap();
            assert!(!applied.is_terminal(), "{} should not be terminal", status);
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unknown_status_is_merged_as_in_progress() {
        let mut store = pending_store();
        let mut reconciler = StreamReconciler::new("UC1");

        let applied = reconciler
            .apply(&mut store, r#"{"id":"abc","status":"paused","content":"partial"}"#)
            .unwrap();

        assert_eq!(applied.unknown_status.as_deref(), Some("paused"));
        assert_eq!(applied.status, MessageStatus::InProgress);
        assert_eq!(store.messages()[1].content, "partial");
    }

    #[test]
    fn test_undecodable_payload_is_skipped() {
        let mut store = pending_store();
        let mut reconciler = StreamReconciler::new("UC1");

        let err = reconciler.apply(&mut store, "{not json").unwrap_err();

        assert!(matches!(err, StreamError::Protocol { .. }));
        assert_eq!(store.messages()[1].content, WORKING_MARKER);
    }

    #[test]
    fn test_missing_id_targets_last_written_message() {
        let mut store = pending_store();
        let mut reconciler = StreamReconciler::new("UC1");

        reconciler
            .apply(&mut store, r#"{"status":"in_progress","content":"He"}"#)
            .unwrap();
        assert_eq!(store.messages()[1].id, PLACEHOLDER_ID);
        assert_eq!(store.messages()[1].content, "He");

        reconciler
            .apply(&mut store, r#"{"id":"abc","status":"in_progress","content":"Hel"}"#)
            .unwrap();
        reconciler
            .apply(&mut store, r#"{"status":"completed","content":"Hello"}"#)
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[1].id, "abc");
        assert_eq!(store.messages()[1].status, MessageStatus::Completed);
    }

    #[test]
    fn test_created_at_kept_without_incoming_timestamp() {
        let mut store = pending_store();
        let created = store.messages()[1].created_at;
        let mut reconciler = StreamReconciler::new("UC1");

        reconciler
            .apply(&mut store, r#"{"id":"abc","status":"in_progress","content":"x"}"#)
            .unwrap();

        assert_eq!(store.messages()[1].created_at, created);
    }

    #[test]
    fn test_stale_generation_does_not_mutate() {
        let (shared, generation) = sending_shared();
        shared.lock().close_stream();

        let mut reconciler = StreamReconciler::new("UC1");
        let stop = handle_payload(
            &shared,
            generation,
            &mut reconciler,
            r#"{"id":"abc","status":"completed","content":"late"}"#,
        );

        assert!(stop);
        let inner = shared.lock();
        assert!(inner.store.messages()[1].is_placeholder());
        assert_eq!(inner.state, SessionState::Sending);
    }

    #[test]
    fn test_terminal_payload_ends_sending() {
        let (shared, generation) = sending_shared();
        let mut events = shared.subscribe();
        let mut reconciler = StreamReconciler::new("UC1");

        assert!(!handle_payload(
            &shared,
            generation,
            &mut reconciler,
            r#"{"id":"abc","status":"in_progress","content":"Hi"}"#,
        ));
        assert!(handle_payload(
            &shared,
            generation,
            &mut reconciler,
            r#"{"id":"abc","status":"failed","content":"Hi"}"#,
        ));

        assert_eq!(shared.lock().state, SessionState::Ready);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::MessagesChanged);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::MessagesChanged);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::SendingEnded {
                status: MessageStatus::Failed
            }
        );
    }

    #[test]
    fn test_transport_failure_marks_last_assistant_failed() {
        let (shared, generation) = sending_shared();
        let reconciler = StreamReconciler::new("UC1");

        fail(&shared, generation, &reconciler, StreamError::transport("reset"));

        let inner = shared.lock();
        assert_eq!(inner.state, SessionState::Ready);
        assert_eq!(inner.store.messages()[1].status, MessageStatus::Failed);
        assert_eq!(inner.store.messages()[0].status, MessageStatus::InProgress);
    }
}

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tubechat_client::ConversationGateway;
use tubechat_types::{Channel, Conversation, ConversationId, Message, MessageStatus};

use crate::error::{Result, SessionError, SessionInitError};
use crate::events::{SessionEvent, SessionState};
use crate::reconciler::{self, StreamRequest};
use crate::shared::Shared;

/// Owns one channel's conversation: establishes or resumes it, sends user
/// messages and exposes the reconciled message list.
///
/// Reads never wait on I/O. `submit` spawns onto the current tokio runtime.
/// Dropping the coordinator closes any in-flight stream.
pub struct SessionCoordinator {
    gateway: Arc<dyn ConversationGateway>,
    shared: Arc<Shared>,
}

impl SessionCoordinator {
    pub fn new(gateway: Arc<dyn ConversationGateway>) -> Self {
        Self {
            gateway,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Load the channel, resume its conversation if one exists and fetch
    /// its history.
    ///
    /// Allowed from `Uninitialized` and `Failed`. On error the session is
    /// `Failed` until `start` is called again.
    pub async fn start(&self, channel_id: &str) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            match inner.state {
                SessionState::Uninitialized | SessionState::Failed => {}
                _ => return Err(SessionError::AlreadyStarted),
            }
            inner.channel_id = Some(channel_id.to_string());
            inner.channel = None;
            inner.conversation_id = None;
            inner.store.reset();
            self.shared.transition(&mut inner, SessionState::Loading);
        }

        match self.load(channel_id).await {
            Ok((channel, conversation_id, history)) => {
                let mut inner = self.shared.lock();
                tracing::info!(
                    channel_id,
                    conversation_id = ?conversation_id.as_ref().map(ConversationId::as_str),
                    messages = history.len(),
                    "Session ready"
                );
                inner.channel = Some(channel);
                inner.conversation_id = conversation_id;
                inner.store.replace_all(history);
                self.shared.transition(&mut inner, SessionState::Ready);
                self.shared.emit(SessionEvent::MessagesChanged);
                Ok(())
            }
            Err(e) => {
                tracing::error!(channel_id, error = %e, "Failed to start session");
                let mut inner = self.shared.lock();
                self.shared.transition(&mut inner, SessionState::Failed);
                Err(e.into())
            }
        }
    }

    async fn load(
        &self,
        channel_id: &str,
    ) -> std::result::Result<(Channel, Option<ConversationId>, Vec<Message>), SessionInitError> {
        let channel = self
            .gateway
            .fetch_channel(channel_id)
            .await
            .map_err(SessionInitError::Channel)?;
        if !channel.is_active() {
            return Err(SessionInitError::ChannelInactive(channel_id.to_string()));
        }

        let conversation_id = self
            .gateway
            .resolve_conversation(channel_id)
            .await
            .map_err(SessionInitError::Conversation)?;

        let history = match &conversation_id {
            Some(id) => self
                .gateway
                .fetch_history(channel_id, id)
                .await
                .map_err(SessionInitError::History)?,
            None => Vec::new(),
        };

        Ok((channel, conversation_id, history))
    }

    /// Replace the conversation with a fresh one and clear the transcript.
    ///
    /// Only from `Ready`; while a message is in flight this returns
    /// [`SessionError::SendInFlight`] and changes nothing. If the backend
    /// refuses, the old conversation stays.
    pub async fn reset(&self) -> Result<ConversationId> {
        let channel_id = {
            let mut inner = self.shared.lock();
            match inner.state {
                SessionState::Ready => {}
                SessionState::Sending => return Err(SessionError::SendInFlight),
                other => return Err(SessionError::NotReady(other)),
            }
            let Some(channel_id) = inner.channel_id.clone() else {
                return Err(SessionError::NotReady(inner.state));
            };
            self.shared.transition(&mut inner, SessionState::Resetting);
            channel_id
        };

        let created = self.gateway.create_conversation(&channel_id).await;

        let mut inner = self.shared.lock();
        match created {
            Ok(id) => {
                tracing::info!(conversation_id = %id, "Conversation reset");
                inner.conversation_id = Some(id.clone());
                inner.store.reset();
                self.shared.transition(&mut inner, SessionState::Ready);
                self.shared
                    .emit(SessionEvent::ConversationReset { id: id.clone() });
                self.shared.emit(SessionEvent::MessagesChanged);
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Conversation reset failed");
                self.shared.transition(&mut inner, SessionState::Ready);
                Err(e.into())
            }
        }
    }

    /// Send a user message.
    ///
    /// Returns false without side effects for blank text or when the
    /// session is not `Ready`. Otherwise, before returning, the user
    /// message and the assistant placeholder are appended and the session
    /// is `Sending`; the reply then streams in on a background task.
    pub fn submit(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        let mut inner = self.shared.lock();
        if inner.state != SessionState::Ready {
            tracing::debug!(state = %inner.state, "Submit ignored");
            return false;
        }
        let Some(channel_id) = inner.channel_id.clone() else {
            return false;
        };

        inner.store.append(Message::user(channel_id.as_str(), text));
        inner.store.append(Message::placeholder(channel_id.as_str()));
        self.shared.transition(&mut inner, SessionState::Sending);
        self.shared.emit(SessionEvent::MessagesChanged);
        self.shared.emit(SessionEvent::SendingStarted);

        if inner.close_stream() {
            tracing::warn!("Closing previous message stream before opening a new one");
        }
        let generation = inner.generation;
        let request = StreamRequest {
            channel_id,
            conversation_id: inner.conversation_id.clone(),
            text: text.to_string(),
        };
        let handle = reconciler::open(
            Arc::clone(&self.gateway),
            Arc::clone(&self.shared),
            generation,
            request,
        );
        inner.stream = Some(handle);
        true
    }

    /// Stop the in-flight stream, if any. Events it already queued are
    /// discarded. A pending submission ends with its reply marked failed
    /// and the session goes back to `Ready`.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        if inner.close_stream() {
            tracing::info!("Message stream closed");
        }
        if inner.state == SessionState::Sending {
            if inner.store.abandon_reply() {
                self.shared.emit(SessionEvent::MessagesChanged);
            }
            self.shared.emit(SessionEvent::SendingEnded {
                status: MessageStatus::Failed,
            });
            self.shared.transition(&mut inner, SessionState::Ready);
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn is_sending(&self) -> bool {
        self.state() == SessionState::Sending
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().store.snapshot()
    }

    pub fn channel(&self) -> Option<Channel> {
        self.shared.lock().channel.clone()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.shared.lock().conversation_id.clone()
    }

    /// Current conversation with the in-memory transcript as its history
    pub fn conversation(&self) -> Option<Conversation> {
        let inner = self.shared.lock();
        let id = inner.conversation_id.clone()?;
        let channel_id = inner.channel_id.clone()?;
        Some(Conversation::new(id, channel_id).with_history(inner.store.snapshot()))
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.subscribe_state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.subscribe()
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.shared.lock().close_stream();
    }
}

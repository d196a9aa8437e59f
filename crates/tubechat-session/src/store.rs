use tubechat_types::{Message, MessageRole, MessageStatus, PLACEHOLDER_ID};

/// Outcome of [`MessageStore::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// Replaced the entry at this index
    Replaced(usize),
    Appended,
}

/// Ordered message list of one conversation.
///
/// Order is insertion order. Ids are unique, except that an assistant
/// placeholder (`"initial"`) may coexist with real ids until a streamed
/// update replaces it.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the entry with the same id, else the first placeholder,
    /// else append.
    pub fn upsert(&mut self, message: Message) -> Upserted {
        match self.upsert_index(&message.id) {
            Some(index) => {
                self.messages[index] = message;
                Upserted::Replaced(index)
            }
            None => {
                self.messages.push(message);
                Upserted::Appended
            }
        }
    }

    /// Entry an upsert of `id` would replace
    pub fn upsert_target(&self, id: &str) -> Option<&Message> {
        self.upsert_index(id).map(|index| &self.messages[index])
    }

    fn upsert_index(&self, id: &str) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| m.id == id)
            .or_else(|| self.messages.iter().position(|m| m.id == PLACEHOLDER_ID))
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Replace the whole list with a fetched history snapshot
    pub fn replace_all(&mut self, history: Vec<Message>) {
        self.messages = history;
    }

    /// Returns false when no entry has `id`
    pub fn mark_failed(&mut self, id: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.status = MessageStatus::Failed;
                true
            }
            None => false,
        }
    }

    /// Fail the unfinished reply to the last user message. Its placeholder
    /// is re-keyed to `{user id}:reply` so it can no longer be taken by a
    /// later upsert. Returns false when nothing was pending.
    pub fn abandon_reply(&mut self) -> bool {
        let Some(user) = self.messages.iter().rposition(|m| m.role == MessageRole::User) else {
            return false;
        };
        let reply_id = format!("{}:reply", self.messages[user].id);

        let mut changed = false;
        for message in &mut self.messages[user + 1..] {
            if message.role != MessageRole::Assistant || message.status != MessageStatus::InProgress {
                continue;
            }
            if message.is_placeholder() {
                message.id = reply_id.clone();
            }
            message.status = MessageStatus::Failed;
            changed = true;
        }
        changed
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

use crate::error::StoreError;
use crate::model::{Conversation, Message, MessageKind};
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

/// Conversations of the logged-in user
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Inbox {
    conversations: Vec<Conversation>,
    next_id: u64,
}

impl Inbox {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        let next_id = next_free_id(&conversations);
        Inbox {
            conversations,
            next_id,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: u64) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Appends a message with a fresh id and the current time
    ///
    /// Only participants may write. Their own messages leave the unread
    /// counter untouched.
    pub fn send_message(
        &mut self,
        conversation_id: u64,
        sender_id: u64,
        content: &str,
        kind: MessageKind,
    ) -> Result<&Message, StoreError> {
        let id = self.next_id;
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or(StoreError::ConversationNotFound(conversation_id))?;
        if !conversation.participant_ids.contains(&sender_id) {
            return Err(StoreError::NotParticipant {
                conversation_id,
                user_id: sender_id,
            });
        }

        self.next_id += 1;
        conversation.messages.push(Message {
            id,
            sender_id,
            content: content.to_string(),
            timestamp: Utc::now(),
            kind,
        });
        debug!("message {} added to conversation {}", id, conversation_id);

        conversation
            .messages
            .last()
            .ok_or(StoreError::ConversationNotFound(conversation_id))
    }

    /// Id of the conversation between the two users, created when there is none
    pub fn start_conversation(&mut self, current_user_id: u64, recipient_id: u64) -> u64 {
        if let Some(existing) = self.conversations.iter().find(|c| {
            c.participant_ids.contains(&current_user_id)
                && c.participant_ids.contains(&recipient_id)
        }) {
            return existing.id;
        }

        let id = self.allocate_id();
        self.conversations.insert(
            0,
            Conversation {
                id,
                participant_ids: vec![current_user_id, recipient_id],
                messages: Vec::new(),
                unread_count: 0,
            },
        );
        id
    }

    pub fn unread_count(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    pub fn mark_as_read(&mut self, conversation_id: u64) {
        if let Some(c) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            c.unread_count = 0;
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn next_free_id(conversations: &[Conversation]) -> u64 {
    let max_conversation = conversations.iter().map(|c| c.id).max().unwrap_or(0);
    let max_message = conversations
        .iter()
        .flat_map(|c| c.messages.iter().map(|m| m.id))
        .max()
        .unwrap_or(0);
    max_conversation.max(max_message) + 1
}

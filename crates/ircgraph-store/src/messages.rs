use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{ContactId, Message, MessageEvent, MessageId, NewMessage};

/// Messages owned by one contact (a channel, or the remote side of a DM).
#[derive(Debug, Clone)]
pub struct MessageStore {
    owner: ContactId,
    messages: Vec<Message>,
}

impl MessageStore {
    fn new(owner: ContactId) -> Self {
        Self {
            owner,
            messages: Vec::new(),
        }
    }

    pub fn owner(&self) -> ContactId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages in ingestion order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_unread()).count()
    }
}

/// Message stores keyed by owning contact.
#[derive(Debug, Default)]
pub struct MessageRegistry {
    stores: HashMap<ContactId, MessageStore>,
    subscribers: Vec<mpsc::UnboundedSender<MessageEvent>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store owned by `owner`, created on first use.
    pub fn store_for(&mut self, owner: ContactId) -> &mut MessageStore {
        self.stores
            .entry(owner)
            .or_insert_with(|| MessageStore::new(owner))
    }

    pub fn get_store(&self, owner: ContactId) -> Option<&MessageStore> {
        self.stores.get(&owner)
    }

    /// Total number of messages across all stores.
    pub fn message_count(&self) -> usize {
        self.stores.values().map(MessageStore::len).sum()
    }

    /// Append a message to `owner`'s store and announce it.
    pub fn create_message(&mut self, owner: ContactId, new: NewMessage) -> MessageId {
        let id = MessageId::new();
        self.store_for(owner).messages.push(new.into_message(id));
        debug!(store = %owner, message = %id.0, "Stored message");
        self.notify(MessageEvent::Constructed {
            store: owner,
            message: id,
        });
        id
    }

    /// Set the read marker. Returns `false` if the message is unknown or was
    /// already read.
    pub fn mark_read(&mut self, owner: ContactId, id: MessageId, at: DateTime<Utc>) -> bool {
        let Some(message) = self
            .stores
            .get_mut(&owner)
            .and_then(|s| s.messages.iter_mut().find(|m| m.id() == id))
        else {
            return false;
        };
        if message.read_at.is_some() {
            return false;
        }
        message.read_at = Some(at);
        self.notify(MessageEvent::Updated {
            store: owner,
            message: id,
        });
        true
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<MessageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: MessageEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

//! Domain model structs held by the in-memory registries.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ircgraph_shared::{ConnectionState, Digest};

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// Handle of a contact inside a [`ContactRegistry`](crate::ContactRegistry).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u64);

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Boolean markers attached to a contact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The contact is a connection root (server).
    Root,
    /// The authoritative local identity on its server.
    SelfStrong,
    Big,
    Group,
    Private,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactTags {
    pub root: bool,
    pub self_strong: bool,
    pub big: bool,
    pub group: bool,
    pub private: bool,
}

impl ContactTags {
    pub fn has(&self, tag: Tag) -> bool {
        match tag {
            Tag::Root => self.root,
            Tag::SelfStrong => self.self_strong,
            Tag::Big => self.big,
            Tag::Group => self.group,
            Tag::Private => self.private,
        }
    }

    fn slot(&mut self, tag: Tag) -> &mut bool {
        match tag {
            Tag::Root => &mut self.root,
            Tag::SelfStrong => &mut self.self_strong,
            Tag::Big => &mut self.big,
            Tag::Group => &mut self.group,
            Tag::Private => &mut self.private,
        }
    }
}

/// A server, channel or user.
///
/// Attributes are sparse. The identity digest and the parent link are owned by
/// the registry (they carry graph-wide invariants); everything else can be
/// edited through the setters, which report whether anything changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub(crate) id: ContactId,
    pub(crate) digest: Option<Digest>,
    pub(crate) parent: Option<ContactId>,
    server_name: Option<String>,
    channel_name: Option<String>,
    user_name: Option<String>,
    display_name: Option<String>,
    members: Vec<ContactId>,
    self_ref: Option<ContactId>,
    connection_state: Option<ConnectionState>,
    tags: ContactTags,
    status_text: Option<String>,
}

impl Contact {
    pub(crate) fn new(id: ContactId) -> Self {
        Self {
            id,
            digest: None,
            parent: None,
            server_name: None,
            channel_name: None,
            user_name: None,
            display_name: None,
            members: Vec::new(),
            self_ref: None,
            connection_state: None,
            tags: ContactTags::default(),
            status_text: None,
        }
    }

    pub fn id(&self) -> ContactId {
        self.id
    }

    pub fn digest(&self) -> Option<Digest> {
        self.digest
    }

    pub fn parent(&self) -> Option<ContactId> {
        self.parent
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel_name.as_deref()
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn members(&self) -> &[ContactId] {
        &self.members
    }

    pub fn has_member(&self, member: ContactId) -> bool {
        self.members.contains(&member)
    }

    pub fn self_ref(&self) -> Option<ContactId> {
        self.self_ref
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.connection_state
    }

    pub fn tags(&self) -> ContactTags {
        self.tags
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.has(tag)
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    /// Protocol target for outbound text: the nick, else the channel name.
    pub fn address(&self) -> Option<&str> {
        self.user_name.as_deref().or(self.channel_name.as_deref())
    }

    pub fn set_server_name(&mut self, name: &str) -> bool {
        replace_string(&mut self.server_name, name)
    }

    pub fn set_channel_name(&mut self, name: &str) -> bool {
        replace_string(&mut self.channel_name, name)
    }

    pub fn set_user_name(&mut self, name: &str) -> bool {
        replace_string(&mut self.user_name, name)
    }

    pub fn set_display_name(&mut self, name: &str) -> bool {
        replace_string(&mut self.display_name, name)
    }

    pub fn set_status_text(&mut self, text: &str) -> bool {
        replace_string(&mut self.status_text, text)
    }

    pub fn set_self_ref(&mut self, self_contact: ContactId) -> bool {
        replace(&mut self.self_ref, self_contact)
    }

    pub fn set_connection_state(&mut self, state: ConnectionState) -> bool {
        replace(&mut self.connection_state, state)
    }

    pub fn set_tag(&mut self, tag: Tag, on: bool) -> bool {
        let slot = self.tags.slot(tag);
        let changed = *slot != on;
        *slot = on;
        changed
    }

    /// Append `member` unless already listed.
    pub fn add_member(&mut self, member: ContactId) -> bool {
        if self.members.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Remove `member` if listed. Absence is not an error.
    pub fn remove_member(&mut self, member: ContactId) -> bool {
        match self.members.iter().position(|m| *m == member) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

fn replace_string(slot: &mut Option<String>, value: &str) -> bool {
    if slot.as_deref() == Some(value) {
        return false;
    }
    *slot = Some(value.to_string());
    true
}

/// Change notification emitted by the contact registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContactEvent {
    Constructed(ContactId),
    Updated(ContactId),
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// A single chat message or action. Immutable once stored, except for the
/// read marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    from: ContactId,
    to: ContactId,
    text: String,
    is_action: bool,
    /// When the message was composed locally (outbound only).
    written_at: Option<DateTime<Utc>>,
    /// When the message was ingested.
    processed_at: DateTime<Utc>,
    /// Display ordering timestamp.
    timestamp: DateTime<Utc>,
    pub(crate) read_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn from(&self) -> ContactId {
        self.from
    }

    pub fn to(&self) -> ContactId {
        self.to
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_action(&self) -> bool {
        self.is_action
    }

    pub fn written_at(&self) -> Option<DateTime<Utc>> {
        self.written_at
    }

    pub fn processed_at(&self) -> DateTime<Utc> {
        self.processed_at
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

/// Input for [`MessageRegistry::create_message`](crate::MessageRegistry::create_message).
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub from: ContactId,
    pub to: ContactId,
    pub text: String,
    pub is_action: bool,
    pub written_at: Option<DateTime<Utc>>,
    pub processed_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl NewMessage {
    /// A message received from the network: processed now, unread.
    pub fn inbound(from: ContactId, to: ContactId, text: &str, is_action: bool) -> Self {
        Self {
            from,
            to,
            text: text.to_string(),
            is_action,
            written_at: None,
            processed_at: Utc::now(),
            read_at: None,
        }
    }

    /// Our own echo of a sent message: written, processed and read at once.
    pub fn outbound(from: ContactId, to: ContactId, text: &str, is_action: bool) -> Self {
        let now = Utc::now();
        Self {
            from,
            to,
            text: text.to_string(),
            is_action,
            written_at: Some(now),
            processed_at: now,
            read_at: Some(now),
        }
    }

    pub(crate) fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            from: self.from,
            to: self.to,
            text: self.text,
            is_action: self.is_action,
            written_at: self.written_at,
            processed_at: self.processed_at,
            timestamp: self.written_at.unwrap_or(self.processed_at),
            read_at: self.read_at,
        }
    }
}

/// Change notification emitted by the message registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageEvent {
    Constructed { store: ContactId, message: MessageId },
    Updated { store: ContactId, message: MessageId },
}

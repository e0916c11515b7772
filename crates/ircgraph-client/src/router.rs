//! Moves chat text between the session and the message stores.
//!
//! Inbound messages are resolved to contacts through the [`ContactModel`]
//! and appended to the store of the remote party: the sender for direct
//! messages, the channel for group traffic. Outbound text is split into one
//! protocol command per line and echoed into the target's store once.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use ircgraph_net::{Commands, EventHandler, EventKind, EventPayload, SessionEvent};
use ircgraph_store::{ContactId, ContactRegistry, MessageId, MessageRegistry, NewMessage, Tag};

use crate::contacts::ContactModel;

/// Event kinds the router consumes.
pub const MESSAGE_EVENTS: &[EventKind] = &[
    EventKind::ChannelMessage,
    EventKind::PrivateMessage,
    EventKind::Notice,
    EventKind::ChannelNotice,
    EventKind::CtcpAction,
];

pub struct MessageRouter {
    model: Rc<RefCell<ContactModel>>,
    contacts: Rc<RefCell<ContactRegistry>>,
    messages: Rc<RefCell<MessageRegistry>>,
}

impl MessageRouter {
    pub fn new(
        model: Rc<RefCell<ContactModel>>,
        contacts: Rc<RefCell<ContactRegistry>>,
        messages: Rc<RefCell<MessageRegistry>>,
    ) -> Self {
        Self {
            model,
            contacts,
            messages,
        }
    }

    /// Send `text` to `contact`, one command per non-empty line.
    ///
    /// Returns `false` without side effects for an unusable destination, and
    /// `false` as soon as a line fails to go out. On success one message is
    /// recorded for the whole text, already marked read.
    pub fn send_text(
        &mut self,
        commands: &mut dyn Commands,
        contact: ContactId,
        text: &str,
        is_action: bool,
    ) -> bool {
        if text.is_empty() {
            return false;
        }

        let (target, me) = {
            let contacts = self.contacts.borrow();
            let Some(c) = contacts.get(contact) else {
                debug!(contact = %contact, "Send to unknown contact");
                return false;
            };
            if c.has_tag(Tag::SelfStrong) {
                debug!(contact = %contact, "Refusing to message ourselves");
                return false;
            }
            let Some(target) = c.address() else {
                debug!(contact = %contact, "Contact is not a message destination");
                return false;
            };
            let Some(me) = c.self_ref() else {
                warn!(contact = %contact, "Contact has no self reference");
                return false;
            };
            (target.to_string(), me)
        };

        for line in text.lines().filter(|l| !l.is_empty()) {
            let sent = if is_action {
                commands.send_action(&target, line)
            } else {
                commands.send_message(&target, line)
            };
            if !sent {
                warn!(recipient = %target, action = is_action, "Failed to send, giving up");
                return false;
            }
        }

        let id = self.messages.borrow_mut().create_message(
            contact,
            NewMessage::outbound(me, contact, text, is_action),
        );
        debug!(recipient = %target, message = %id.0, "Recorded outbound message");
        true
    }

    fn on_channel_message(&mut self, payload: &EventPayload) {
        if !well_formed(payload, "channel message") {
            return;
        }
        let Some(channel) = self.model.borrow().find_channel(&payload.params[0]) else {
            warn!(channel = %payload.params[0], "Channel message for unknown channel");
            return;
        };
        let Some(from) = self.sender(payload, "channel message") else {
            return;
        };
        self.ingest(from, channel, &payload.params[1], false);
    }

    fn on_private_message(&mut self, payload: &EventPayload) {
        if !well_formed(payload, "private message") {
            return;
        }
        let Some(to) = self.model.borrow().find_user(&payload.params[0]) else {
            warn!(receiver = %payload.params[0], "Private message for unknown receiver");
            return;
        };
        let Some(from) = self.sender(payload, "private message") else {
            return;
        };
        self.upgrade(from, &[Tag::Big, Tag::Private]);
        self.ingest(from, to, &payload.params[1], false);
    }

    fn on_channel_notice(&mut self, payload: &EventPayload) {
        if !well_formed(payload, "channel notice") {
            return;
        }
        let Some(channel) = self.model.borrow().find_channel(&payload.params[0]) else {
            warn!(channel = %payload.params[0], "Channel notice for unknown channel");
            return;
        };
        let Some(from) = self.sender(payload, "channel notice") else {
            return;
        };
        self.ingest(from, channel, &payload.params[1], false);
    }

    fn on_action(&mut self, payload: &EventPayload) {
        if !well_formed(payload, "action") {
            return;
        }
        let Some(to) = self.model.borrow().find_by_name(&payload.params[0]) else {
            warn!(receiver = %payload.params[0], "Action for unknown receiver");
            return;
        };
        let Some(from) = self.sender(payload, "action") else {
            return;
        };
        let to_user = self
            .contacts
            .borrow()
            .get(to)
            .is_some_and(|c| c.user_name().is_some());
        if to_user {
            self.upgrade(from, &[Tag::Big]);
        }
        self.ingest(from, to, &payload.params[1], true);
    }

    /// Resolve or create the sender. Only called once the receiver is known.
    fn sender(&mut self, payload: &EventPayload, what: &str) -> Option<ContactId> {
        let from = self.model.borrow_mut().resolve_user(&payload.origin);
        if from.is_none() {
            warn!(origin = %payload.origin, "Dropping {what} from unresolvable sender");
        }
        from
    }

    fn upgrade(&mut self, id: ContactId, tags: &[Tag]) {
        let mut contacts = self.contacts.borrow_mut();
        let mut changed = false;
        if let Some(contact) = contacts.contact_mut(id) {
            for tag in tags {
                changed |= contact.set_tag(*tag, true);
            }
        }
        if changed {
            contacts.notify_updated(id);
        }
    }

    fn ingest(&mut self, from: ContactId, to: ContactId, text: &str, is_action: bool) -> MessageId {
        // Messages addressed to us belong to the sender's conversation.
        let to_self = self
            .contacts
            .borrow()
            .get(to)
            .is_some_and(|c| c.has_tag(Tag::SelfStrong));
        let owner = if to_self { from } else { to };

        self.messages
            .borrow_mut()
            .create_message(owner, NewMessage::inbound(from, to, text, is_action))
    }
}

fn well_formed(payload: &EventPayload, what: &str) -> bool {
    if payload.params.len() < 2 {
        warn!(params = payload.params.len(), "Malformed {what}");
        return false;
    }
    true
}

impl EventHandler for MessageRouter {
    fn on_event(&mut self, event: &SessionEvent, _commands: &mut dyn Commands) {
        match event {
            SessionEvent::ChannelMessage(payload) => self.on_channel_message(payload),
            SessionEvent::PrivateMessage(payload) => self.on_private_message(payload),
            SessionEvent::ChannelNotice(payload) => self.on_channel_notice(payload),
            SessionEvent::CtcpAction(payload) => self.on_action(payload),
            SessionEvent::Notice(payload) => {
                debug!(from = %payload.origin, params = payload.params.len(), "Notice observed");
            }
            _ => {}
        }
    }
}

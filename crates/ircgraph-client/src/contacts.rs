//! Keeps the contact graph in step with the live session.
//!
//! The [`ContactModel`] turns session events into contact mutations: the
//! server root and our own user on Connect, channels and their members on
//! Join / NAMES, topics, departures. Every contact it creates is keyed by a
//! digest derived from the server name, so reconnects land on the same
//! contacts instead of duplicating them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, info, warn};

use ircgraph_net::{Commands, EventHandler, EventKind, EventPayload, SessionEvent};
use ircgraph_shared::constants::{
    CHANNEL_VISIBILITY_MARKERS, CONFIG_SECTION, RPL_NAMREPLY, RPL_TOPIC,
};
use ircgraph_shared::names::{classify, strip_membership_prefix};
use ircgraph_shared::{ConfigModel, ConnectionState, NameKind, ServerIdentity};
use ircgraph_store::{ContactId, ContactRegistry, Tag};

/// Event kinds the contact model consumes.
pub const CONTACT_EVENTS: &[EventKind] = &[
    EventKind::Connect,
    EventKind::Disconnect,
    EventKind::Numeric,
    EventKind::Join,
    EventKind::Part,
    EventKind::Kick,
    EventKind::Topic,
    EventKind::Quit,
    EventKind::CtcpRequest,
];

/// Session-scoped identity cache. Reset on every Disconnect.
#[derive(Debug, Clone)]
struct Anchor {
    server: ServerIdentity,
    root: ContactId,
    me: ContactId,
}

pub struct ContactModel {
    contacts: Rc<RefCell<ContactRegistry>>,
    anchor: Option<Anchor>,
    connected: bool,
    pending_joins: VecDeque<String>,
}

impl ContactModel {
    /// Build the model and queue the configured autojoin channels.
    pub fn new(contacts: Rc<RefCell<ContactRegistry>>, config: &dyn ConfigModel) -> Self {
        let pending_joins: VecDeque<String> = config
            .entries_bool(CONFIG_SECTION, "autojoin")
            .into_iter()
            .filter(|(channel, enabled)| *enabled && !channel.is_empty())
            .map(|(channel, _)| channel)
            .collect();
        if !pending_joins.is_empty() {
            debug!(count = pending_joins.len(), "Queued autojoin channels");
        }

        Self {
            contacts,
            anchor: None,
            connected: false,
            pending_joins,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn server_contact(&self) -> Option<ContactId> {
        self.anchor.as_ref().map(|a| a.root)
    }

    pub fn self_contact(&self) -> Option<ContactId> {
        self.anchor.as_ref().map(|a| a.me)
    }

    /// Channels waiting for the next Connect, in request order.
    pub fn pending_joins(&self) -> impl Iterator<Item = &str> {
        self.pending_joins.iter().map(String::as_str)
    }

    /// Join now if connected, otherwise remember the channel for the next
    /// Connect. Returns `false` only for an empty name or a failed command.
    pub fn join(&mut self, commands: &mut dyn Commands, channel: &str) -> bool {
        if channel.is_empty() {
            warn!("Refusing to join an empty channel name");
            return false;
        }
        if self.connected && commands.is_connected() {
            return commands.join(channel);
        }
        debug!(channel, "Not connected, queueing join");
        self.pending_joins.push_back(channel.to_string());
        true
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn find_channel(&self, name: &str) -> Option<ContactId> {
        let id = self.find_child(name)?;
        let contacts = self.contacts.borrow();
        contacts
            .get(id)
            .filter(|c| c.channel_name().is_some())
            .map(|c| c.id())
    }

    pub fn find_user(&self, nick: &str) -> Option<ContactId> {
        let id = self.find_child(nick)?;
        let contacts = self.contacts.borrow();
        contacts
            .get(id)
            .filter(|c| c.user_name().is_some())
            .map(|c| c.id())
    }

    /// Resolve a protocol name without context, by its prefix.
    pub fn find_by_name(&self, name: &str) -> Option<ContactId> {
        if name.is_empty() {
            return None;
        }
        match classify(name) {
            NameKind::Channel => self.find_channel(name),
            NameKind::User => self.find_user(name),
        }
    }

    fn find_child(&self, label: &str) -> Option<ContactId> {
        let anchor = self.anchor.as_ref()?;
        let digest = anchor.server.child(label).ok()?;
        self.contacts.borrow().find_by_digest_in(&digest, anchor.root)
    }

    /// Resolve `nick` to a user contact under the current server, creating
    /// it on first sight. Anyone we hear from is reachable, so other users
    /// are stamped `Cloud` on every call.
    pub fn resolve_user(&mut self, nick: &str) -> Option<ContactId> {
        let Some(anchor) = self.anchor.clone() else {
            warn!(nick, "Cannot resolve user before connect");
            return None;
        };
        let digest = match anchor.server.child(nick) {
            Ok(digest) => digest,
            Err(e) => {
                warn!(nick, error = %e, "Cannot derive user identity");
                return None;
            }
        };

        let mut contacts = self.contacts.borrow_mut();
        let (id, created) = contacts.get_or_create_by_digest(digest);
        let mut changed = false;
        if created {
            if let Err(e) = contacts.set_parent(id, anchor.root) {
                warn!(contact = %id, error = %e, "Failed to attach user to server");
            }
        }
        if let Some(contact) = contacts.contact_mut(id) {
            changed |= contact.set_server_name(anchor.server.name());
            changed |= contact.set_user_name(nick);
            if created {
                contact.set_display_name(nick);
            }
            if id != anchor.me {
                changed |= contact.set_connection_state(ConnectionState::Cloud);
                changed |= contact.set_self_ref(anchor.me);
            }
        }
        announce(&mut contacts, id, created, changed);
        Some(id)
    }

    fn resolve_channel(&mut self, name: &str) -> Option<ContactId> {
        let anchor = self.anchor.clone()?;
        let digest = match anchor.server.child(name) {
            Ok(digest) => digest,
            Err(e) => {
                warn!(channel = name, error = %e, "Cannot derive channel identity");
                return None;
            }
        };

        let mut contacts = self.contacts.borrow_mut();
        let (id, created) = contacts.get_or_create_by_digest(digest);
        let mut changed = false;
        if created {
            if let Err(e) = contacts.set_parent(id, anchor.root) {
                warn!(contact = %id, error = %e, "Failed to attach channel to server");
            }
        }
        if let Some(contact) = contacts.contact_mut(id) {
            if created {
                contact.set_server_name(anchor.server.name());
                contact.set_channel_name(name);
                contact.set_display_name(name);
                contact.set_connection_state(ConnectionState::Cloud);
                contact.set_tag(Tag::Big, true);
                contact.set_tag(Tag::Group, true);
            }
            changed |= contact.set_self_ref(anchor.me);
        }
        announce(&mut contacts, id, created, changed);
        Some(id)
    }

    // ------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------

    fn on_connect(&mut self, payload: &EventPayload, commands: &mut dyn Commands) {
        let server_name = commands.server_name().to_string();
        let nick = payload
            .param(0)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| commands.nick())
            .to_string();

        let server = match ServerIdentity::new(&server_name) {
            Ok(server) => server,
            Err(e) => {
                warn!(server = %server_name, error = %e, "Cannot derive server identity");
                return;
            }
        };
        let self_digest = match server.child(&nick) {
            Ok(digest) => digest,
            Err(e) => {
                warn!(nick = %nick, error = %e, "Cannot derive self identity");
                return;
            }
        };

        let (root, me) = {
            let mut contacts = self.contacts.borrow_mut();

            let (root, root_created) = contacts.get_or_create_by_digest(server.digest());
            if let Some(contact) = contacts.contact_mut(root) {
                contact.set_server_name(&server_name);
                contact.set_display_name(&server_name);
                contact.set_connection_state(ConnectionState::Direct);
                contact.set_tag(Tag::Root, true);
                contact.set_tag(Tag::Big, true);
            }

            let (me, me_created) = contacts.get_or_create_by_digest(self_digest);
            if let Err(e) = contacts.set_parent(me, root) {
                warn!(contact = %me, error = %e, "Failed to attach self to server");
            }
            if let Some(contact) = contacts.contact_mut(me) {
                contact.set_server_name(&server_name);
                contact.set_user_name(&nick);
                if me_created {
                    contact.set_display_name(&nick);
                }
                contact.set_connection_state(ConnectionState::Direct);
                contact.set_tag(Tag::SelfStrong, true);
            }
            if let Some(contact) = contacts.contact_mut(root) {
                contact.set_self_ref(me);
            }

            // A previous nick of ours under this root is no longer us.
            let stale: Vec<ContactId> = contacts
                .children_of(root)
                .into_iter()
                .filter(|id| *id != me)
                .filter(|id| contacts.get(*id).is_some_and(|c| c.has_tag(Tag::SelfStrong)))
                .collect();
            for id in stale {
                if let Some(contact) = contacts.contact_mut(id) {
                    contact.set_tag(Tag::SelfStrong, false);
                }
                debug!(contact = %id, "Dropped stale self marker");
                contacts.notify_updated(id);
            }

            announce(&mut contacts, root, root_created, true);
            announce(&mut contacts, me, me_created, true);
            (root, me)
        };

        info!(server = %server_name, nick = %nick, root = %root, me = %me, "Session identity established");
        self.anchor = Some(Anchor { server, root, me });
        self.connected = true;

        for channel in self.resync_list(&server_name) {
            if !commands.join(&channel) {
                warn!(channel = %channel, "Failed to rejoin channel");
            }
        }
    }

    /// Queued joins first, then every channel already known for the server.
    fn resync_list(&mut self, server_name: &str) -> Vec<String> {
        let mut channels: Vec<String> = Vec::new();
        for channel in self.pending_joins.drain(..) {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }

        let contacts = self.contacts.borrow();
        for id in contacts.channels_of(server_name) {
            if let Some(name) = contacts.get(id).and_then(|c| c.channel_name()) {
                if !channels.iter().any(|c| c == name) {
                    channels.push(name.to_string());
                }
            }
        }
        channels
    }

    fn on_disconnect(&mut self) {
        self.connected = false;
        let Some(anchor) = self.anchor.take() else {
            debug!("Disconnect before any connect");
            return;
        };

        let mut contacts = self.contacts.borrow_mut();
        if let Some(contact) = contacts.contact_mut(anchor.root) {
            contact.set_connection_state(ConnectionState::Disconnected);
            contacts.notify_updated(anchor.root);
        }
        info!(server = %anchor.server.name(), "Session identity released");
    }

    fn on_names(&mut self, payload: &EventPayload) {
        if payload.params.len() != 4 {
            warn!(params = payload.params.len(), "Malformed names reply");
            return;
        }
        let marker = payload.params[1].as_str();
        if !CHANNEL_VISIBILITY_MARKERS.contains(&marker) {
            warn!(marker, "Unknown channel visibility in names reply");
            return;
        }
        let channel_name = payload.params[2].as_str();
        let Some(channel) = self.find_channel(channel_name) else {
            warn!(channel = channel_name, "Names reply for unknown channel");
            return;
        };

        let mut added = false;
        for token in payload.params[3].split(' ') {
            let nick = strip_membership_prefix(token);
            if nick.is_empty() {
                debug!(channel = channel_name, "Skipping empty names entry");
                continue;
            }
            let Some(user) = self.resolve_user(nick) else {
                continue;
            };
            match self.contacts.borrow_mut().add_member(channel, user) {
                Ok(changed) => added |= changed,
                Err(e) => warn!(channel = channel_name, error = %e, "Failed to add member"),
            }
        }
        if added {
            self.contacts.borrow_mut().notify_updated(channel);
        }
    }

    fn on_topic_reply(&mut self, payload: &EventPayload) {
        if payload.params.len() != 3 {
            warn!(params = payload.params.len(), "Malformed topic reply");
            return;
        }
        self.set_topic(&payload.params[1], &payload.params[2]);
    }

    fn on_topic(&mut self, payload: &EventPayload) {
        if payload.params.len() != 2 {
            warn!(params = payload.params.len(), "Malformed topic event");
            return;
        }
        self.set_topic(&payload.params[0], &payload.params[1]);
    }

    fn set_topic(&mut self, channel_name: &str, topic: &str) {
        let Some(channel) = self.find_channel(channel_name) else {
            warn!(channel = channel_name, "Topic for unknown channel");
            return;
        };
        let mut contacts = self.contacts.borrow_mut();
        let changed = contacts
            .contact_mut(channel)
            .is_some_and(|c| c.set_status_text(topic));
        if changed {
            contacts.notify_updated(channel);
        }
    }

    fn on_join(&mut self, payload: &EventPayload) {
        let Some(channel_name) = payload.param(0).filter(|c| !c.is_empty()) else {
            warn!("Join event without channel");
            return;
        };
        if payload.origin.is_empty() {
            warn!(channel = channel_name, "Join event without origin");
            return;
        }
        let Some(channel) = self.resolve_channel(channel_name) else {
            warn!(channel = channel_name, "Join before session identity");
            return;
        };
        let Some(user) = self.resolve_user(&payload.origin) else {
            return;
        };

        let mut contacts = self.contacts.borrow_mut();
        match contacts.add_member(channel, user) {
            Ok(true) => contacts.notify_updated(channel),
            Ok(false) => {}
            Err(e) => warn!(channel = channel_name, error = %e, "Failed to add member"),
        }
    }

    fn on_part(&mut self, channel_name: &str, nick: &str) {
        let Some(channel) = self.find_channel(channel_name) else {
            warn!(channel = channel_name, "Departure from unknown channel");
            return;
        };
        let Some(user) = self.find_user(nick) else {
            warn!(nick, "Departure of unknown user");
            return;
        };

        let mut contacts = self.contacts.borrow_mut();
        match contacts.remove_member(channel, user) {
            Ok(true) => contacts.notify_updated(channel),
            Ok(false) => {}
            Err(e) => warn!(channel = channel_name, error = %e, "Failed to remove member"),
        }
    }

    fn on_quit(&mut self, payload: &EventPayload) {
        let Some(user) = self.find_user(&payload.origin) else {
            warn!(nick = %payload.origin, "Quit of unknown user");
            return;
        };
        if Some(user) == self.self_contact() {
            return;
        }
        let mut contacts = self.contacts.borrow_mut();
        let changed = contacts
            .contact_mut(user)
            .is_some_and(|c| c.set_connection_state(ConnectionState::Disconnected));
        if changed {
            contacts.notify_updated(user);
        }
    }
}

impl EventHandler for ContactModel {
    fn on_event(&mut self, event: &SessionEvent, commands: &mut dyn Commands) {
        match event {
            SessionEvent::Connect(payload) => self.on_connect(payload, commands),
            SessionEvent::Disconnect(_) => self.on_disconnect(),
            SessionEvent::Numeric { code, payload } => match *code {
                RPL_NAMREPLY => self.on_names(payload),
                RPL_TOPIC => self.on_topic_reply(payload),
                _ => {}
            },
            SessionEvent::Join(payload) => self.on_join(payload),
            SessionEvent::Part(payload) => match payload.param(0) {
                Some(channel) => self.on_part(channel, &payload.origin),
                None => warn!("Part event without channel"),
            },
            SessionEvent::Kick(payload) => match (payload.param(0), payload.param(1)) {
                (Some(channel), Some(nick)) => self.on_part(channel, nick),
                _ => warn!(params = payload.params.len(), "Malformed kick event"),
            },
            SessionEvent::Topic(payload) => self.on_topic(payload),
            SessionEvent::Quit(payload) => self.on_quit(payload),
            SessionEvent::CtcpRequest(payload) => {
                debug!(from = %payload.origin, request = ?payload.param(0), "CTCP request");
            }
            _ => {}
        }
    }
}

fn announce(contacts: &mut ContactRegistry, id: ContactId, created: bool, changed: bool) {
    if created {
        contacts.notify_constructed(id);
    } else if changed {
        contacts.notify_updated(id);
    }
}

#[cfg(test)]
mod tests {
    use ircgraph_net::{OutboundCommand, Session};
    use ircgraph_net::{MemoryTransport, RawMessage};
    use ircgraph_shared::identity::{derive_child, hash_name};
    use ircgraph_shared::SimpleConfig;
    use ircgraph_store::ContactEvent;
    use std::time::Duration;

    use super::*;

    const SERVER: &str = "irc.example.net";

    struct Fixture {
        session: Session<MemoryTransport>,
        transport: MemoryTransport,
        contacts: Rc<RefCell<ContactRegistry>>,
        model: Rc<RefCell<ContactModel>>,
        _sub: ircgraph_net::Subscription,
    }

    impl Fixture {
        fn new(autojoin: &[&str]) -> Self {
            let mut config = SimpleConfig::new();
            config.set_string(CONFIG_SECTION, "server", SERVER);
            config.set_string(CONFIG_SECTION, "nick", "alice");
            for channel in autojoin {
                config.set_bool_entry(CONFIG_SECTION, "autojoin", channel, true);
            }
            config.set_bool_entry(CONFIG_SECTION, "autojoin", "#disabled", false);

            let transport = MemoryTransport::new();
            let contacts = Rc::new(RefCell::new(ContactRegistry::new()));
            let model = Rc::new(RefCell::new(ContactModel::new(contacts.clone(), &config)));
            let mut session = Session::new(Rc::new(config), transport.clone()).unwrap();
            let sub = session.subscribe(&model, CONTACT_EVENTS);
            session.iterate(Duration::ZERO);

            Self {
                session,
                transport,
                contacts,
                model,
                _sub: sub,
            }
        }

        fn feed(&mut self, prefix: &str, command: &str, params: &[&str]) {
            self.transport
                .push_inbound(RawMessage::new(Some(prefix), command, params));
            self.session.iterate(Duration::ZERO);
        }

        fn welcome(&mut self, nick: &str) {
            self.feed(SERVER, "001", &[nick, "Welcome"]);
        }

        fn channel(&self, name: &str) -> ContactId {
            self.model.borrow().find_channel(name).unwrap()
        }

        fn user(&self, nick: &str) -> ContactId {
            self.model.borrow().find_user(nick).unwrap()
        }

        fn members(&self, channel: &str) -> Vec<ContactId> {
            let id = self.channel(channel);
            self.contacts.borrow().get(id).unwrap().members().to_vec()
        }
    }

    #[test]
    fn test_connect_builds_root_and_self() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");

        let model = fx.model.borrow();
        assert!(model.is_connected());
        let root = model.server_contact().unwrap();
        let me = model.self_contact().unwrap();

        let contacts = fx.contacts.borrow();
        let root_c = contacts.get(root).unwrap();
        assert_eq!(root_c.digest(), Some(hash_name(SERVER).unwrap()));
        assert!(root_c.has_tag(Tag::Root));
        assert_eq!(root_c.connection_state(), Some(ConnectionState::Direct));
        assert_eq!(root_c.display_name(), Some(SERVER));
        assert_eq!(root_c.self_ref(), Some(me));

        let me_c = contacts.get(me).unwrap();
        let expected = derive_child(&hash_name(SERVER).unwrap(), "alice").unwrap();
        assert_eq!(me_c.digest(), Some(expected));
        assert_eq!(me_c.parent(), Some(root));
        assert!(me_c.has_tag(Tag::SelfStrong));
        assert_eq!(me_c.user_name(), Some("alice"));
    }

    #[test]
    fn test_connect_notifications_distinguish_created() {
        let mut fx = Fixture::new(&[]);
        let mut rx = fx.contacts.borrow_mut().subscribe();
        fx.welcome("alice");
        let root = fx.model.borrow().server_contact().unwrap();
        let me = fx.model.borrow().self_contact().unwrap();
        assert_eq!(rx.try_recv().unwrap(), ContactEvent::Constructed(root));
        assert_eq!(rx.try_recv().unwrap(), ContactEvent::Constructed(me));

        fx.session.connect();
        fx.welcome("alice");
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&ContactEvent::Updated(root)));
        assert!(seen.contains(&ContactEvent::Updated(me)));
        assert!(!seen.iter().any(|e| matches!(e, ContactEvent::Constructed(_))));
    }

    #[test]
    fn test_reconnect_is_idempotent() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        let root = fx.model.borrow().server_contact().unwrap();
        let me = fx.model.borrow().self_contact().unwrap();

        fx.transport.drop_link();
        fx.session.iterate(Duration::ZERO);
        assert!(!fx.model.borrow().is_connected());
        assert_eq!(fx.model.borrow().server_contact(), None);
        assert_eq!(
            fx.contacts.borrow().get(root).unwrap().connection_state(),
            Some(ConnectionState::Disconnected)
        );

        fx.welcome("alice");
        assert_eq!(fx.model.borrow().server_contact(), Some(root));
        assert_eq!(fx.model.borrow().self_contact(), Some(me));
        assert_eq!(fx.contacts.borrow().len(), 2);
        assert_eq!(
            fx.contacts.borrow().get(root).unwrap().connection_state(),
            Some(ConnectionState::Direct)
        );
    }

    #[test]
    fn test_nick_change_between_connections_keeps_one_self() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        let old = fx.model.borrow().self_contact().unwrap();

        fx.session.connect();
        fx.welcome("alice_");
        let new = fx.model.borrow().self_contact().unwrap();
        assert_ne!(old, new);

        let contacts = fx.contacts.borrow();
        let strong: Vec<_> = contacts
            .iter()
            .filter(|c| c.has_tag(Tag::SelfStrong))
            .map(|c| c.id())
            .collect();
        assert_eq!(strong, vec![new]);
    }

    #[test]
    fn test_join_creates_channel_and_members() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("alice!a@h", "JOIN", &["#test"]);
        fx.feed("bob!b@h", "JOIN", &["#test"]);

        let channel = fx.channel("#test");
        let me = fx.model.borrow().self_contact().unwrap();
        let bob = fx.user("bob");
        assert_eq!(fx.members("#test"), vec![me, bob]);

        let contacts = fx.contacts.borrow();
        let c = contacts.get(channel).unwrap();
        assert!(c.has_tag(Tag::Big) && c.has_tag(Tag::Group));
        assert_eq!(c.connection_state(), Some(ConnectionState::Cloud));
        assert_eq!(c.self_ref(), Some(me));
        assert_eq!(c.parent(), fx.model.borrow().server_contact());

        let b = contacts.get(bob).unwrap();
        assert_eq!(b.connection_state(), Some(ConnectionState::Cloud));
        assert_eq!(b.self_ref(), Some(me));
        assert_eq!(
            contacts.get(me).unwrap().connection_state(),
            Some(ConnectionState::Direct)
        );
    }

    #[test]
    fn test_repeated_join_is_silent() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("bob", "JOIN", &["#test"]);
        let mut rx = fx.contacts.borrow_mut().subscribe();

        fx.feed("bob", "JOIN", &["#test"]);
        assert!(rx.try_recv().is_err());
        assert_eq!(fx.members("#test").len(), 1);
    }

    #[test]
    fn test_join_without_origin_leaves_graph_alone() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        let before = fx.contacts.borrow().len();
        let mut rx = fx.contacts.borrow_mut().subscribe();

        fx.transport
            .push_inbound(RawMessage::new(None, "JOIN", &["#ghost"]));
        fx.session.iterate(Duration::ZERO);

        assert_eq!(fx.contacts.borrow().len(), before);
        assert!(fx.model.borrow().find_channel("#ghost").is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_names_reply() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("alice", "JOIN", &["#test"]);
        fx.feed(SERVER, "353", &["alice", "=", "#test", "@op +voiced  ~~odd alice"]);

        let members = fx.members("#test");
        assert_eq!(members.len(), 4);
        assert!(members.contains(&fx.user("op")));
        assert!(members.contains(&fx.user("voiced")));
        assert!(members.contains(&fx.user("~odd")));
    }

    #[test]
    fn test_malformed_names_reply_is_ignored() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("alice", "JOIN", &["#test"]);
        let before = fx.contacts.borrow().len();

        fx.feed(SERVER, "353", &["alice", "!", "#test", "bob"]);
        fx.feed(SERVER, "353", &["alice", "#test", "bob"]);
        fx.feed(SERVER, "353", &["alice", "=", "#nowhere", "bob"]);
        assert_eq!(fx.contacts.borrow().len(), before);
    }

    #[test]
    fn test_topics() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("alice", "JOIN", &["#test"]);

        fx.feed(SERVER, "332", &["alice", "#test", "first topic"]);
        let channel = fx.channel("#test");
        assert_eq!(
            fx.contacts.borrow().get(channel).unwrap().status_text(),
            Some("first topic")
        );

        fx.feed("bob", "TOPIC", &["#test", "second"]);
        assert_eq!(
            fx.contacts.borrow().get(channel).unwrap().status_text(),
            Some("second")
        );

        fx.feed("bob", "TOPIC", &["#unknown", "ignored"]);
        fx.feed("bob", "TOPIC", &["#test", "third", "extra"]);
        fx.feed(SERVER, "332", &["alice", "#test"]);
        assert_eq!(
            fx.contacts.borrow().get(channel).unwrap().status_text(),
            Some("second")
        );
    }

    #[test]
    fn test_part_and_kick() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("bob", "JOIN", &["#test"]);
        fx.feed("carol", "JOIN", &["#test"]);
        assert_eq!(fx.members("#test").len(), 2);

        fx.feed("bob", "PART", &["#test"]);
        fx.feed("bob", "PART", &["#test"]);
        fx.feed("op", "KICK", &["#test", "carol", "bye"]);
        assert!(fx.members("#test").is_empty());
    }

    #[test]
    fn test_part_never_creates() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        let before = fx.contacts.borrow().len();
        fx.feed("ghost", "PART", &["#nowhere"]);
        fx.feed("alice", "JOIN", &["#test"]);
        fx.feed("ghost", "PART", &["#test"]);
        assert_eq!(fx.contacts.borrow().len(), before + 1);
    }

    #[test]
    fn test_quit_keeps_membership() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("bob", "JOIN", &["#test"]);
        fx.feed("bob", "QUIT", &["Leaving"]);
        fx.feed("alice", "QUIT", &["self"]);

        let bob = fx.user("bob");
        let me = fx.model.borrow().self_contact().unwrap();
        let contacts = fx.contacts.borrow();
        assert_eq!(
            contacts.get(bob).unwrap().connection_state(),
            Some(ConnectionState::Disconnected)
        );
        assert_eq!(
            contacts.get(me).unwrap().connection_state(),
            Some(ConnectionState::Direct)
        );
        drop(contacts);
        assert_eq!(fx.members("#test"), vec![bob]);
    }

    #[test]
    fn test_join_queue_and_resync() {
        let mut fx = Fixture::new(&["#auto"]);
        {
            let mut model = fx.model.borrow_mut();
            assert!(model.join(&mut fx.session, "#queued"));
            assert!(model.join(&mut fx.session, "#auto"));
            assert!(!model.join(&mut fx.session, ""));
        }
        assert!(fx.transport.sent().is_empty());

        fx.welcome("alice");
        assert_eq!(
            fx.transport.sent(),
            vec![
                OutboundCommand::Join { channel: "#auto".into() },
                OutboundCommand::Join { channel: "#queued".into() },
            ]
        );
        assert_eq!(fx.model.borrow().pending_joins().count(), 0);

        fx.feed("alice", "JOIN", &["#auto"]);
        fx.feed("alice", "JOIN", &["#other"]);
        fx.transport.clear_sent();

        fx.session.connect();
        fx.model.borrow_mut().join(&mut fx.session, "#late");
        fx.welcome("alice");
        assert_eq!(
            fx.transport.sent(),
            vec![
                OutboundCommand::Join { channel: "#late".into() },
                OutboundCommand::Join { channel: "#auto".into() },
                OutboundCommand::Join { channel: "#other".into() },
            ]
        );
    }

    #[test]
    fn test_join_while_connected_is_immediate() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        let mut model = fx.model.borrow_mut();
        assert!(model.join(&mut fx.session, "#now"));
        assert_eq!(
            fx.transport.sent(),
            vec![OutboundCommand::Join { channel: "#now".into() }]
        );
    }

    #[test]
    fn test_find_by_name_uses_prefix() {
        let mut fx = Fixture::new(&[]);
        fx.welcome("alice");
        fx.feed("bob", "JOIN", &["#test"]);

        let model = fx.model.borrow();
        assert_eq!(model.find_by_name("#test"), model.find_channel("#test"));
        assert_eq!(model.find_by_name("bob"), model.find_user("bob"));
        assert_eq!(model.find_by_name("#bob"), None);
        assert_eq!(model.find_by_name(""), None);
    }

    #[test]
    fn test_events_before_connect_are_ignored() {
        let mut fx = Fixture::new(&[]);
        fx.feed("bob", "JOIN", &["#test"]);
        fx.feed("bob", "QUIT", &[]);
        assert!(fx.contacts.borrow().is_empty());
    }
}

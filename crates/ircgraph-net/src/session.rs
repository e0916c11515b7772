//! Connection lifecycle and synchronous event dispatch.
//!
//! A [`Session`] owns the single link to one server and is driven by
//! [`Session::iterate`]. Every raw message drained during a tick is
//! normalized and handed to the interested subscribers, one after another,
//! before the next message is looked at.
//!
//! Subscribers receive `&mut dyn Commands` alongside each event so they can
//! issue joins and messages while the session is dispatching to them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use ircgraph_shared::constants::{
    POLL_WAIT, RECONNECT_COOLDOWN, TICK_DELAY_BUSY, TICK_DELAY_IDLE, TICK_DELAY_RECONNECTING,
};
use ircgraph_shared::ConfigModel;

use crate::error::SessionError;
use crate::events::{normalize, EventKind, EventPayload, SessionEvent};
use crate::settings::{connect_target, generate_guest_nick, Endpoint};
use crate::transport::{OutboundCommand, Transport};

// ---------------------------------------------------------------------------
// Commands / subscribers
// ---------------------------------------------------------------------------

/// Outbound side of a session, as seen by callers and subscribers.
///
/// Command methods return `false` when the command could not be issued;
/// the failure has already been logged.
pub trait Commands {
    fn server_name(&self) -> &str;
    /// Our current nick on the server.
    fn nick(&self) -> &str;
    fn is_connected(&self) -> bool;
    fn join(&mut self, channel: &str) -> bool;
    fn send_message(&mut self, target: &str, text: &str) -> bool;
    fn send_action(&mut self, target: &str, text: &str) -> bool;
}

pub trait EventHandler {
    fn on_event(&mut self, event: &SessionEvent, commands: &mut dyn Commands);
}

/// Keeps a subscriber registered. Dropping it stops delivery immediately.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes the handler"]
pub struct Subscription {
    _token: Rc<()>,
}

struct SubscriberEntry {
    kinds: Vec<EventKind>,
    handler: Weak<RefCell<dyn EventHandler>>,
    token: Weak<()>,
}

impl SubscriberEntry {
    fn is_alive(&self) -> bool {
        self.token.strong_count() > 0 && self.handler.strong_count() > 0
    }
}

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected.
    Idle,
    /// Last attempt failed; `cooldown` is left before the next one.
    ConnectingRetry { cooldown: Duration },
    Connected,
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

struct Link<T> {
    transport: T,
    server_name: String,
    nick: String,
}

impl<T: Transport> Link<T> {
    fn issue(&mut self, command: OutboundCommand) -> bool {
        if !self.transport.is_connected() {
            warn!(command = ?command, "Cannot issue command while disconnected");
            return false;
        }
        match self.transport.send(command) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to issue command");
                false
            }
        }
    }
}

impl<T: Transport> Commands for Link<T> {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    fn nick(&self) -> &str {
        &self.nick
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn join(&mut self, channel: &str) -> bool {
        debug!(channel, "Joining channel");
        self.issue(OutboundCommand::Join {
            channel: channel.to_string(),
        })
    }

    fn send_message(&mut self, target: &str, text: &str) -> bool {
        self.issue(OutboundCommand::Message {
            target: target.to_string(),
            text: text.to_string(),
        })
    }

    fn send_action(&mut self, target: &str, text: &str) -> bool {
        self.issue(OutboundCommand::Action {
            target: target.to_string(),
            text: text.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session<T: Transport> {
    config: Rc<dyn ConfigModel>,
    endpoint: Endpoint,
    guest_nick: String,
    link: Link<T>,
    state: SessionState,
    subscribers: Vec<SubscriberEntry>,
}

impl<T: Transport> Session<T> {
    /// Bind a session to the configured server. Nothing is opened until the
    /// first [`iterate`](Self::iterate) or [`connect`](Self::connect).
    pub fn new(config: Rc<dyn ConfigModel>, transport: T) -> Result<Self, SessionError> {
        let endpoint = Endpoint::from_config(config.as_ref())?;
        let guest_nick = generate_guest_nick();
        let link = Link {
            transport,
            server_name: endpoint.server_name().to_string(),
            nick: guest_nick.clone(),
        };
        Ok(Self {
            config,
            endpoint,
            guest_nick,
            link,
            state: SessionState::Idle,
            subscribers: Vec::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &Rc<dyn ConfigModel> {
        &self.config
    }

    /// Register `handler` for `kinds`. Delivery lasts as long as both the
    /// returned [`Subscription`] and the handler are alive.
    pub fn subscribe<H>(&mut self, handler: &Rc<RefCell<H>>, kinds: &[EventKind]) -> Subscription
    where
        H: EventHandler + 'static,
    {
        let token = Rc::new(());
        let handler: Rc<RefCell<dyn EventHandler>> = handler.clone();
        self.subscribers.push(SubscriberEntry {
            kinds: kinds.to_vec(),
            handler: Rc::downgrade(&handler),
            token: Rc::downgrade(&token),
        });
        Subscription { _token: token }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|s| s.is_alive()).count()
    }

    /// Drop any current link and open a new one.
    ///
    /// Subscribers see a `Disconnect` first if the session was connected.
    /// Failure is not an error: the session enters its retry backoff.
    pub fn connect(&mut self) {
        if self.state == SessionState::Connected {
            self.raise_disconnect();
        }
        self.open();
    }

    /// Drive the session one step. Returns the suggested delay before the
    /// next call.
    pub fn iterate(&mut self, delta: Duration) -> Duration {
        match self.state {
            SessionState::Idle => {
                self.open();
                TICK_DELAY_RECONNECTING
            }
            SessionState::ConnectingRetry { cooldown } => {
                let remaining = cooldown.saturating_sub(delta);
                if remaining.is_zero() {
                    self.open();
                } else {
                    self.state = SessionState::ConnectingRetry {
                        cooldown: remaining,
                    };
                }
                TICK_DELAY_RECONNECTING
            }
            SessionState::Connected if !self.link.transport.is_connected() => {
                info!(server = %self.endpoint.server_name(), "Connection lost");
                self.raise_disconnect();
                self.open();
                TICK_DELAY_RECONNECTING
            }
            SessionState::Connected => self.pump(),
        }
    }

    fn open(&mut self) {
        self.link.transport.close();
        let target = connect_target(self.config.as_ref(), &self.endpoint, &self.guest_nick);
        self.link.nick = target.nick.clone();

        match self.link.transport.connect(&target) {
            Ok(()) => {
                info!(
                    host = %target.host,
                    port = target.port,
                    tls = target.tls,
                    nick = %target.nick,
                    "Connected"
                );
                self.state = SessionState::Connected;
            }
            Err(e) => {
                warn!(
                    host = %target.host,
                    port = target.port,
                    error = %e,
                    "Connection attempt failed, retrying later"
                );
                self.link.transport.close();
                self.state = SessionState::ConnectingRetry {
                    cooldown: RECONNECT_COOLDOWN,
                };
            }
        }
    }

    fn pump(&mut self) -> Duration {
        let messages = match self.link.transport.poll(POLL_WAIT) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "Transient I/O error while polling");
                return TICK_DELAY_BUSY;
            }
        };
        if messages.is_empty() {
            return TICK_DELAY_IDLE;
        }

        for raw in &messages {
            for event in normalize(raw, &self.link.nick) {
                self.track_nick(&event);
                self.dispatch(&event);
            }
        }
        TICK_DELAY_BUSY
    }

    fn track_nick(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Connect(payload) => {
                if let Some(nick) = payload.param(0) {
                    self.link.nick = nick.to_string();
                }
            }
            SessionEvent::Nick(payload) if payload.origin == self.link.nick => {
                if let Some(nick) = payload.param(0).filter(|n| !n.is_empty()) {
                    debug!(old = %payload.origin, new = nick, "Own nick changed");
                    self.link.nick = nick.to_string();
                }
            }
            _ => {}
        }
    }

    fn raise_disconnect(&mut self) {
        let event = SessionEvent::Disconnect(EventPayload {
            origin: self.endpoint.server_name().to_string(),
            params: Vec::new(),
        });
        self.dispatch(&event);
    }

    fn dispatch(&mut self, event: &SessionEvent) {
        let kind = event.kind();
        let Self {
            link, subscribers, ..
        } = self;

        for entry in subscribers.iter() {
            // A subscription released by an earlier handler for this very
            // event must not be delivered to.
            if entry.token.strong_count() == 0 || !entry.kinds.contains(&kind) {
                continue;
            }
            let Some(handler) = entry.handler.upgrade() else {
                continue;
            };
            match handler.try_borrow_mut() {
                Ok(mut handler) => handler.on_event(event, &mut *link),
                Err(_) => warn!(kind = ?kind, "Subscriber already borrowed, event skipped"),
            };
        }

        subscribers.retain(SubscriberEntry::is_alive);
    }
}

impl<T: Transport> Commands for Session<T> {
    fn server_name(&self) -> &str {
        self.link.server_name()
    }

    fn nick(&self) -> &str {
        self.link.nick()
    }

    fn is_connected(&self) -> bool {
        self.state == SessionState::Connected && self.link.is_connected()
    }

    fn join(&mut self, channel: &str) -> bool {
        self.link.join(channel)
    }

    fn send_message(&mut self, target: &str, text: &str) -> bool {
        self.link.send_message(target, text)
    }

    fn send_action(&mut self, target: &str, text: &str) -> bool {
        self.link.send_action(target, text)
    }
}

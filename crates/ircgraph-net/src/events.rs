//! Typed session events and the normalization from raw protocol messages.

use ircgraph_shared::constants::RPL_WELCOME;
use ircgraph_shared::names::{is_channel_name, nick_from_origin};

use crate::transport::RawMessage;

const CTCP_DELIM: char = '\x01';

/// Closed set of event kinds a subscriber can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    Nick,
    Quit,
    Join,
    Part,
    Mode,
    UserMode,
    Topic,
    Kick,
    ChannelMessage,
    PrivateMessage,
    Notice,
    ChannelNotice,
    Invite,
    CtcpRequest,
    CtcpReply,
    CtcpAction,
    Numeric,
    Unknown,
}

impl EventKind {
    pub const ALL: [EventKind; 20] = [
        EventKind::Connect,
        EventKind::Disconnect,
        EventKind::Nick,
        EventKind::Quit,
        EventKind::Join,
        EventKind::Part,
        EventKind::Mode,
        EventKind::UserMode,
        EventKind::Topic,
        EventKind::Kick,
        EventKind::ChannelMessage,
        EventKind::PrivateMessage,
        EventKind::Notice,
        EventKind::ChannelNotice,
        EventKind::Invite,
        EventKind::CtcpRequest,
        EventKind::CtcpReply,
        EventKind::CtcpAction,
        EventKind::Numeric,
        EventKind::Unknown,
    ];
}

/// Origin and ordered parameters shared by every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPayload {
    pub origin: String,
    pub params: Vec<String>,
}

impl EventPayload {
    pub fn new(origin: &str, params: &[&str]) -> Self {
        Self {
            origin: origin.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Registration finished; `params[0]` is our nick.
    Connect(EventPayload),
    /// The connection dropped. Raised once per drop.
    Disconnect(EventPayload),
    Nick(EventPayload),
    Quit(EventPayload),
    Join(EventPayload),
    Part(EventPayload),
    Mode(EventPayload),
    UserMode(EventPayload),
    Topic(EventPayload),
    Kick(EventPayload),
    /// `[channel, text]`
    ChannelMessage(EventPayload),
    /// `[receiver, text]`
    PrivateMessage(EventPayload),
    Notice(EventPayload),
    ChannelNotice(EventPayload),
    Invite(EventPayload),
    /// `[request]`, e.g. `VERSION`
    CtcpRequest(EventPayload),
    CtcpReply(EventPayload),
    /// `[receiver, text]`
    CtcpAction(EventPayload),
    Numeric { code: u32, payload: EventPayload },
    /// `[command, params...]`
    Unknown(EventPayload),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Connect(_) => EventKind::Connect,
            SessionEvent::Disconnect(_) => EventKind::Disconnect,
            SessionEvent::Nick(_) => EventKind::Nick,
            SessionEvent::Quit(_) => EventKind::Quit,
            SessionEvent::Join(_) => EventKind::Join,
            SessionEvent::Part(_) => EventKind::Part,
            SessionEvent::Mode(_) => EventKind::Mode,
            SessionEvent::UserMode(_) => EventKind::UserMode,
            SessionEvent::Topic(_) => EventKind::Topic,
            SessionEvent::Kick(_) => EventKind::Kick,
            SessionEvent::ChannelMessage(_) => EventKind::ChannelMessage,
            SessionEvent::PrivateMessage(_) => EventKind::PrivateMessage,
            SessionEvent::Notice(_) => EventKind::Notice,
            SessionEvent::ChannelNotice(_) => EventKind::ChannelNotice,
            SessionEvent::Invite(_) => EventKind::Invite,
            SessionEvent::CtcpRequest(_) => EventKind::CtcpRequest,
            SessionEvent::CtcpReply(_) => EventKind::CtcpReply,
            SessionEvent::CtcpAction(_) => EventKind::CtcpAction,
            SessionEvent::Numeric { .. } => EventKind::Numeric,
            SessionEvent::Unknown(_) => EventKind::Unknown,
        }
    }

    pub fn payload(&self) -> &EventPayload {
        match self {
            SessionEvent::Connect(p)
            | SessionEvent::Disconnect(p)
            | SessionEvent::Nick(p)
            | SessionEvent::Quit(p)
            | SessionEvent::Join(p)
            | SessionEvent::Part(p)
            | SessionEvent::Mode(p)
            | SessionEvent::UserMode(p)
            | SessionEvent::Topic(p)
            | SessionEvent::Kick(p)
            | SessionEvent::ChannelMessage(p)
            | SessionEvent::PrivateMessage(p)
            | SessionEvent::Notice(p)
            | SessionEvent::ChannelNotice(p)
            | SessionEvent::Invite(p)
            | SessionEvent::CtcpRequest(p)
            | SessionEvent::CtcpReply(p)
            | SessionEvent::CtcpAction(p)
            | SessionEvent::Unknown(p) => p,
            SessionEvent::Numeric { payload, .. } => payload,
        }
    }
}

/// Turn one raw message into the events it raises.
///
/// `own_nick` fills in the Connect payload when the welcome reply carries no
/// nick. Most messages raise exactly one event; the welcome reply raises
/// `Connect` followed by its `Numeric`.
pub fn normalize(raw: &RawMessage, own_nick: &str) -> Vec<SessionEvent> {
    let origin = raw.prefix.as_deref().map(nick_from_origin).unwrap_or_default();
    let payload = EventPayload {
        origin: origin.to_string(),
        params: raw.params.clone(),
    };

    if let Some(code) = parse_numeric(&raw.command) {
        let mut events = Vec::with_capacity(2);
        if code == RPL_WELCOME {
            let mut connect = payload.clone();
            if connect.params.first().map_or(true, |nick| nick.is_empty()) {
                connect.params = vec![own_nick.to_string()];
            }
            events.push(SessionEvent::Connect(connect));
        }
        events.push(SessionEvent::Numeric { code, payload });
        return events;
    }

    let command = raw.command.to_ascii_uppercase();
    let ctcp = ctcp_body(&payload).map(str::to_string);
    let event = match command.as_str() {
        "PRIVMSG" => match ctcp.as_deref() {
            Some(body) => match body.strip_prefix("ACTION") {
                Some(rest) if rest.is_empty() || rest.starts_with(' ') => {
                    SessionEvent::CtcpAction(EventPayload {
                        origin: payload.origin.clone(),
                        params: vec![
                            payload.params[0].clone(),
                            rest.trim_start_matches(' ').to_string(),
                        ],
                    })
                }
                _ => SessionEvent::CtcpRequest(EventPayload {
                    origin: payload.origin.clone(),
                    params: vec![body.to_string()],
                }),
            },
            None if targets_channel(&payload) => SessionEvent::ChannelMessage(payload),
            None => SessionEvent::PrivateMessage(payload),
        },
        "NOTICE" => match ctcp.as_deref() {
            Some(body) => SessionEvent::CtcpReply(EventPayload {
                origin: payload.origin.clone(),
                params: vec![body.to_string()],
            }),
            None if targets_channel(&payload) => SessionEvent::ChannelNotice(payload),
            None => SessionEvent::Notice(payload),
        },
        "MODE" if targets_channel(&payload) => SessionEvent::Mode(payload),
        "MODE" => SessionEvent::UserMode(payload),
        "NICK" => SessionEvent::Nick(payload),
        "QUIT" => SessionEvent::Quit(payload),
        "JOIN" => SessionEvent::Join(payload),
        "PART" => SessionEvent::Part(payload),
        "TOPIC" => SessionEvent::Topic(payload),
        "KICK" => SessionEvent::Kick(payload),
        "INVITE" => SessionEvent::Invite(payload),
        _ => {
            let mut params = Vec::with_capacity(payload.params.len() + 1);
            params.push(raw.command.clone());
            params.extend(payload.params);
            SessionEvent::Unknown(EventPayload {
                origin: payload.origin,
                params,
            })
        }
    };
    vec![event]
}

fn parse_numeric(command: &str) -> Option<u32> {
    if command.len() == 3 && command.bytes().all(|b| b.is_ascii_digit()) {
        command.parse().ok()
    } else {
        None
    }
}

fn targets_channel(payload: &EventPayload) -> bool {
    payload.param(0).is_some_and(is_channel_name)
}

/// The text between the CTCP delimiters of `params[1]`, if it is CTCP.
fn ctcp_body(payload: &EventPayload) -> Option<&str> {
    let text = payload.param(1)?;
    text.strip_prefix(CTCP_DELIM)?.strip_suffix(CTCP_DELIM)
}

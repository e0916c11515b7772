//! Seam to the wire collaborator.
//!
//! Framing, line parsing and command syntax live behind [`Transport`]; the
//! session only sees parsed [`RawMessage`]s coming in and typed
//! [`OutboundCommand`]s going out.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to open one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub nick: String,
    pub username: String,
    pub realname: String,
}

/// One protocol message as parsed by the wire layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// `nick!user@host` or a server name; absent for messages without prefix.
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl RawMessage {
    pub fn new(prefix: Option<&str>, command: &str, params: &[&str]) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            command: command.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    Join { channel: String },
    Message { target: String, text: String },
    Action { target: String, text: String },
}

pub trait Transport {
    /// Open a connection. Implementations drop any previous socket first.
    fn connect(&mut self, target: &ConnectTarget) -> Result<(), TransportError>;

    /// Tear down the socket. Idempotent.
    fn close(&mut self);

    fn is_connected(&self) -> bool;

    /// Wait at most `wait` for readiness, then return every message that
    /// became available.
    fn poll(&mut self, wait: Duration) -> Result<Vec<RawMessage>, TransportError>;

    fn send(&mut self, command: OutboundCommand) -> Result<(), TransportError>;
}

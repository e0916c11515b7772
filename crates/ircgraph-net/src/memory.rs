//! In-process [`Transport`] used by tests and offline runs.
//!
//! Clones share one state, so a test keeps a handle to feed inbound messages
//! and inspect what the session sent while the session owns another.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

use crate::transport::{ConnectTarget, OutboundCommand, RawMessage, Transport, TransportError};

#[derive(Debug, Default)]
struct MemoryState {
    connected: bool,
    refuse: bool,
    fail_next_poll: bool,
    reject_sends: bool,
    connect_attempts: usize,
    last_target: Option<ConnectTarget>,
    inbound: VecDeque<RawMessage>,
    sent: Vec<OutboundCommand>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the next poll.
    pub fn push_inbound(&self, message: RawMessage) {
        self.state.borrow_mut().inbound.push_back(message);
    }

    /// Make every following `connect` fail until reset.
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.borrow_mut().refuse = refuse;
    }

    /// Simulate the peer closing the socket.
    pub fn drop_link(&self) {
        let mut state = self.state.borrow_mut();
        state.connected = false;
        state.inbound.clear();
    }

    /// The next poll returns an I/O error instead of messages.
    pub fn fail_next_poll(&self) {
        self.state.borrow_mut().fail_next_poll = true;
    }

    pub fn reject_sends(&self, reject: bool) {
        self.state.borrow_mut().reject_sends = reject;
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.borrow().connect_attempts
    }

    pub fn last_target(&self) -> Option<ConnectTarget> {
        self.state.borrow().last_target.clone()
    }

    pub fn sent(&self) -> Vec<OutboundCommand> {
        self.state.borrow().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.state.borrow_mut().sent.clear();
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, target: &ConnectTarget) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.connect_attempts += 1;
        state.last_target = Some(target.clone());
        if state.refuse {
            state.connected = false;
            return Err(TransportError::Refused(format!("{}:{}", target.host, target.port)));
        }
        state.connected = true;
        trace!(host = %target.host, port = target.port, "Memory link opened");
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        state.connected = false;
        state.inbound.clear();
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    fn poll(&mut self, _wait: Duration) -> Result<Vec<RawMessage>, TransportError> {
        let mut state = self.state.borrow_mut();
        if std::mem::take(&mut state.fail_next_poll) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "injected poll failure",
            )));
        }
        if !state.connected {
            return Ok(Vec::new());
        }
        Ok(state.inbound.drain(..).collect())
    }

    fn send(&mut self, command: OutboundCommand) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.reject_sends {
            return Err(TransportError::Rejected(format!("{command:?}")));
        }
        state.sent.push(command);
        Ok(())
    }
}

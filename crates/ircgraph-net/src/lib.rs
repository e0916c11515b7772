// IRC session layer: connection lifecycle, event normalization and dispatch.

pub mod error;
pub mod events;
pub mod memory;
pub mod session;
pub mod settings;
pub mod transport;

pub use error::SessionError;
pub use events::{normalize, EventKind, EventPayload, SessionEvent};
pub use memory::MemoryTransport;
pub use session::{Commands, EventHandler, Session, SessionState, Subscription};
pub use settings::Endpoint;
pub use transport::{ConnectTarget, OutboundCommand, RawMessage, Transport, TransportError};

//! # ircgraph-client
//!
//! Keeps a contact graph and message stores in sync with one IRC session.
//!
//! * [`ContactModel`] maps session events onto servers, channels and users.
//! * [`MessageRouter`] records inbound chat and sends outbound text.
//! * [`Bridge`] owns both, plus the session, on a single tick driver.

pub mod bridge;
pub mod contacts;
pub mod logging;
pub mod router;

pub use bridge::Bridge;
pub use contacts::ContactModel;
pub use router::MessageRouter;

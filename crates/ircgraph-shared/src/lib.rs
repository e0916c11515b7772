// Types shared by every ircgraph crate: identities, names, config and errors.

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod names;
pub mod types;

pub use config::{ConfigModel, SimpleConfig};
pub use error::{ConfigError, DigestError};
pub use identity::ServerIdentity;
pub use names::NameKind;
pub use types::{ConnectionState, Digest};

//! Connection settings read from the `IRCClient` config section.
//!
//! * `server` (required). A leading `#` requests TLS; the configured string
//!   stays the server name used for identities.
//! * `port`, default [`DEFAULT_PORT`].
//! * `nick`, default `guest_NNNN`. The guest nick is generated once per
//!   session so reconnects keep the same self identity.
//! * `username` / `realname`, default `<nick>_` / `<username>_`.

use rand::Rng;
use tracing::warn;

use ircgraph_shared::constants::{CONFIG_SECTION, DEFAULT_PORT, GUEST_NICK_PREFIX, TLS_SERVER_MARKER};
use ircgraph_shared::{ConfigError, ConfigModel};

use crate::transport::ConnectTarget;

/// The endpoint a session is bound to for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    server_name: String,
    host: String,
    tls: bool,
}

impl Endpoint {
    pub fn from_config(config: &dyn ConfigModel) -> Result<Self, ConfigError> {
        let server = config
            .get_string(CONFIG_SECTION, "server")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::missing(CONFIG_SECTION, "server"))?;
        Self::parse(&server)
    }

    pub fn parse(server: &str) -> Result<Self, ConfigError> {
        let (host, tls) = match server.strip_prefix(TLS_SERVER_MARKER) {
            Some(host) => (host, true),
            None => (server, false),
        };
        if host.is_empty() {
            return Err(ConfigError::Invalid {
                section: CONFIG_SECTION.to_string(),
                key: "server".to_string(),
                reason: "empty host".to_string(),
            });
        }
        Ok(Self {
            server_name: server.to_string(),
            host: host.to_string(),
            tls,
        })
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn tls(&self) -> bool {
        self.tls
    }
}

pub fn generate_guest_nick() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{GUEST_NICK_PREFIX}{n}")
}

/// Resolve the per-connection settings, falling back to `guest_nick`.
pub fn connect_target(config: &dyn ConfigModel, endpoint: &Endpoint, guest_nick: &str) -> ConnectTarget {
    let port = match config.get_int(CONFIG_SECTION, "port") {
        None => DEFAULT_PORT,
        Some(value) => u16::try_from(value).unwrap_or_else(|_| {
            warn!(value, "Invalid port in config, using default");
            DEFAULT_PORT
        }),
    };

    let nick = non_empty(config.get_string(CONFIG_SECTION, "nick"))
        .unwrap_or_else(|| guest_nick.to_string());
    let username = non_empty(config.get_string(CONFIG_SECTION, "username"))
        .unwrap_or_else(|| format!("{nick}_"));
    let realname = non_empty(config.get_string(CONFIG_SECTION, "realname"))
        .unwrap_or_else(|| format!("{username}_"));

    ConnectTarget {
        host: endpoint.host().to_string(),
        port,
        tls: endpoint.tls(),
        nick,
        username,
        realname,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

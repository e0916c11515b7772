use std::time::Duration;

/// Configuration section holding every client setting
pub const CONFIG_SECTION: &str = "IRCClient";

/// Port used when the configuration does not name one
pub const DEFAULT_PORT: u16 = 6660;

/// Prefix for generated guest nicks (`guest_NNNN`)
pub const GUEST_NICK_PREFIX: &str = "guest_";

/// A configured server starting with this character requests TLS
pub const TLS_SERVER_MARKER: char = '#';

/// BLAKE3 output size in bytes
pub const DIGEST_SIZE: usize = 32;

/// Channel name prefixes (RFC 1459 1.3: `&` local, `#` regular; RFC 2812 1.3: `+`, `!`)
pub const CHANNEL_PREFIXES: &[char] = &['&', '#', '+', '!'];

/// Membership prefixes in name lists: founder, protected, operator, half-op, voice
pub const MEMBERSHIP_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// Channel visibility markers in `RPL_NAMREPLY`: public, secret, private
pub const CHANNEL_VISIBILITY_MARKERS: &[&str] = &["=", "@", "*"];

/// Numeric replies the contact model consumes
pub const RPL_WELCOME: u32 = 1;
pub const RPL_TOPIC: u32 = 332;
pub const RPL_NAMREPLY: u32 = 353;

/// Wait before retrying a failed connection attempt
pub const RECONNECT_COOLDOWN: Duration = Duration::from_secs(20);

/// Suggested tick delays returned by the session loop
pub const TICK_DELAY_RECONNECTING: Duration = Duration::from_millis(500);
pub const TICK_DELAY_BUSY: Duration = Duration::from_millis(100);
pub const TICK_DELAY_IDLE: Duration = Duration::from_secs(1);

/// Upper bound of the socket readiness wait inside one tick
pub const POLL_WAIT: Duration = Duration::from_millis(1);

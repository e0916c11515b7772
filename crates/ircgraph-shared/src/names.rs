//! Classification helpers for protocol-level names.

use crate::constants::{CHANNEL_PREFIXES, MEMBERSHIP_PREFIXES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Channel,
    User,
}

/// Channel if the name starts with a channel prefix, user otherwise.
pub fn classify(name: &str) -> NameKind {
    if is_channel_name(name) {
        NameKind::Channel
    } else {
        NameKind::User
    }
}

pub fn is_channel_name(name: &str) -> bool {
    name.starts_with(CHANNEL_PREFIXES)
}

/// Strip at most one membership prefix (`~&@%+`) from a name-list token.
pub fn strip_membership_prefix(token: &str) -> &str {
    token.strip_prefix(MEMBERSHIP_PREFIXES).unwrap_or(token)
}

/// `nick!user@host` -> `nick`. Server origins pass through untouched.
pub fn nick_from_origin(origin: &str) -> &str {
    match origin.find('!') {
        Some(pos) => &origin[..pos],
        None => origin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("#rust"), NameKind::Channel);
        assert_eq!(classify("&local"), NameKind::Channel);
        assert_eq!(classify("+modeless"), NameKind::Channel);
        assert_eq!(classify("!12345chan"), NameKind::Channel);
        assert_eq!(classify("alice"), NameKind::User);
        assert_eq!(classify(""), NameKind::User);
    }

    #[test]
    fn test_strip_only_one_prefix() {
        assert_eq!(strip_membership_prefix("@bob"), "bob");
        assert_eq!(strip_membership_prefix("~founder"), "founder");
        assert_eq!(strip_membership_prefix("@+both"), "+both");
        assert_eq!(strip_membership_prefix("plain"), "plain");
        assert_eq!(strip_membership_prefix("@"), "");
    }

    #[test]
    fn test_nick_from_origin() {
        assert_eq!(nick_from_origin("bob!~bob@host.example"), "bob");
        assert_eq!(nick_from_origin("irc.example.net"), "irc.example.net");
    }
}

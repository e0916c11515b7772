//! Key/value configuration consumed by the session and contact model.
//!
//! Values are addressed by `(section, key)`. Boolean entry lists (such as
//! `IRCClient/autojoin`) hold several named flags under one key.

use std::collections::BTreeMap;

use crate::constants::CONFIG_SECTION;

/// Read access to a configuration source.
pub trait ConfigModel {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_int(&self, section: &str, key: &str) -> Option<i64>;

    /// All `(entry, flag)` pairs stored under `(section, key)`, in insertion order.
    fn entries_bool(&self, section: &str, key: &str) -> Vec<(String, bool)>;

    fn has_string(&self, section: &str, key: &str) -> bool {
        self.get_string(section, key).is_some()
    }
}

type SectionKey = (String, String);

/// In-memory [`ConfigModel`].
#[derive(Debug, Clone, Default)]
pub struct SimpleConfig {
    strings: BTreeMap<SectionKey, String>,
    ints: BTreeMap<SectionKey, i64>,
    bool_entries: BTreeMap<SectionKey, Vec<(String, bool)>>,
}

impl SimpleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.strings
            .insert((section.to_string(), key.to_string()), value.into());
    }

    pub fn set_int(&mut self, section: &str, key: &str, value: i64) {
        self.ints.insert((section.to_string(), key.to_string()), value);
    }

    /// Set one named flag in a boolean entry list, replacing a previous value.
    pub fn set_bool_entry(&mut self, section: &str, key: &str, entry: &str, value: bool) {
        let entries = self
            .bool_entries
            .entry((section.to_string(), key.to_string()))
            .or_default();
        match entries.iter_mut().find(|(name, _)| name == entry) {
            Some((_, flag)) => *flag = value,
            None => entries.push((entry.to_string(), value)),
        }
    }

    /// Build a configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.apply_env();
        config
    }

    /// Overlay `IRCGRAPH_*` environment variables onto the `IRCClient` section.
    ///
    /// * `IRCGRAPH_SERVER`, `IRCGRAPH_NICK`, `IRCGRAPH_USERNAME`, `IRCGRAPH_REALNAME`
    /// * `IRCGRAPH_PORT` (integer)
    /// * `IRCGRAPH_AUTOJOIN` (comma separated channel list)
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (var, key) in [
            ("IRCGRAPH_SERVER", "server"),
            ("IRCGRAPH_NICK", "nick"),
            ("IRCGRAPH_USERNAME", "username"),
            ("IRCGRAPH_REALNAME", "realname"),
        ] {
            if let Some(value) = lookup(var) {
                if !value.is_empty() {
                    self.set_string(CONFIG_SECTION, key, value);
                }
            }
        }

        if let Some(port) = lookup("IRCGRAPH_PORT") {
            match port.parse::<i64>() {
                Ok(port) => self.set_int(CONFIG_SECTION, "port", port),
                Err(_) => {
                    tracing::warn!(value = %port, "Invalid IRCGRAPH_PORT, ignoring");
                }
            }
        }

        if let Some(channels) = lookup("IRCGRAPH_AUTOJOIN") {
            for channel in channels.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                self.set_bool_entry(CONFIG_SECTION, "autojoin", channel, true);
            }
        }
    }
}

impl ConfigModel for SimpleConfig {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.strings
            .get(&(section.to_string(), key.to_string()))
            .cloned()
    }

    fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        self.ints.get(&(section.to_string(), key.to_string())).copied()
    }

    fn entries_bool(&self, section: &str, key: &str) -> Vec<(String, bool)> {
        self.bool_entries
            .get(&(section.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_missing_values() {
        let config = SimpleConfig::new();
        assert!(!config.has_string(CONFIG_SECTION, "server"));
        assert_eq!(config.get_int(CONFIG_SECTION, "port"), None);
        assert!(config.entries_bool(CONFIG_SECTION, "autojoin").is_empty());
    }

    #[test]
    fn test_bool_entries_keep_order_and_replace() {
        let mut config = SimpleConfig::new();
        config.set_bool_entry(CONFIG_SECTION, "autojoin", "#b", true);
        config.set_bool_entry(CONFIG_SECTION, "autojoin", "#a", false);
        config.set_bool_entry(CONFIG_SECTION, "autojoin", "#b", false);

        assert_eq!(
            config.entries_bool(CONFIG_SECTION, "autojoin"),
            vec![("#b".to_string(), false), ("#a".to_string(), false)]
        );
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("IRCGRAPH_SERVER", "irc.example.net"),
            ("IRCGRAPH_PORT", "6697"),
            ("IRCGRAPH_NICK", ""),
            ("IRCGRAPH_AUTOJOIN", "#one, #two,,"),
        ]
        .into_iter()
        .collect();

        let mut config = SimpleConfig::new();
        config.apply_vars(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(
            config.get_string(CONFIG_SECTION, "server").as_deref(),
            Some("irc.example.net")
        );
        assert_eq!(config.get_int(CONFIG_SECTION, "port"), Some(6697));
        assert!(!config.has_string(CONFIG_SECTION, "nick"));
        assert_eq!(
            config.entries_bool(CONFIG_SECTION, "autojoin"),
            vec![("#one".to_string(), true), ("#two".to_string(), true)]
        );
    }

    #[test]
    fn test_invalid_port_is_skipped() {
        let mut config = SimpleConfig::new();
        config.apply_vars(|name| (name == "IRCGRAPH_PORT").then(|| "sixsixsixseven".to_string()));
        assert_eq!(config.get_int(CONFIG_SECTION, "port"), None);
    }
}

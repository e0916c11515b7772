use thiserror::Error;

use ircgraph_shared::ConfigError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A required connection setting is absent. The only fatal session error.
    #[error("Missing required config value {section}/{key}")]
    ConfigMissing { section: String, key: String },

    #[error("Invalid config: {0}")]
    Config(ConfigError),
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { section, key } => SessionError::ConfigMissing { section, key },
            other => SessionError::Config(other),
        }
    }
}

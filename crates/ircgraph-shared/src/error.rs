use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("Cannot derive an identity from an empty name")]
    EmptyInput,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required config value {section}/{key}")]
    Missing { section: String, key: String },

    #[error("Invalid config value {section}/{key}: {reason}")]
    Invalid {
        section: String,
        key: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing(section: &str, key: &str) -> Self {
        Self::Missing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

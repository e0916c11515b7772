use thiserror::Error;

use crate::models::ContactId;

/// Errors produced by the store layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The contact handle does not refer to a live contact.
    #[error("Unknown contact {0}")]
    UnknownContact(ContactId),

    /// A contact cannot be its own parent.
    #[error("Contact {0} cannot be its own parent")]
    SelfParent(ContactId),

    /// Linking would close a loop in the parent chain.
    #[error("Making {parent} the parent of {child} would create a cycle")]
    ParentCycle { child: ContactId, parent: ContactId },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

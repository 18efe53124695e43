//! Error types for tree construction, overlay resolution and row handling.
//!
//! Validation problems are not errors; they are reported through
//! [`Diagnostics`](crate::Diagnostics).

use thiserror::Error;

use crate::context::ContextId;
use crate::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Illegal state
    #[error("node {node} is locked and no session context is active")]
    LockedWithoutContext { node: NodeId },

    #[error("node {node} requires an active session context")]
    NoActiveContext { node: NodeId },

    #[error("tree is locked; structural change at node {node} rejected")]
    TreeLocked { node: NodeId },

    #[error("session context {context} outlived its parent context")]
    DetachedContext { context: ContextId },

    #[error("context {context} is not a live row of repeater {repeater}")]
    UnknownRowContext {
        repeater: NodeId,
        context: ContextId,
    },

    #[error("repeater {repeater} has duplicate row key {key}")]
    DuplicateRowKey { repeater: NodeId, key: String },

    #[error("repeater {repeater} row {index} has no identity property '{property}'")]
    MissingRowIdentity {
        repeater: NodeId,
        index: usize,
        property: String,
    },

    #[error("repeater {repeater} data source has no row at index {index}")]
    MissingRow { repeater: NodeId, index: usize },

    // Lookup
    #[error("node {id} missing")]
    MissingNode { id: NodeId },

    #[error("node {id} type mismatch; expected {expected}")]
    TypeMismatch { id: NodeId, expected: &'static str },

    // Illegal argument
    #[error("invalid value for {attribute}: {reason}")]
    InvalidArgument {
        attribute: &'static str,
        reason: String,
    },

    // Configuration
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_argument(attribute: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            attribute,
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Errors caused by programming mistakes around session scoping rather
    /// than by bad input.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            Self::LockedWithoutContext { .. }
                | Self::NoActiveContext { .. }
                | Self::TreeLocked { .. }
                | Self::DetachedContext { .. }
                | Self::UnknownRowContext { .. }
                | Self::DuplicateRowKey { .. }
                | Self::MissingRowIdentity { .. }
                | Self::MissingRow { .. }
        )
    }
}

use crate::id::{ConnectionId, NodeId};
use thiserror::Error;

/// Structural errors raised by [`crate::model::CanvasDocument`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("connection {0} links node {1} to itself")]
    SelfConnection(ConnectionId, NodeId),
}

/// Invalid editor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse editor config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid editor config: {0}")]
    Invalid(String),
}

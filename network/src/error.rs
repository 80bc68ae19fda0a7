use floodbench_types::{MessageId, NodeId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("peer {0} not found")]
    PeerNotFound(NodeId),

    #[error("cannot wire edges between {node_count} peer(s)")]
    TooFewPeers { node_count: usize },

    #[error("peer {node} has already seen message {message}")]
    AlreadySeen { node: NodeId, message: MessageId },

    #[error("invalid topology config: {0}")]
    InvalidConfig(String),
}

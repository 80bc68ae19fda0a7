//! Synthetic peer-to-peer networks for broadcast benchmarking.
//!
//! Builds peer populations with controlled degree distribution and drives a
//! single broadcast across them with real-time delay injection, recording on
//! every peer who delivered the message and when it was first seen.

pub mod broadcast;
pub mod error;
pub mod generator;
pub mod peer;
pub mod task_group;
pub mod topology;

pub use broadcast::{broadcast, BroadcastOutcome};
pub use error::NetworkError;
pub use generator::{
    generate_degree_bounded, generate_random, GenerationMode, RemovalPolicy, TopologyConfig,
};
pub use peer::{Delivery, Peer, PeerSnapshot};
pub use task_group::TaskGroup;
pub use topology::Topology;

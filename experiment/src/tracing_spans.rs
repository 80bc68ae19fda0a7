//! Span constructors shared by the sweep runner and the CLI.
//!
//! Consistent span names and fields make JSON logs of long sweeps easy to
//! filter per run.

use floodbench_types::{BroadcastStrategy, Delay};
use tracing::{debug_span, info_span, Span};

/// One sweep run: generate, broadcast, measure, record.
pub fn run_span(node_count: usize, strategy: BroadcastStrategy, max_node_delay: Delay) -> Span {
    info_span!("run", node_count, %strategy, max_delay = %max_node_delay)
}

/// Topology generation for a run.
pub fn generate_span(node_count: usize, mean_degree: usize) -> Span {
    debug_span!("generate", node_count, mean_degree)
}

/// Propagation of one broadcast across `peer_count` peers.
pub fn broadcast_span(strategy: BroadcastStrategy, peer_count: usize) -> Span {
    info_span!("propagate", %strategy, peer_count)
}

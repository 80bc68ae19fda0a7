//! Delivery metrics derived from per-peer relay state.
//!
//! For a topology of `N` peers and one message:
//!
//! - `recv_count`: total recorded arrivals, duplicates included.
//! - `dont_recv_count`: peers with no recorded sender. The originator always
//!   counts here, since it never receives from anyone.
//! - `recv_target = N - 1`.
//! - `duplicate_rate = recv_count / (recv_target - dont_recv_count + 1) - 1`
//! - `receiving_rate = (recv_target - dont_recv_count + 1) / recv_target`

use serde::{Deserialize, Serialize};
use std::time::Duration;

use floodbench_network::Topology;
use floodbench_types::{BroadcastStrategy, Delay, MessageId};

/// Raw arrival counts for one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryCounts {
    pub recv_count: usize,
    pub dont_recv_count: usize,
    pub recv_target: usize,
}

impl DeliveryCounts {
    pub fn collect(topology: &Topology, message: MessageId) -> Self {
        let mut recv_count = 0;
        let mut dont_recv_count = 0;
        for peer in topology.peers() {
            let senders = peer.received_from(message).len();
            recv_count += senders;
            if senders == 0 {
                dont_recv_count += 1;
            }
        }
        Self {
            recv_count,
            dont_recv_count,
            recv_target: topology.len().saturating_sub(1),
        }
    }

    /// Peers with at least one recorded sender.
    fn receivers(&self) -> usize {
        (self.recv_target + 1).saturating_sub(self.dont_recv_count)
    }

    /// Extra arrivals per receiving peer.
    ///
    /// Zero when no peer received anything, which covers both a single-peer
    /// network and an originator with no reachable neighbour.
    pub fn duplicate_rate(&self) -> f64 {
        match self.receivers() {
            0 => 0.0,
            receivers => self.recv_count as f64 / receivers as f64 - 1.0,
        }
    }

    /// Share of the target peers reached. A single-peer network counts as
    /// fully reached.
    pub fn receiving_rate(&self) -> f64 {
        if self.recv_target == 0 {
            return 1.0;
        }
        self.receivers() as f64 / self.recv_target as f64
    }
}

/// Label written to the `broadcast` column of a result line.
///
/// Kept as `BasicPublish` / `WavePublish-N` so existing result analysis
/// scripts keep grouping runs by strategy.
pub fn result_label(strategy: BroadcastStrategy) -> String {
    match strategy {
        BroadcastStrategy::Flood => "BasicPublish".to_string(),
        BroadcastStrategy::Wave { level } => format!("WavePublish-{level}"),
    }
}

/// One result line of a sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetric {
    pub node_count: usize,
    /// Strategy label, e.g. `BasicPublish` or `WavePublish-35`.
    pub broadcast: String,
    pub avg_degree: f64,
    /// Processing-delay ceiling of the run, in milliseconds.
    pub delay: u64,
    pub duplicate_rate: f64,
    pub receiving_rate: f64,
    pub recv_count: usize,
    pub dont_recv_count: usize,
    pub elapsed_ms: u64,
}

impl NetworkMetric {
    /// Measure a finished broadcast of `message` over `topology`.
    pub fn measure(
        topology: &Topology,
        message: MessageId,
        strategy: BroadcastStrategy,
        max_node_delay: Delay,
        elapsed: Duration,
    ) -> Self {
        let counts = DeliveryCounts::collect(topology, message);
        Self {
            node_count: topology.len(),
            broadcast: result_label(strategy),
            avg_degree: topology.avg_degree(),
            delay: max_node_delay.as_millis(),
            duplicate_rate: counts.duplicate_rate(),
            receiving_rate: counts.receiving_rate(),
            recv_count: counts.recv_count,
            dont_recv_count: counts.dont_recv_count,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

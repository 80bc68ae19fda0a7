//! Concurrent broadcast propagation.
//!
//! [`broadcast`] drives one message from an originator across a
//! [`Topology`]. Every link traversal is its own tokio task: it sleeps the
//! link delay, hands the message to the receiving peer and, on a first
//! arrival, sleeps the peer's processing delay before fanning out further.
//! Sibling forwards race; which sender wins a peer's `Unseen → Seen`
//! transition is not deterministic.
//!
//! Propagation stops on its own: a peer that has already seen the message
//! records the sender and does nothing else. The call returns once the
//! [`TaskGroup`] of outstanding traversals drains. Relay state read before
//! that point is partial.

use floodbench_types::{BroadcastStrategy, Delay, MessageId, NodeId};
use futures_util::future::{BoxFuture, FutureExt};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, debug_span, trace, Instrument};

use crate::peer::{Delivery, Peer};
use crate::task_group::TaskGroup;
use crate::{NetworkError, Topology};

/// Summary of a completed broadcast.
#[derive(Clone, Debug, PartialEq)]
pub struct BroadcastOutcome {
    pub message: MessageId,
    pub originator: NodeId,
    pub strategy: BroadcastStrategy,
    /// Wall time from the originator accepting the message to quiescence.
    pub elapsed: Duration,
    /// Link traversals started.
    pub forwards: u64,
    /// First arrivals at non-originator peers.
    pub deliveries: u64,
    /// Arrivals absorbed by peers that had already seen the message.
    pub duplicates: u64,
    /// Peers that saw the message, originator included.
    pub reached: usize,
}

/// Broadcast `message` from `originator` and wait for propagation to finish.
///
/// Fails if `originator` is not part of `topology` or has already seen
/// `message`; otherwise runs to structural completion with no deadline.
pub async fn broadcast(
    topology: Arc<Topology>,
    originator: NodeId,
    message: MessageId,
    strategy: BroadcastStrategy,
) -> Result<BroadcastOutcome, NetworkError> {
    let span = debug_span!("broadcast", %message, %originator, %strategy);
    run(topology, originator, message, strategy)
        .instrument(span)
        .await
}

async fn run(
    topology: Arc<Topology>,
    originator: NodeId,
    message: MessageId,
    strategy: BroadcastStrategy,
) -> Result<BroadcastOutcome, NetworkError> {
    let origin = topology
        .peer(originator)
        .ok_or(NetworkError::PeerNotFound(originator))?;
    if origin.accept(message, None) == Delivery::Duplicate {
        return Err(NetworkError::AlreadySeen {
            node: originator,
            message,
        });
    }

    let started = Instant::now();
    debug!(peers = topology.len(), degree = origin.degree(), "broadcast started");

    let propagation = Arc::new(Propagation {
        topology: Arc::clone(&topology),
        message,
        strategy,
        tasks: TaskGroup::new(),
        forwards: AtomicU64::new(0),
        deliveries: AtomicU64::new(0),
        duplicates: AtomicU64::new(0),
    });

    suspend(origin.processing_delay()).await;
    for (to, delay) in propagation.eligible(origin, None) {
        propagation.forward(originator, to, delay, 0);
    }
    propagation.tasks.wait_until_zero().await;

    let outcome = BroadcastOutcome {
        message,
        originator,
        strategy,
        elapsed: started.elapsed(),
        forwards: propagation.forwards.load(Ordering::Relaxed),
        deliveries: propagation.deliveries.load(Ordering::Relaxed),
        duplicates: propagation.duplicates.load(Ordering::Relaxed),
        reached: topology.len() - topology.unreached(message).len(),
    };
    debug!(
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        reached = outcome.reached,
        forwards = outcome.forwards,
        deliveries = outcome.deliveries,
        duplicates = outcome.duplicates,
        "broadcast complete"
    );
    Ok(outcome)
}

/// Shared state of one in-flight broadcast.
struct Propagation {
    topology: Arc<Topology>,
    message: MessageId,
    strategy: BroadcastStrategy,
    tasks: Arc<TaskGroup>,
    forwards: AtomicU64,
    deliveries: AtomicU64,
    duplicates: AtomicU64,
}

impl Propagation {
    /// Spawn the traversal `from → to`; `hop` is the receiver's hop count.
    fn forward(self: &Arc<Self>, from: NodeId, to: NodeId, link_delay: Delay, hop: u32) {
        self.forwards.fetch_add(1, Ordering::Relaxed);
        let task = Arc::clone(self).traverse(from, to, link_delay, hop);
        self.tasks.spawn(task.in_current_span());
    }

    fn traverse(
        self: Arc<Self>,
        from: NodeId,
        to: NodeId,
        link_delay: Delay,
        hop: u32,
    ) -> BoxFuture<'static, ()> {
        async move {
            suspend(link_delay).await;
            self.relay(from, to, hop).await;
        }
        .boxed()
    }

    /// Relay step at peer `at`, which just received the message from `from`.
    async fn relay(self: &Arc<Self>, from: NodeId, at: NodeId, hop: u32) {
        let Some(peer) = self.topology.peer(at) else {
            return;
        };

        match peer.accept(self.message, Some(from)) {
            Delivery::Duplicate => {
                self.duplicates.fetch_add(1, Ordering::Relaxed);
                trace!(%from, %at, hop, "duplicate absorbed");
                return;
            }
            Delivery::First => {
                self.deliveries.fetch_add(1, Ordering::Relaxed);
                trace!(%from, %at, hop, "first delivery");
            }
        }

        suspend(peer.processing_delay()).await;

        let candidates = self.eligible(peer, Some(from));
        if self.strategy.is_selective(hop) {
            let quota = self.strategy.fanout(hop, candidates.len());
            self.forward_subset(peer, candidates, quota, hop + 1);
        } else {
            for (to, delay) in candidates {
                self.forward(at, to, delay, hop + 1);
            }
        }
    }

    /// Neighbors of `peer` other than `sender` not yet known to have relayed
    /// the message to `peer`.
    fn eligible(&self, peer: &Peer, sender: Option<NodeId>) -> Vec<(NodeId, Delay)> {
        peer.neighbors()
            .iter()
            .filter(|&(&n, _)| Some(n) != sender && !peer.has_relayed(self.message, n))
            .map(|(&n, &delay)| (n, delay))
            .collect()
    }

    /// Forward to at most `quota` of `candidates`.
    ///
    /// The first pick walks from a uniformly random index to the first
    /// candidate that is still eligible; every later pick walks from index 0.
    /// Picked candidates leave the pool.
    fn forward_subset(
        self: &Arc<Self>,
        peer: &Peer,
        mut candidates: Vec<(NodeId, Delay)>,
        quota: usize,
        next_hop: u32,
    ) {
        if candidates.is_empty() {
            return;
        }
        let mut cursor = rand::thread_rng().gen_range(0..candidates.len());
        let mut sent = 0;

        while sent < quota && !candidates.is_empty() {
            let len = candidates.len();
            let pick = (0..len)
                .map(|step| (cursor + step) % len)
                .find(|&i| !peer.has_relayed(self.message, candidates[i].0));
            let Some(i) = pick else {
                break;
            };
            let (to, delay) = candidates.remove(i);
            self.forward(peer.id(), to, delay, next_hop);
            sent += 1;
            cursor = 0;
        }
    }
}

async fn suspend(delay: Delay) {
    if !delay.is_zero() {
        tokio::time::sleep(delay.as_duration()).await;
    }
}

//! Peer arena and edge structure.
//!
//! Peers live in an index-stable `Vec` addressed by [`NodeId`]; they are never
//! moved or removed once created. Edges are mutated only through `&mut
//! Topology`, i.e. during generation. Propagation shares the topology behind
//! an `Arc` and reads edges without locking.

use floodbench_types::{Delay, MessageId, NodeId};

use crate::peer::{Peer, PeerSnapshot};

/// The peers of one simulated network, indexed by [`NodeId`].
#[derive(Debug, Default)]
pub struct Topology {
    peers: Vec<Peer>,
}

impl Topology {
    /// Create `delays.len()` unconnected peers with ids `0..n`.
    pub fn with_peers<I>(delays: I) -> Self
    where
        I: IntoIterator<Item = Delay>,
    {
        let peers = delays
            .into_iter()
            .enumerate()
            .map(|(i, delay)| Peer::new(NodeId::from(i), delay))
            .collect();
        Self { peers }
    }

    /// Star: peer 0 is the hub, linked to every other peer.
    pub fn star(node_count: usize, node_delay: Delay, link_delay: Delay) -> Self {
        let mut topo = Self::with_peers(vec![node_delay; node_count]);
        for spoke in 1..node_count {
            topo.add_bidirectional_link(NodeId::from(0usize), NodeId::from(spoke), link_delay);
        }
        topo
    }

    /// Ring: `i` linked to `i + 1`, wrapping around.
    pub fn ring(node_count: usize, node_delay: Delay, link_delay: Delay) -> Self {
        let mut topo = Self::with_peers(vec![node_delay; node_count]);
        for i in 0..node_count {
            let next = (i + 1) % node_count;
            topo.add_bidirectional_link(NodeId::from(i), NodeId::from(next), link_delay);
        }
        topo
    }

    /// Complete graph.
    pub fn complete(node_count: usize, node_delay: Delay, link_delay: Delay) -> Self {
        let mut topo = Self::with_peers(vec![node_delay; node_count]);
        for a in 0..node_count {
            for b in (a + 1)..node_count {
                topo.add_bidirectional_link(NodeId::from(a), NodeId::from(b), link_delay);
            }
        }
        topo
    }

    /// Number of peers, connected or not.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer(&self, id: NodeId) -> Option<&Peer> {
        self.peers.get(id.index())
    }

    /// All peers in id order.
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.peers.len()
    }

    /// Out-degree of `id`, or 0 for an unknown id.
    pub fn degree(&self, id: NodeId) -> usize {
        self.peer(id).map(Peer::degree).unwrap_or(0)
    }

    /// Mean out-degree; 0 for an empty topology.
    pub fn avg_degree(&self) -> f64 {
        if self.peers.is_empty() {
            return 0.0;
        }
        let total: usize = self.peers.iter().map(Peer::degree).sum();
        total as f64 / self.peers.len() as f64
    }

    /// Number of undirected edges, counting each directed link as half.
    pub fn edge_count(&self) -> usize {
        self.peers.iter().map(Peer::degree).sum::<usize>() / 2
    }

    pub fn is_linked(&self, a: NodeId, b: NodeId) -> bool {
        self.peer(a).is_some_and(|p| p.is_linked_to(b))
    }

    /// Insert `a ↔ b` with the same delay both ways.
    ///
    /// Returns `false` without touching anything when either id is out of
    /// range, `a == b`, or the pair is already linked in either direction.
    pub fn add_bidirectional_link(&mut self, a: NodeId, b: NodeId, delay: Delay) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        if self.is_linked(a, b) || self.is_linked(b, a) {
            return false;
        }
        self.peers[a.index()].links_mut().insert(b, delay);
        self.peers[b.index()].links_mut().insert(a, delay);
        true
    }

    /// Insert the directed link `from → to`, for asymmetric topologies.
    ///
    /// Same no-op rules as [`add_bidirectional_link`](Self::add_bidirectional_link),
    /// checked for the one direction only.
    pub fn add_link(&mut self, from: NodeId, to: NodeId, delay: Delay) -> bool {
        if from == to || !self.contains(from) || !self.contains(to) || self.is_linked(from, to) {
            return false;
        }
        self.peers[from.index()].links_mut().insert(to, delay);
        true
    }

    /// Remove `a ↔ b` in both directions. Unknown ids and absent links are no-ops.
    ///
    /// Returns whether any link was removed.
    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let ab = self.peers[a.index()].links_mut().remove(&b).is_some();
        let ba = self.peers[b.index()].links_mut().remove(&a).is_some();
        ab || ba
    }

    /// Snapshot of every peer, in id order.
    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        self.peers.iter().map(Peer::snapshot).collect()
    }

    /// Peers that never saw `message`.
    pub fn unreached(&self, message: MessageId) -> Vec<NodeId> {
        self.peers
            .iter()
            .filter(|p| !p.has_seen(message))
            .map(Peer::id)
            .collect()
    }
}

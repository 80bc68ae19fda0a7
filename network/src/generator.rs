//! Randomized topology generation.
//!
//! Two wiring policies:
//! - [`generate_random`]: unconstrained random wiring up to an exact edge count.
//! - [`generate_degree_bounded`]: iterative add/remove passes that push every
//!   peer's degree toward the band `[d_low, d_high]`, GossipSub-mesh style.
//!
//! Both are best effort in the sense the caller has to respect their
//! preconditions: an edge count above `n(n−1)/2` never terminates, and degree
//! bounding returns whatever it has once its pass budget runs out.
//! [`TopologyConfig::validate`] catches the infeasible requests up front.

use floodbench_types::{DelayRange, NodeId};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{NetworkError, Topology};

/// How an over-connected peer sheds links during degree bounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Pick a uniformly random node id and drop the link to it if one exists.
    /// Most picks miss, so the upper bound is soft.
    #[default]
    RandomTarget,
    /// Drop a link to a uniformly random actual neighbor.
    Neighbor,
}

/// Wiring policy of a [`TopologyConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationMode {
    Random {
        edge_count: usize,
    },
    DegreeBounded {
        d: usize,
        d_low: usize,
        d_high: usize,
        #[serde(default)]
        removal: RemovalPolicy,
    },
}

/// Everything needed to build one topology.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub node_count: usize,
    pub mode: GenerationMode,
    #[serde(default)]
    pub node_delay: DelayRange,
    #[serde(default)]
    pub link_delay: DelayRange,
    /// Seed for reproducible wiring; `None` draws from the thread RNG.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TopologyConfig {
    pub fn random(node_count: usize, edge_count: usize) -> Self {
        Self {
            node_count,
            mode: GenerationMode::Random { edge_count },
            node_delay: DelayRange::default(),
            link_delay: DelayRange::default(),
            seed: None,
        }
    }

    pub fn degree_bounded(node_count: usize, d: usize, d_low: usize, d_high: usize) -> Self {
        Self {
            node_count,
            mode: GenerationMode::DegreeBounded {
                d,
                d_low,
                d_high,
                removal: RemovalPolicy::default(),
            },
            node_delay: DelayRange::default(),
            link_delay: DelayRange::default(),
            seed: None,
        }
    }

    pub fn with_node_delay(mut self, range: DelayRange) -> Self {
        self.node_delay = range;
        self
    }

    pub fn with_link_delay(mut self, range: DelayRange) -> Self {
        self.link_delay = range;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Switch the removal policy; ignored in random mode.
    pub fn with_removal(mut self, policy: RemovalPolicy) -> Self {
        if let GenerationMode::DegreeBounded { removal, .. } = &mut self.mode {
            *removal = policy;
        }
        self
    }

    /// Reject requests the generators cannot satisfy.
    ///
    /// Generation itself does not call this.
    pub fn validate(&self) -> Result<(), NetworkError> {
        let n = self.node_count;
        match self.mode {
            GenerationMode::Random { edge_count } => {
                let max_edges = n.saturating_mul(n.saturating_sub(1)) / 2;
                if edge_count > max_edges {
                    return Err(NetworkError::InvalidConfig(format!(
                        "{edge_count} edges requested but {n} peers support at most {max_edges}"
                    )));
                }
            }
            GenerationMode::DegreeBounded { d, d_low, d_high, .. } => {
                if !(d_low <= d && d <= d_high) {
                    return Err(NetworkError::InvalidConfig(format!(
                        "degree band must satisfy d_low <= d <= d_high, got {d_low} <= {d} <= {d_high}"
                    )));
                }
                if d_low > 0 && d_low >= n {
                    return Err(NetworkError::InvalidConfig(format!(
                        "d_low {d_low} is unreachable with {n} peers"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the topology, seeded if a seed is configured.
    pub fn generate(&self) -> Result<Topology, NetworkError> {
        match self.seed {
            Some(seed) => self.generate_with(&mut ChaCha8Rng::seed_from_u64(seed)),
            None => self.generate_with(&mut rand::thread_rng()),
        }
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Topology, NetworkError> {
        match self.mode {
            GenerationMode::Random { edge_count } => generate_random(
                self.node_count,
                edge_count,
                self.node_delay,
                self.link_delay,
                rng,
            ),
            GenerationMode::DegreeBounded {
                d,
                d_low,
                d_high,
                removal,
            } => generate_degree_bounded(
                self.node_count,
                d,
                d_low,
                d_high,
                self.node_delay,
                self.link_delay,
                removal,
                rng,
            ),
        }
    }
}

fn populate<R: Rng + ?Sized>(node_count: usize, node_delay: DelayRange, rng: &mut R) -> Topology {
    Topology::with_peers((0..node_count).map(|_| node_delay.sample(rng)).collect::<Vec<_>>())
}

/// Wire `edge_count` bidirectional links between uniformly chosen distinct pairs.
///
/// Collisions with an existing link are retried and do not count. The caller
/// must keep `edge_count <= node_count * (node_count - 1) / 2`.
pub fn generate_random<R: Rng + ?Sized>(
    node_count: usize,
    edge_count: usize,
    node_delay: DelayRange,
    link_delay: DelayRange,
    rng: &mut R,
) -> Result<Topology, NetworkError> {
    if node_count < 2 && edge_count > 0 {
        return Err(NetworkError::TooFewPeers { node_count });
    }

    let mut topo = populate(node_count, node_delay, rng);
    let mut inserted = 0;
    let mut collisions = 0u64;
    while inserted < edge_count {
        let a = rng.gen_range(0..node_count);
        let mut b = rng.gen_range(0..node_count);
        while b == a {
            b = rng.gen_range(0..node_count);
        }
        let delay = link_delay.sample(rng);
        if topo.add_bidirectional_link(NodeId::from(a), NodeId::from(b), delay) {
            inserted += 1;
        } else {
            collisions += 1;
        }
    }

    debug!(
        node_count,
        edge_count,
        collisions,
        avg_degree = topo.avg_degree(),
        "generated random topology"
    );
    Ok(topo)
}

/// Iteratively add and remove links until every peer's degree sits in
/// `[d_low, d_high]`, or `node_count` passes have run.
///
/// Per pass, each peer below `d_low` gains `d − degree` links to random
/// targets, and each peer above `d_high` makes `degree − d` removal attempts
/// according to `removal`. A pass without any attempt ends generation.
#[allow(clippy::too_many_arguments)]
pub fn generate_degree_bounded<R: Rng + ?Sized>(
    node_count: usize,
    d: usize,
    d_low: usize,
    d_high: usize,
    node_delay: DelayRange,
    link_delay: DelayRange,
    removal: RemovalPolicy,
    rng: &mut R,
) -> Result<Topology, NetworkError> {
    if node_count < 2 && d_low > 0 {
        return Err(NetworkError::TooFewPeers { node_count });
    }

    let mut topo = populate(node_count, node_delay, rng);
    let mut passes = 0;
    let mut converged = false;

    for pass in 0..node_count {
        passes = pass + 1;
        let mut attempts = 0usize;

        for i in 0..node_count {
            let v = NodeId::from(i);

            let degree = topo.degree(v);
            if degree < d_low {
                let wanted = d.saturating_sub(degree);
                attempts += wanted;
                add_random_links(&mut topo, v, wanted, link_delay, rng);
            }

            let degree = topo.degree(v);
            if degree > d_high {
                let excess = degree.saturating_sub(d);
                attempts += excess;
                shed_links(&mut topo, v, excess, removal, rng);
            }
        }

        trace!(pass, attempts, avg_degree = topo.avg_degree(), "degree bounding pass");
        if attempts == 0 {
            converged = true;
            break;
        }
    }

    debug!(
        node_count,
        d,
        d_low,
        d_high,
        passes,
        converged,
        avg_degree = topo.avg_degree(),
        "generated degree-bounded topology"
    );
    Ok(topo)
}

/// Insert `count` new links from `v` to random targets, retrying on collision.
///
/// Stops early once `v` is linked to every other peer.
fn add_random_links<R: Rng + ?Sized>(
    topo: &mut Topology,
    v: NodeId,
    count: usize,
    link_delay: DelayRange,
    rng: &mut R,
) {
    let n = topo.len();
    let mut added = 0;
    while added < count {
        if topo.degree(v) >= n - 1 {
            break;
        }
        let target = NodeId::from(rng.gen_range(0..n));
        if target == v {
            continue;
        }
        let delay = link_delay.sample(rng);
        if topo.add_bidirectional_link(v, target, delay) {
            added += 1;
        }
    }
}

fn shed_links<R: Rng + ?Sized>(
    topo: &mut Topology,
    v: NodeId,
    attempts: usize,
    policy: RemovalPolicy,
    rng: &mut R,
) {
    let n = topo.len();
    for _ in 0..attempts {
        let target = match policy {
            RemovalPolicy::RandomTarget => NodeId::from(rng.gen_range(0..n)),
            RemovalPolicy::Neighbor => {
                let degree = topo.degree(v);
                if degree == 0 {
                    return;
                }
                let pick = rng.gen_range(0..degree);
                match topo.peer(v).and_then(|p| p.neighbors().keys().nth(pick).copied()) {
                    Some(target) => target,
                    None => return,
                }
            }
        };
        topo.remove_link(v, target);
    }
}

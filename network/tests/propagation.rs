//! End-to-end propagation over hand-built and generated topologies.
//!
//! Every test runs on a paused tokio clock, so link and processing delays
//! advance virtual time deterministically and the suite stays fast.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use floodbench_network::{broadcast, Topology, TopologyConfig};
use floodbench_types::{BroadcastStrategy, Delay, DelayRange, MessageId, NodeId};

const MSG: MessageId = MessageId::new(1);

fn n(id: u64) -> NodeId {
    NodeId::new(id)
}

fn ms(v: u64) -> Delay {
    Delay::from_millis(v)
}

fn recv_count(topo: &Topology, message: MessageId) -> usize {
    topo.peers().iter().map(|p| p.received_from(message).len()).sum()
}

fn dont_recv_count(topo: &Topology, message: MessageId) -> usize {
    topo.peers()
        .iter()
        .filter(|p| p.received_from(message).is_empty())
        .count()
}

fn reachable_from(topo: &Topology, start: NodeId) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(v) = queue.pop_front() {
        for &next in topo.peer(v).unwrap().neighbors().keys() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

/// 0 - 1, 1 - {2..=6}, every j in 2..=6 - three leaves of its own.
fn branchy_tree() -> Topology {
    let mut topo = Topology::with_peers(vec![Delay::ZERO; 22]);
    topo.add_bidirectional_link(n(0), n(1), ms(1));
    let mut next_leaf = 7;
    for branch in 2..=6 {
        topo.add_bidirectional_link(n(1), n(branch), ms(1));
        for _ in 0..3 {
            topo.add_bidirectional_link(n(branch), n(next_leaf), ms(1));
            next_leaf += 1;
        }
    }
    topo
}

#[tokio::test(start_paused = true)]
async fn star_flood_reaches_every_leaf_once() {
    let k = 8;
    let topo = Arc::new(Topology::star(k + 1, Delay::ZERO, ms(1)));
    broadcast(Arc::clone(&topo), n(0), MSG, BroadcastStrategy::Flood)
        .await
        .unwrap();

    for leaf in 1..=k as u64 {
        assert_eq!(topo.peer(n(leaf)).unwrap().received_from(MSG), vec![n(0)]);
    }
    assert!(topo.peer(n(0)).unwrap().received_from(MSG).is_empty());
    assert_eq!(recv_count(&topo, MSG), k);
    assert_eq!(dont_recv_count(&topo, MSG), 1);
}

#[tokio::test(start_paused = true)]
async fn ring_flood_records_one_duplicate_per_far_node() {
    let topo = Arc::new(Topology::ring(5, Delay::ZERO, ms(1)));
    let outcome = broadcast(Arc::clone(&topo), n(0), MSG, BroadcastStrategy::Flood)
        .await
        .unwrap();

    assert_eq!(topo.peer(n(1)).unwrap().received_from(MSG), vec![n(0)]);
    assert_eq!(topo.peer(n(4)).unwrap().received_from(MSG), vec![n(0)]);

    let far_2 = topo.peer(n(2)).unwrap().received_from(MSG);
    let far_3 = topo.peer(n(3)).unwrap().received_from(MSG);
    assert_eq!(far_2, vec![n(1), n(3)]);
    assert_eq!(far_3, vec![n(4), n(2)]);

    assert_eq!(recv_count(&topo, MSG), 6);
    // Only the originator has an empty sender list.
    assert_eq!(dont_recv_count(&topo, MSG), 1);
    assert_eq!(outcome.duplicates, 2);
}

#[tokio::test(start_paused = true)]
async fn wave_zero_prunes_odd_hops_and_wave_full_matches_flood() {
    let wave_zero = Arc::new(branchy_tree());
    broadcast(
        Arc::clone(&wave_zero),
        n(0),
        MSG,
        BroadcastStrategy::Wave { level: 0 },
    )
    .await
    .unwrap();
    // Originator, the relay, five branches and one leaf per branch.
    assert_eq!(wave_zero.unreached(MSG).len(), 22 - 12);
    for branch in 2..=6 {
        assert!(wave_zero.peer(n(branch)).unwrap().has_seen(MSG));
    }

    let flood = Arc::new(branchy_tree());
    broadcast(Arc::clone(&flood), n(0), MSG, BroadcastStrategy::Flood)
        .await
        .unwrap();

    let wave_full = Arc::new(branchy_tree());
    broadcast(
        Arc::clone(&wave_full),
        n(0),
        MSG,
        BroadcastStrategy::Wave { level: 100 },
    )
    .await
    .unwrap();

    assert!(flood.unreached(MSG).is_empty());
    assert!(wave_full.unreached(MSG).is_empty());
    assert_eq!(recv_count(&flood, MSG), 21);
    assert_eq!(recv_count(&wave_full, MSG), recv_count(&flood, MSG));
    assert!(dont_recv_count(&wave_zero, MSG) > dont_recv_count(&flood, MSG));
}

#[tokio::test(start_paused = true)]
async fn isolated_component_never_hears_the_message() {
    // Ring of four plus an unrelated pair.
    let mut topo = Topology::with_peers(vec![Delay::ZERO; 6]);
    for i in 0..4u64 {
        topo.add_bidirectional_link(n(i), n((i + 1) % 4), ms(2));
    }
    topo.add_bidirectional_link(n(4), n(5), ms(2));
    let topo = Arc::new(topo);

    broadcast(Arc::clone(&topo), n(0), MSG, BroadcastStrategy::Flood)
        .await
        .unwrap();

    for i in 1..4 {
        assert!(!topo.peer(n(i)).unwrap().received_from(MSG).is_empty());
    }
    assert!(topo.peer(n(4)).unwrap().received_from(MSG).is_empty());
    assert!(topo.peer(n(5)).unwrap().received_from(MSG).is_empty());
    assert_eq!(topo.unreached(MSG), vec![n(4), n(5)]);
}

#[tokio::test(start_paused = true)]
async fn flood_reaches_the_originator_component_of_a_generated_graph() {
    let topo = TopologyConfig::degree_bounded(80, 6, 4, 10)
        .with_node_delay(DelayRange::from_millis(0, 3))
        .with_link_delay(DelayRange::from_millis(1, 5))
        .with_seed(17)
        .generate()
        .unwrap();
    let topo = Arc::new(topo);
    let component = reachable_from(&topo, n(0));

    let outcome = broadcast(Arc::clone(&topo), n(0), MSG, BroadcastStrategy::Flood)
        .await
        .unwrap();

    let seen: BTreeSet<NodeId> = topo
        .peers()
        .iter()
        .filter(|p| p.has_seen(MSG))
        .map(|p| p.id())
        .collect();
    assert_eq!(seen, component);
    assert_eq!(outcome.reached, component.len());

    // Every arrival is recorded exactly once: first deliveries plus duplicates.
    assert_eq!(
        recv_count(&topo, MSG) as u64,
        outcome.deliveries + outcome.duplicates
    );
    assert_eq!(outcome.deliveries as usize, component.len() - 1);
}

#[tokio::test(start_paused = true)]
async fn wave_full_level_reaches_same_peers_as_flood_on_cyclic_graph() {
    let config = TopologyConfig::random(60, 150)
        .with_link_delay(DelayRange::from_millis(1, 4))
        .with_seed(23);
    let topo = Arc::new(config.generate().unwrap());
    let component = reachable_from(&topo, n(3));

    broadcast(
        Arc::clone(&topo),
        n(3),
        MSG,
        BroadcastStrategy::Wave { level: 100 },
    )
    .await
    .unwrap();

    let reached = topo.len() - topo.unreached(MSG).len();
    assert_eq!(reached, component.len());
}

#[tokio::test(start_paused = true)]
async fn independent_messages_coexist_on_one_topology() {
    let topo = Arc::new(Topology::ring(6, Delay::ZERO, ms(1)));
    let first = broadcast(Arc::clone(&topo), n(0), MessageId::new(1), BroadcastStrategy::Flood);
    let second = broadcast(Arc::clone(&topo), n(3), MessageId::new(2), BroadcastStrategy::Flood);
    let (a, b) = tokio::join!(first, second);
    assert_eq!(a.unwrap().reached, 6);
    assert_eq!(b.unwrap().reached, 6);

    assert!(topo.peer(n(0)).unwrap().received_from(MessageId::new(1)).is_empty());
    assert!(!topo.peer(n(0)).unwrap().received_from(MessageId::new(2)).is_empty());
}

fn seen_among(topo: &Topology, ids: impl IntoIterator<Item = u64>) -> Vec<u64> {
    ids.into_iter()
        .filter(|&id| topo.peer(n(id)).unwrap().has_seen(MSG))
        .collect()
}

/// 0 - 1 - 2, hub 2 - {3, 4, 5, 6}. Peer 2 relays at hop 1.
fn hub_at_odd_hop() -> Topology {
    let mut topo = Topology::with_peers(vec![Delay::ZERO; 7]);
    topo.add_bidirectional_link(n(0), n(1), ms(1));
    topo.add_bidirectional_link(n(1), n(2), ms(1));
    for leaf in 3..=6 {
        topo.add_bidirectional_link(n(2), n(leaf), ms(1));
    }
    topo
}

#[tokio::test(start_paused = true)]
async fn wave_odd_hop_picks_quota_and_restarts_at_first_candidate() {
    let mut ever_seen = BTreeSet::new();
    for _ in 0..100 {
        let topo = Arc::new(hub_at_odd_hop());
        broadcast(
            Arc::clone(&topo),
            n(0),
            MSG,
            BroadcastStrategy::Wave { level: 50 },
        )
        .await
        .unwrap();

        // 50% of four eligible leaves.
        let leaves = seen_among(&topo, 3..=6);
        assert_eq!(leaves.len(), 2, "{leaves:?}");
        // Only the first pick is random; the second walks from index 0.
        assert!(leaves.contains(&3), "{leaves:?}");
        ever_seen.extend(leaves);
    }
    assert_eq!(ever_seen, BTreeSet::from([3, 4, 5, 6]));
}

#[tokio::test(start_paused = true)]
async fn wave_even_hop_after_odd_hop_floods_again() {
    // Chain 0 - 1 - 2 - 3, then 3 - {4, 5, 6} and two leaves under each.
    let mut topo = Topology::with_peers(vec![Delay::ZERO; 13]);
    for i in 0..3 {
        topo.add_bidirectional_link(n(i), n(i + 1), ms(1));
    }
    let mut next_leaf = 7;
    for branch in 4..=6 {
        topo.add_bidirectional_link(n(3), n(branch), ms(1));
        for _ in 0..2 {
            topo.add_bidirectional_link(n(branch), n(next_leaf), ms(1));
            next_leaf += 1;
        }
    }
    let topo = Arc::new(topo);

    broadcast(
        Arc::clone(&topo),
        n(0),
        MSG,
        BroadcastStrategy::Wave { level: 0 },
    )
    .await
    .unwrap();

    // Peer 3 relays at hop 2 and reaches every branch.
    assert_eq!(seen_among(&topo, 4..=6), vec![4, 5, 6]);
    // Branches relay at hop 3 and keep one leaf each.
    for pair in [7..=8, 9..=10, 11..=12] {
        assert_eq!(seen_among(&topo, pair).len(), 1);
    }
    assert_eq!(topo.unreached(MSG).len(), 3);
}

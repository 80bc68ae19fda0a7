use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use floodbench_network::{generate_degree_bounded, generate_random, RemovalPolicy, Topology};
use floodbench_types::DelayRange;

fn well_formed(topo: &Topology) -> bool {
    topo.peers().iter().all(|peer| {
        !peer.is_linked_to(peer.id())
            && peer.neighbors().iter().all(|(&neighbor, &delay)| {
                topo.peer(neighbor).and_then(|p| p.link_delay(peer.id())) == Some(delay)
            })
    })
}

fn removal_policy() -> impl Strategy<Value = RemovalPolicy> {
    prop_oneof![Just(RemovalPolicy::RandomTarget), Just(RemovalPolicy::Neighbor)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Random wiring hits the requested edge count exactly and stays symmetric.
    #[test]
    fn random_topology_is_exact_and_symmetric(
        n in 2usize..40,
        fill in 0u32..=100,
        seed in any::<u64>(),
    ) {
        let max_edges = n * (n - 1) / 2;
        let edges = max_edges * fill as usize / 100;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let topo = generate_random(
            n,
            edges,
            DelayRange::from_millis(0, 5),
            DelayRange::from_millis(1, 9),
            &mut rng,
        )
        .unwrap();

        prop_assert_eq!(topo.len(), n);
        prop_assert_eq!(topo.edge_count(), edges);
        prop_assert!(well_formed(&topo));
    }

    /// Without an effective upper bound nothing is ever removed, so one pass
    /// lifts every peer to the lower bound.
    #[test]
    fn unbounded_band_meets_lower_bound(
        n in 3usize..60,
        d_low in 1usize..8,
        extra in 0usize..4,
        policy in removal_policy(),
        seed in any::<u64>(),
    ) {
        let d_low = d_low.min(n - 1);
        let d = d_low + extra;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let topo = generate_degree_bounded(
            n,
            d,
            d_low,
            n,
            DelayRange::default(),
            DelayRange::from_millis(1, 3),
            policy,
            &mut rng,
        )
        .unwrap();

        prop_assert!(well_formed(&topo));
        for peer in topo.peers() {
            prop_assert!(peer.degree() >= d_low);
            prop_assert!(peer.degree() < n);
        }
    }

    /// Degree bounding never produces self-loops or one-way links.
    #[test]
    fn degree_bounded_topology_is_symmetric(
        n in 2usize..80,
        d in 1usize..10,
        policy in removal_policy(),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let topo = generate_degree_bounded(
            n,
            d,
            d.saturating_sub(2).max(1),
            d + 2,
            DelayRange::default(),
            DelayRange::from_millis(1, 3),
            policy,
            &mut rng,
        )
        .unwrap();
        prop_assert!(well_formed(&topo));
    }
}

//! Plain-text renderings of topologies and propagation results.

use std::collections::BTreeMap;
use std::fmt;

use floodbench_network::Topology;
use floodbench_types::{MessageId, NodeId};

/// One line per peer: id, processing delay, degree and neighbors with link
/// delays.
pub struct TopologyListing<'a>(pub &'a Topology);

impl fmt::Display for TopologyListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for peer in self.0.peers() {
            write!(
                f,
                "Node ID: {}, Delay: {}, Connections: {} [",
                peer.id(),
                peer.processing_delay().as_millis(),
                peer.degree()
            )?;
            for (i, (neighbor, delay)) in peer.neighbors().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{neighbor}({delay})")?;
            }
            f.write_str("]\n")?;
        }
        Ok(())
    }
}

/// Receiver → first sender for every peer that received `message`.
fn first_senders(topology: &Topology, message: MessageId) -> BTreeMap<NodeId, NodeId> {
    topology
        .peers()
        .iter()
        .filter_map(|peer| {
            let first = peer.received_from(message).first().copied()?;
            Some((peer.id(), first))
        })
        .collect()
}

/// Which peer each receiver first heard the message from, by receiver id.
pub struct PropagationRoutes<'a> {
    pub topology: &'a Topology,
    pub message: MessageId,
}

impl fmt::Display for PropagationRoutes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (receiver, sender) in first_senders(self.topology, self.message) {
            writeln!(f, "Node {receiver} <- Node {sender}")?;
        }
        Ok(())
    }
}

/// Spanning tree of first deliveries rooted at the originator, depth-first,
/// two spaces of indentation per level. Children are listed by id.
pub struct PropagationTree<'a> {
    pub topology: &'a Topology,
    pub message: MessageId,
    pub root: NodeId,
}

impl PropagationTree<'_> {
    fn children(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (child, parent) in first_senders(self.topology, self.message) {
            children.entry(parent).or_default().push(child);
        }
        children
    }
}

impl fmt::Display for PropagationTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children = self.children();
        // Iterative; chains can be thousands of hops deep.
        let mut stack = vec![(self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            writeln!(f, "{:indent$}Node {node}", "", indent = depth * 2)?;
            if let Some(kids) = children.get(&node) {
                stack.extend(kids.iter().rev().map(|&kid| (kid, depth + 1)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodbench_types::Delay;

    const MSG: MessageId = MessageId::new(3);

    fn n(id: u64) -> NodeId {
        NodeId::new(id)
    }

    /// 0 → 1 → {2, 3}, 3 also heard from 2 later, 4 unreached.
    fn propagated() -> Topology {
        let mut topo = Topology::with_peers(vec![Delay::from_millis(7); 5]);
        topo.add_bidirectional_link(n(0), n(1), Delay::from_millis(2));
        topo.add_bidirectional_link(n(1), n(2), Delay::from_millis(3));
        topo.add_bidirectional_link(n(1), n(3), Delay::from_millis(3));
        topo.add_bidirectional_link(n(2), n(3), Delay::from_millis(1));

        topo.peer(n(0)).unwrap().accept(MSG, None);
        topo.peer(n(1)).unwrap().accept(MSG, Some(n(0)));
        topo.peer(n(3)).unwrap().accept(MSG, Some(n(1)));
        topo.peer(n(2)).unwrap().accept(MSG, Some(n(1)));
        topo.peer(n(3)).unwrap().accept(MSG, Some(n(2)));
        topo
    }

    #[test]
    fn listing_shows_delays_and_neighbors() {
        let topo = propagated();
        let listing = TopologyListing(&topo).to_string();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Node ID: 0, Delay: 7, Connections: 1 [1(2ms)]");
        assert_eq!(lines[1], "Node ID: 1, Delay: 7, Connections: 3 [0(2ms), 2(3ms), 3(3ms)]");
        assert_eq!(lines[4], "Node ID: 4, Delay: 7, Connections: 0 []");
    }

    #[test]
    fn routes_list_first_sender_only() {
        let topo = propagated();
        let routes = PropagationRoutes { topology: &topo, message: MSG }.to_string();
        assert_eq!(routes, "Node 1 <- Node 0\nNode 2 <- Node 1\nNode 3 <- Node 1\n");
    }

    #[test]
    fn tree_indents_by_depth() {
        let topo = propagated();
        let tree = PropagationTree { topology: &topo, message: MSG, root: n(0) }.to_string();
        assert_eq!(tree, "Node 0\n  Node 1\n    Node 2\n    Node 3\n");
    }

    #[test]
    fn deep_chain_renders_without_recursion() {
        let len = 2_000;
        let mut topo = Topology::with_peers(vec![Delay::ZERO; len]);
        for i in 1..len {
            topo.add_bidirectional_link(NodeId::from(i - 1), NodeId::from(i), Delay::ZERO);
        }
        topo.peer(n(0)).unwrap().accept(MSG, None);
        for i in 1..len {
            topo.peer(NodeId::from(i))
                .unwrap()
                .accept(MSG, Some(NodeId::from(i - 1)));
        }
        let tree = PropagationTree { topology: &topo, message: MSG, root: n(0) }.to_string();
        assert_eq!(tree.lines().count(), len);
    }

    #[test]
    fn unbroadcast_message_renders_only_the_root() {
        let topo = propagated();
        let tree = PropagationTree {
            topology: &topo,
            message: MessageId::new(99),
            root: n(4),
        }
        .to_string();
        assert_eq!(tree, "Node 4\n");
    }
}

//! A vertex of the simulated network and its per-message relay state.
//!
//! Each peer owns its relay state exclusively. The only mutation is
//! [`Peer::accept`], which performs the one-way `Unseen → Seen` transition on
//! the first delivery of a message and records every later delivery as a
//! duplicate. Duplicate absorption is what makes propagation terminate on
//! cyclic graphs without explicit cycle detection.

use floodbench_types::{Delay, MessageId, NodeId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of handing a message to a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The peer had not seen the message; it is now `Seen` and should relay.
    First,
    /// The peer had already seen the message; the sender was recorded and
    /// propagation stops here.
    Duplicate,
}

#[derive(Clone, Debug)]
struct RelayRecord {
    first_seen_at: SystemTime,
    /// Every peer that delivered the message, in arrival order.
    received_from: Vec<NodeId>,
}

/// A simulated node: its outgoing links plus per-message relay state.
///
/// Links are fixed once propagation starts; relay state is shared by the
/// concurrent tasks delivering to this peer.
pub struct Peer {
    id: NodeId,
    processing_delay: Delay,
    /// Outgoing links keyed by neighbor id, valued by link delay.
    links: BTreeMap<NodeId, Delay>,
    relay: Mutex<HashMap<MessageId, RelayRecord>>,
}

impl Peer {
    /// A peer with no links and no relay history.
    pub fn new(id: NodeId, processing_delay: Delay) -> Self {
        Self {
            id,
            processing_delay,
            links: BTreeMap::new(),
            relay: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Fixed time this peer spends before forwarding a fresh message.
    pub fn processing_delay(&self) -> Delay {
        self.processing_delay
    }

    /// Outgoing links: neighbor id to link delay.
    pub fn neighbors(&self) -> &BTreeMap<NodeId, Delay> {
        &self.links
    }

    pub fn degree(&self) -> usize {
        self.links.len()
    }

    pub fn is_linked_to(&self, neighbor: NodeId) -> bool {
        self.links.contains_key(&neighbor)
    }

    pub fn link_delay(&self, neighbor: NodeId) -> Option<Delay> {
        self.links.get(&neighbor).copied()
    }

    pub(crate) fn links_mut(&mut self) -> &mut BTreeMap<NodeId, Delay> {
        &mut self.links
    }

    /// Relay step: hand `message` to this peer.
    ///
    /// `sender` is `None` only for the originator, whose sender list starts
    /// empty. A repeated originator touch records nothing.
    pub fn accept(&self, message: MessageId, sender: Option<NodeId>) -> Delivery {
        let mut relay = self.relay_state();
        match relay.get_mut(&message) {
            Some(record) => {
                record.received_from.extend(sender);
                Delivery::Duplicate
            }
            None => {
                relay.insert(
                    message,
                    RelayRecord {
                        first_seen_at: SystemTime::now(),
                        received_from: sender.into_iter().collect(),
                    },
                );
                Delivery::First
            }
        }
    }

    /// Whether `neighbor` is already known to have relayed `message` to this peer.
    ///
    /// Only senders observed so far count: a neighbor that has not delivered
    /// the message yet is still a forwarding candidate.
    pub fn has_relayed(&self, message: MessageId, neighbor: NodeId) -> bool {
        self.relay_state()
            .get(&message)
            .is_some_and(|r| r.received_from.contains(&neighbor))
    }

    pub fn has_seen(&self, message: MessageId) -> bool {
        self.relay_state().contains_key(&message)
    }

    pub fn first_seen_at(&self, message: MessageId) -> Option<SystemTime> {
        self.relay_state().get(&message).map(|r| r.first_seen_at)
    }

    /// Senders of `message` in arrival order, first delivery included.
    ///
    /// Empty for the originator and for peers the message never reached.
    pub fn received_from(&self, message: MessageId) -> Vec<NodeId> {
        self.relay_state()
            .get(&message)
            .map(|r| r.received_from.clone())
            .unwrap_or_default()
    }

    /// Serializable copy of this peer's links and relay state.
    pub fn snapshot(&self) -> PeerSnapshot {
        let relay = self.relay_state();
        let mut relay_map = BTreeMap::new();
        let mut receive_map = BTreeMap::new();
        for (message, record) in relay.iter() {
            let millis = record
                .first_seen_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default();
            relay_map.insert(*message, millis);
            receive_map.insert(*message, record.received_from.clone());
        }
        PeerSnapshot {
            id: self.id,
            delay: self.processing_delay,
            connections: self.links.clone(),
            relay_map,
            receive_map,
        }
    }

    fn relay_state(&self) -> MutexGuard<'_, HashMap<MessageId, RelayRecord>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.relay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("processing_delay", &self.processing_delay)
            .field("degree", &self.links.len())
            .finish()
    }
}

/// Point-in-time dump of a peer, suitable for JSON export.
#[derive(Clone, Debug, Serialize)]
pub struct PeerSnapshot {
    pub id: NodeId,
    pub delay: Delay,
    pub connections: BTreeMap<NodeId, Delay>,
    /// First-seen time per message, Unix epoch milliseconds.
    pub relay_map: BTreeMap<MessageId, u64>,
    pub receive_map: BTreeMap<MessageId, Vec<NodeId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSG: MessageId = MessageId::new(1);

    fn node(id: u64) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn first_delivery_transitions_to_seen() {
        let peer = Peer::new(node(0), Delay::ZERO);
        assert!(!peer.has_seen(MSG));
        assert!(peer.first_seen_at(MSG).is_none());

        assert_eq!(peer.accept(MSG, Some(node(3))), Delivery::First);
        assert!(peer.has_seen(MSG));
        assert!(peer.first_seen_at(MSG).is_some());
        assert_eq!(peer.received_from(MSG), vec![node(3)]);
    }

    #[test]
    fn later_deliveries_are_absorbed_and_recorded() {
        let peer = Peer::new(node(0), Delay::ZERO);
        peer.accept(MSG, Some(node(1)));
        let first_seen = peer.first_seen_at(MSG);

        assert_eq!(peer.accept(MSG, Some(node(2))), Delivery::Duplicate);
        assert_eq!(peer.accept(MSG, Some(node(1))), Delivery::Duplicate);
        assert_eq!(peer.received_from(MSG), vec![node(1), node(2), node(1)]);
        assert_eq!(peer.first_seen_at(MSG), first_seen);
    }

    #[test]
    fn originator_starts_with_empty_sender_list() {
        let peer = Peer::new(node(0), Delay::ZERO);
        assert_eq!(peer.accept(MSG, None), Delivery::First);
        assert!(peer.received_from(MSG).is_empty());
        assert_eq!(peer.accept(MSG, None), Delivery::Duplicate);
        assert!(peer.received_from(MSG).is_empty());
    }

    #[test]
    fn has_relayed_only_reports_observed_senders() {
        let peer = Peer::new(node(0), Delay::ZERO);
        assert!(!peer.has_relayed(MSG, node(1)));
        peer.accept(MSG, Some(node(1)));
        assert!(peer.has_relayed(MSG, node(1)));
        assert!(!peer.has_relayed(MSG, node(2)));
        assert!(!peer.has_relayed(MessageId::new(2), node(1)));
    }

    #[test]
    fn messages_are_tracked_independently() {
        let peer = Peer::new(node(0), Delay::ZERO);
        peer.accept(MessageId::new(1), Some(node(1)));
        assert_eq!(peer.accept(MessageId::new(2), Some(node(2))), Delivery::First);
        assert_eq!(peer.received_from(MessageId::new(2)), vec![node(2)]);
    }

    #[test]
    fn concurrent_first_arrivals_have_a_single_winner() {
        let peer = std::sync::Arc::new(Peer::new(node(0), Delay::ZERO));
        let handles: Vec<_> = (1..=16)
            .map(|i| {
                let p = std::sync::Arc::clone(&peer);
                std::thread::spawn(move || p.accept(MSG, Some(node(i))))
            })
            .collect();
        let firsts = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| *d == Delivery::First)
            .count();
        assert_eq!(firsts, 1);
        assert_eq!(peer.received_from(MSG).len(), 16);
    }

    #[test]
    fn snapshot_serializes_links_and_routes() {
        let mut peer = Peer::new(node(4), Delay::from_millis(7));
        peer.links_mut().insert(node(5), Delay::from_millis(2));
        peer.accept(MSG, Some(node(5)));

        let json = serde_json::to_value(peer.snapshot()).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["delay"], 7);
        assert_eq!(json["connections"]["5"], 2);
        assert_eq!(json["receive_map"]["1"][0], 5);
        assert!(json["relay_map"]["1"].as_u64().unwrap() > 0);
    }
}

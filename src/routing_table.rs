//! The routing table: an unordered collection of entries keyed by
//! destination, with priority-weighted insert and parent fallback.

use crate::address::LinkAddr;
use crate::clock::Tick;
use crate::subtree::SubtreeRegistry;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RouteType {
    Neighbor,
    Topology,
    Parent,
    SelfRoute,
}

impl RouteType {
    /// Higher wins arbitration ties (§3: SELF=4, PARENT=3, TOPOLOGY=2,
    /// NEIGHBOR=1).
    pub fn priority(self) -> u8 {
        match self {
            RouteType::Neighbor => 1,
            RouteType::Topology => 2,
            RouteType::Parent => 3,
            RouteType::SelfRoute => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingEntry {
    pub destination: LinkAddr,
    pub next_hop: LinkAddr,
    pub route_type: RouteType,
    pub metric: u16,
    pub rssi: i16,
    pub last_updated: Tick,
}

#[derive(Debug)]
pub struct RoutingTable {
    entries: BTreeMap<LinkAddr, RoutingEntry>,
    self_addr: LinkAddr,
}

impl RoutingTable {
    /// Builds a table with its mandatory SELF entry installed (§3: exactly
    /// one SELF entry, destination = next_hop = this node, never purged).
    pub fn new(self_addr: LinkAddr, now: Tick) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            self_addr,
            RoutingEntry {
                destination: self_addr,
                next_hop: self_addr,
                route_type: RouteType::SelfRoute,
                metric: 0,
                rssi: 0,
                last_updated: now,
            },
        );
        Self { entries, self_addr }
    }

    pub fn self_addr(&self) -> LinkAddr {
        self.self_addr
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutingEntry> {
        self.entries.values()
    }

    pub fn get(&self, destination: LinkAddr) -> Option<&RoutingEntry> {
        self.entries.get(&destination)
    }

    pub fn parent_entry(&self) -> Option<&RoutingEntry> {
        self.entries.values().find(|e| e.route_type == RouteType::Parent)
    }

    /// Insert-or-update with priority arbitration (§4.1 `add`).
    ///
    /// Guard: only the SELF entry may target this node's own address.
    pub fn add(
        &mut self,
        destination: LinkAddr,
        next_hop: LinkAddr,
        route_type: RouteType,
        metric: u16,
        rssi: i16,
        now: Tick,
    ) {
        if destination == self.self_addr && route_type != RouteType::SelfRoute {
            log::debug!("rt: rejected attempt to install non-SELF route to own address");
            return;
        }

        match self.entries.get_mut(&destination) {
            Some(existing) => {
                if route_type.priority() >= existing.route_type.priority() {
                    log::trace!(
                        "rt: replace {} via {} ({:?}, metric {}) -> via {} ({:?}, metric {})",
                        destination,
                        existing.next_hop,
                        existing.route_type,
                        existing.metric,
                        next_hop,
                        route_type,
                        metric
                    );
                    existing.next_hop = next_hop;
                    existing.route_type = route_type;
                    existing.metric = metric;
                    existing.rssi = rssi;
                    existing.last_updated = now;
                } else if existing.next_hop == next_hop {
                    existing.last_updated = now;
                }
            }
            None => {
                self.entries.insert(
                    destination,
                    RoutingEntry {
                        destination,
                        next_hop,
                        route_type,
                        metric,
                        rssi,
                        last_updated: now,
                    },
                );
            }
        }
    }

    /// Exact match, falling back to the PARENT entry on a non-sink node
    /// (§4.1 `lookup`, L3).
    pub fn lookup(&self, destination: LinkAddr, is_sink: bool) -> Option<&RoutingEntry> {
        if let Some(entry) = self.entries.get(&destination) {
            return Some(entry);
        }
        if is_sink {
            return None;
        }
        self.parent_entry()
    }

    /// Removes the unique entry matching both destination and next-hop.
    pub fn delete(&mut self, destination: LinkAddr, next_hop: LinkAddr) {
        if let Some(entry) = self.entries.get(&destination) {
            if entry.next_hop == next_hop {
                self.entries.remove(&destination);
            }
        }
    }

    /// Removes every entry routed via `next_hop`, except SELF on the sink
    /// (§4.1 `delete_by_next_hop`). Also scrubs the subtree registry of
    /// every destination removed.
    pub fn delete_by_next_hop(
        &mut self,
        next_hop: LinkAddr,
        is_sink: bool,
        subtree: &mut SubtreeRegistry,
    ) {
        let removed: Vec<LinkAddr> = self
            .entries
            .values()
            .filter(|e| e.next_hop == next_hop && !(is_sink && e.route_type == RouteType::SelfRoute))
            .map(|e| e.destination)
            .collect();

        for dest in removed {
            self.entries.remove(&dest);
            subtree.remove(dest);
        }
    }

    /// Removes every entry other than SELF/PARENT unreferenced for longer
    /// than `cleanup_interval` (§4.1 `purge`, L2: idempotent).
    pub fn purge(&mut self, now: Tick, cleanup_interval: Duration, subtree: &mut SubtreeRegistry) {
        let stale: Vec<LinkAddr> = self
            .entries
            .values()
            .filter(|e| {
                !matches!(e.route_type, RouteType::SelfRoute | RouteType::Parent)
                    && (now - e.last_updated) >= cleanup_interval
            })
            .map(|e| e.destination)
            .collect();

        for dest in stale {
            self.entries.remove(&dest);
            subtree.remove(dest);
        }
    }
}

//! Beacon engine: periodic broadcast of `(seqn, metric)` and the
//! distributed parent-selection state machine driven by reception of
//! those beacons (§4.2).

use crate::address::LinkAddr;
use crate::clock::Tick;
use crate::config::NodeConfig;
use crate::frame::OutboundFrame;
use crate::routing_table::{RouteType, RoutingTable};
use crate::subtree::SubtreeRegistry;
use crate::wire::{Beacon, ChildControl, ChildControlKind};
use rand_core::{OsRng, RngCore};
use std::time::Duration;

/// Pacing and parent bookkeeping for one connection, kept apart from
/// `RoutingTable` the way the reference transport layer keeps an
/// `AnnounceEntry`'s retry state apart from its owning handler.
#[derive(Debug, Clone)]
pub struct BeaconState {
    pub parent: Option<LinkAddr>,
    pub metric: u16,
    pub beacon_seqn: u16,
    pub stable_counter: u8,
    pub last_parent_change: Option<Tick>,
    pub last_beacon_forward: Option<Tick>,
    pub current_interval: Duration,
}

impl BeaconState {
    pub fn new(is_sink: bool, config: &NodeConfig) -> Self {
        Self {
            parent: None,
            metric: if is_sink { 0 } else { crate::config::NO_PARENT_METRIC },
            beacon_seqn: 0,
            stable_counter: 0,
            last_parent_change: None,
            last_beacon_forward: None,
            current_interval: config.beacon_initial_interval,
        }
    }
}

/// Result of processing one received beacon.
#[derive(Debug, Default)]
pub struct BeaconOutcome {
    pub frames: Vec<OutboundFrame>,
    pub emit_topology_report: bool,
    /// Delay before the next broadcast should fire. `None` only when the
    /// beacon was dropped outright by the RSSI/sequence gate, in which case
    /// the caller must leave the existing broadcast timer untouched.
    /// `Some` otherwise, on both the sink and a non-sink, matching every
    /// exit of `bc_recv` that passes the gate (it unconditionally
    /// re-arms its beacon timer).
    pub reschedule_after: Option<Duration>,
}

/// A uniform random delay in `[0, 1s)` used to decorrelate forwarded
/// beacons and re-broadcasts.
pub fn jitter() -> Duration {
    let ms = OsRng.next_u32() % 1000;
    Duration::from_millis(ms as u64)
}

/// Handles one beacon reception (§4.2 steps 1-4), sink and non-sink alike.
#[allow(clippy::too_many_arguments)]
pub fn on_beacon_received(
    rt: &mut RoutingTable,
    subtree: &mut SubtreeRegistry,
    state: &mut BeaconState,
    config: &NodeConfig,
    self_addr: LinkAddr,
    is_sink: bool,
    sender: LinkAddr,
    beacon: Beacon,
    rssi: i16,
    now: Tick,
) -> BeaconOutcome {
    let mut outcome = BeaconOutcome::default();

    // Step 1: RSSI and sequence gate.
    if rssi < config.rssi_threshold || beacon.seqn < state.beacon_seqn {
        log::trace!(
            "beacon: dropped from {} (rssi {} seqn {} vs known {})",
            sender, rssi, beacon.seqn, state.beacon_seqn
        );
        return outcome;
    }

    let mut parent_set = false;
    let mut should_forward = false;

    // Step 2: evaluate as a parent. Gated on the literal round match: a
    // beacon from a newer round than the one this node last adopted does
    // not get arbitrated until `beacon_seqn` itself advances, which only
    // happens on adoption below.
    if !is_sink && beacon.seqn == state.beacon_seqn && beacon.metric + 1 <= state.metric {
        let switch_interval_elapsed = match state.last_parent_change {
            None => true,
            Some(last) => now - last >= config.min_parent_switch_interval,
        };
        let candidate = Some(sender) != state.parent
            && !subtree.contains(sender)
            && switch_interval_elapsed;

        if candidate {
            log::info!("beacon: adopting {} as parent (metric {})", sender, beacon.metric + 1);
            if let Some(old_parent) = state.parent {
                outcome.frames.push(OutboundFrame::Unicast {
                    dest: old_parent,
                    payload: ChildControl { kind: ChildControlKind::Remove, child: self_addr }
                        .encode()
                        .to_vec(),
                });
                rt.delete(old_parent, old_parent);
            }

            state.parent = Some(sender);
            state.last_parent_change = Some(now);
            state.current_interval = config.beacon_min_interval;
            state.last_beacon_forward = Some(now);
            state.stable_counter = 0;
            state.metric = beacon.metric + 1;
            state.beacon_seqn = beacon.seqn;

            should_forward = true;
            parent_set = true;

            rt.add(sender, sender, RouteType::Parent, state.metric, rssi, now);
            outcome.frames.push(OutboundFrame::Unicast {
                dest: sender,
                payload: ChildControl { kind: ChildControlKind::Add, child: self_addr }
                    .encode()
                    .to_vec(),
            });
            outcome.emit_topology_report = true;
        } else {
            state.stable_counter = state.stable_counter.saturating_add(1);
            if state.stable_counter >= config.stability_threshold {
                state.current_interval = (state.current_interval * 2).min(config.beacon_max_interval);
                state.stable_counter = 0;
            }
            parent_set = true;

            let silent_for = state.last_beacon_forward.map(|last| now - last).unwrap_or(Duration::MAX);
            if silent_for > config.beacon_silent_limit {
                should_forward = true;
                state.last_beacon_forward = Some(now);
                outcome.emit_topology_report = true;
            }
        }
    }

    // Step 3: add as a neighbor unless this beacon was already absorbed
    // above (as a new or already-stable parent).
    if !parent_set {
        rt.add(sender, sender, RouteType::Neighbor, beacon.metric + 1, rssi, now);
    }

    // Step 4: reschedule the broadcast timer. The sink never forwards, so
    // it always falls back to its steady broadcast interval.
    outcome.reschedule_after = Some(if !is_sink && should_forward {
        jitter()
    } else {
        state.current_interval
    });

    outcome
}

/// Decides the delay before the next beacon broadcast on the regular
/// timer path (§4.2 step 4, the non-reception case).
pub fn next_broadcast_delay(state: &BeaconState, forwarding: Option<Duration>) -> Duration {
    forwarding.unwrap_or(state.current_interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::LinkAddr;

    fn addr(b: u8) -> LinkAddr {
        LinkAddr::new(0, b)
    }

    fn setup(is_sink: bool) -> (RoutingTable, SubtreeRegistry, BeaconState, NodeConfig) {
        let config = NodeConfig::new();
        let rt = RoutingTable::new(addr(1), Tick::ZERO);
        let subtree = SubtreeRegistry::new(addr(1));
        let state = BeaconState::new(is_sink, &config);
        (rt, subtree, state, config)
    }

    #[test]
    fn adopts_first_parent_and_emits_add_child_and_report() {
        let (mut rt, mut subtree, mut state, config) = setup(false);
        let outcome = on_beacon_received(
            &mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(2), Beacon { seqn: 0, metric: 0 }, -50, Tick::ZERO,
        );

        assert_eq!(state.parent, Some(addr(2)));
        assert_eq!(state.metric, 1);
        assert!(outcome.emit_topology_report);
        assert_eq!(rt.parent_entry().unwrap().next_hop, addr(2));
        assert!(outcome.frames.iter().any(|f| matches!(
            f,
            OutboundFrame::Unicast { dest, .. } if *dest == addr(2)
        )));
    }

    #[test]
    fn sink_installs_neighbor_route_and_reschedules_without_adopting_a_parent() {
        let (mut rt, mut subtree, mut state, config) = setup(true);
        let outcome = on_beacon_received(
            &mut rt, &mut subtree, &mut state, &config,
            addr(1), true, addr(2), Beacon { seqn: 0, metric: 0 }, -50, Tick::ZERO,
        );

        assert!(state.parent.is_none());
        assert_eq!(rt.get(addr(2)).unwrap().route_type, RouteType::Neighbor);
        assert_eq!(outcome.reschedule_after, Some(config.beacon_initial_interval));
    }

    #[test]
    fn drops_beacon_below_rssi_threshold() {
        let (mut rt, mut subtree, mut state, config) = setup(false);
        let outcome = on_beacon_received(
            &mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(2), Beacon { seqn: 0, metric: 0 }, -96, Tick::ZERO,
        );
        assert!(state.parent.is_none());
        assert!(outcome.frames.is_empty());
        assert!(outcome.reschedule_after.is_none());
    }

    #[test]
    fn drops_stale_sequence_number() {
        let (mut rt, mut subtree, mut state, config) = setup(false);
        // round 0: adopt addr(2)
        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(2), Beacon { seqn: 0, metric: 0 }, -50, Tick::ZERO);
        // round 1, after the switch interval: adopt addr(3), beacon_seqn advances to 1
        let later = Tick::ZERO + config.min_parent_switch_interval;
        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(3), Beacon { seqn: 1, metric: 0 }, -50, later);
        assert_eq!(state.parent, Some(addr(3)));

        // a beacon still carrying round 0 is now stale and must be dropped
        let outcome = on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(4), Beacon { seqn: 0, metric: 0 }, -50, later);
        assert_eq!(state.parent, Some(addr(3)));
        assert!(outcome.reschedule_after.is_none());
    }

    #[test]
    fn refuses_to_adopt_a_member_of_its_own_subtree() {
        let (mut rt, mut subtree, mut state, config) = setup(false);
        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(2), Beacon { seqn: 0, metric: 0 }, -50, Tick::ZERO);
        subtree.insert_if_absent(addr(9));

        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(9), Beacon { seqn: 0, metric: 0 }, -50, Tick::ZERO);

        assert_eq!(state.parent, Some(addr(2)));
    }

    #[test]
    fn does_not_switch_parent_before_min_switch_interval() {
        let (mut rt, mut subtree, mut state, config) = setup(false);
        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(2), Beacon { seqn: 0, metric: 1 }, -50, Tick::ZERO);

        let soon = Tick::ZERO + Duration::from_secs(5);
        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(3), Beacon { seqn: 0, metric: 0 }, -50, soon);

        assert_eq!(state.parent, Some(addr(2)));
    }

    #[test]
    fn switches_parent_after_min_switch_interval_elapses() {
        let (mut rt, mut subtree, mut state, config) = setup(false);
        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(2), Beacon { seqn: 0, metric: 1 }, -50, Tick::ZERO);

        let later = Tick::ZERO + config.min_parent_switch_interval;
        let outcome = on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(3), Beacon { seqn: 0, metric: 0 }, -50, later);

        assert_eq!(state.parent, Some(addr(3)));
        assert!(outcome.frames.iter().any(|f| matches!(
            f,
            OutboundFrame::Unicast { dest, payload } if *dest == addr(2)
                && payload[0] == crate::wire::REMOVE_CHILD
        )));
    }

    #[test]
    fn stability_doubles_interval_after_threshold() {
        let (mut rt, mut subtree, mut state, config) = setup(false);
        on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
            addr(1), false, addr(2), Beacon { seqn: 0, metric: 0 }, -50, Tick::ZERO);
        assert_eq!(state.current_interval, config.beacon_min_interval);

        for _ in 0..3 {
            on_beacon_received(&mut rt, &mut subtree, &mut state, &config,
                addr(1), false, addr(2), Beacon { seqn: 0, metric: 0 }, -50, Tick::ZERO);
        }

        assert_eq!(state.current_interval, config.beacon_min_interval * 2);
    }
}

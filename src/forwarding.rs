//! Forwarding engine: application `send()`, unicast data receive path with
//! hop-limit enforcement, and child-control frame handling (§4.4).

use crate::address::LinkAddr;
use crate::beacon::BeaconState;
use crate::clock::Tick;
use crate::config::{NodeConfig, CHILD_DECLARED_METRIC, SECOND_HAND_RSSI};
use crate::error::CollectError;
use crate::frame::{Delivery, OutboundFrame};
use crate::routing_table::{RouteType, RoutingTable};
use crate::subtree::SubtreeRegistry;
use crate::wire::{ChildControl, ChildControlKind, CollectHeader};

/// Builds and routes an outbound data packet (§4.4 "Send path").
pub fn send(
    rt: &RoutingTable,
    is_sink: bool,
    self_addr: LinkAddr,
    dest: LinkAddr,
    app_payload: &[u8],
) -> Result<OutboundFrame, CollectError> {
    let route = rt.lookup(dest, is_sink).ok_or(CollectError::NoRoute { destination: dest })?;

    let header = CollectHeader { source: self_addr, dest, hops: 0 };
    let mut payload = header.encode().to_vec();
    payload.extend_from_slice(app_payload);

    Ok(OutboundFrame::Unicast { dest: route.next_hop, payload })
}

/// Outcome of receiving a unicast data frame (§4.4 "Receive path").
#[derive(Debug, Default)]
pub struct DataOutcome {
    pub delivery: Option<Delivery>,
    pub forward: Option<OutboundFrame>,
}

pub fn on_data_received(
    rt: &RoutingTable,
    is_sink: bool,
    self_addr: LinkAddr,
    config: &NodeConfig,
    payload: &[u8],
) -> DataOutcome {
    let mut outcome = DataOutcome::default();

    let Some((mut header, app_payload)) = CollectHeader::decode(payload) else {
        log::debug!("forwarding: malformed data frame, dropping");
        return outcome;
    };

    if header.hops + 1 > config.max_path_length {
        log::debug!("forwarding: hop limit exceeded for {}, dropping", header.dest);
        return outcome;
    }
    header.hops += 1;

    if header.dest == self_addr {
        outcome.delivery = Some(Delivery {
            source: header.source,
            hops: header.hops,
            payload: app_payload.to_vec(),
        });
        return outcome;
    }

    match rt.lookup(header.dest, is_sink) {
        Some(route) => {
            let mut out = header.encode().to_vec();
            out.extend_from_slice(app_payload);
            outcome.forward = Some(OutboundFrame::Unicast { dest: route.next_hop, payload: out });
        }
        None => {
            log::debug!("forwarding: no route to {}, dropping", header.dest);
        }
    }

    outcome
}

/// Handles an `ADD_CHILD`/`REMOVE_CHILD` control frame (§4.4
/// "Child-control frames").
pub fn on_child_control(
    rt: &mut RoutingTable,
    subtree: &mut SubtreeRegistry,
    beacon_state: &BeaconState,
    is_sink: bool,
    from: LinkAddr,
    control: ChildControl,
    now: Tick,
) -> Option<OutboundFrame> {
    match control.kind {
        ChildControlKind::Add => {
            rt.add(control.child, from, RouteType::Topology, CHILD_DECLARED_METRIC, SECOND_HAND_RSSI, now);
            if !is_sink {
                subtree.insert_if_absent(control.child);
            }
            None
        }
        ChildControlKind::Remove => {
            rt.delete_by_next_hop(control.child, is_sink, subtree);
            rt.delete(control.child, control.child);
            rt.add(control.child, from, RouteType::Neighbor, CHILD_DECLARED_METRIC, SECOND_HAND_RSSI, now);
            crate::topology::emit_report(rt, subtree, beacon_state)
        }
    }
}

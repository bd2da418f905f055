//! Per-connection state (§3 "Connection state") and the dispatcher that
//! ties the routing table, subtree registry, beacon engine, topology
//! engine, and forwarding engine together.
//!
//! `Connection` performs no I/O: every handler takes what it needs and
//! returns the frames the caller should transmit, separating "decide what
//! to send" from "actually send" via an injected adapter.

use crate::address::LinkAddr;
use crate::beacon::{self, BeaconState};
use crate::clock::Tick;
use crate::config::NodeConfig;
use crate::error::CollectError;
use crate::forwarding;
use crate::frame::{Delivery, OutboundFrame};
use crate::routing_table::RoutingTable;
use crate::subtree::SubtreeRegistry;
use crate::topology::{self, ReportBuffer};
use crate::wire::{self, Beacon, ChildControl, FrameKind};
use std::time::Duration;

pub struct Connection {
    self_addr: LinkAddr,
    is_sink: bool,
    config: NodeConfig,
    rt: RoutingTable,
    subtree: SubtreeRegistry,
    beacon_state: BeaconState,
    report_buffer: ReportBuffer,
}

/// Everything a reception may produce: frames to transmit, an optional
/// upcall to the application, and whether a one-shot timer needs arming.
#[derive(Debug, Default)]
pub struct ReceiveOutcome {
    pub frames: Vec<OutboundFrame>,
    pub delivery: Option<Delivery>,
    pub arm_report_timer: bool,
    pub reschedule_beacon_after: Option<Duration>,
}

impl Connection {
    /// `open()`: installs the SELF route and initializes pacing state
    /// (§6 "Application contract").
    pub fn open(self_addr: LinkAddr, is_sink: bool, config: NodeConfig, now: Tick) -> Self {
        Self {
            self_addr,
            is_sink,
            rt: RoutingTable::new(self_addr, now),
            subtree: SubtreeRegistry::new(self_addr),
            beacon_state: BeaconState::new(is_sink, &config),
            report_buffer: ReportBuffer::new(),
            config,
        }
    }

    pub fn self_addr(&self) -> LinkAddr {
        self.self_addr
    }

    pub fn is_sink(&self) -> bool {
        self.is_sink
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.rt
    }

    pub fn subtree(&self) -> &SubtreeRegistry {
        &self.subtree
    }

    pub fn beacon_state(&self) -> &BeaconState {
        &self.beacon_state
    }

    pub fn config_cleanup_interval(&self) -> Duration {
        self.config.cleanup_interval
    }

    pub fn config_report_batch_delay(&self) -> Duration {
        self.config.report_batch_delay
    }

    /// `send(dest) -> int` from §6, as an idiomatic `Result`.
    pub fn send(&self, dest: LinkAddr, app_payload: &[u8]) -> Result<OutboundFrame, CollectError> {
        forwarding::send(&self.rt, self.is_sink, self.self_addr, dest, app_payload)
    }

    /// Receiving a broadcast beacon (§4.2). The sink still runs the
    /// RSSI/staleness gate, installs the sender as a neighbor, and
    /// reschedules its own beacon timer; it just never evaluates a parent.
    pub fn on_beacon_received(&mut self, sender: LinkAddr, beacon: Beacon, rssi: i16, now: Tick) -> ReceiveOutcome {
        let mut outcome = ReceiveOutcome::default();

        let result = beacon::on_beacon_received(
            &mut self.rt, &mut self.subtree, &mut self.beacon_state, &self.config,
            self.self_addr, self.is_sink, sender, beacon, rssi, now,
        );

        outcome.frames = result.frames;
        outcome.reschedule_beacon_after = result.reschedule_after;
        if result.emit_topology_report {
            if let Some(frame) = topology::emit_report(&self.rt, &self.subtree, &self.beacon_state) {
                outcome.frames.push(frame);
            }
        }
        outcome
    }

    /// The beacon broadcast timer firing: emits this node's current
    /// `(seqn, metric)`, bumping `seqn` afterwards if this is the sink
    /// (§4.2 "The sink is the sole originator of new seqn values"). The
    /// sink's very first broadcast therefore still carries `seqn = 0`,
    /// matching every node's initial `beacon_seqn`.
    pub fn beacon_timer_fired(&mut self) -> (OutboundFrame, Duration) {
        let frame = OutboundFrame::Broadcast(
            Beacon { seqn: self.beacon_state.beacon_seqn, metric: self.beacon_state.metric }
                .encode()
                .to_vec(),
        );
        if self.is_sink {
            self.beacon_state.beacon_seqn = self.beacon_state.beacon_seqn.wrapping_add(1);
        }
        let delay = beacon::next_broadcast_delay(&self.beacon_state, None);
        (frame, delay)
    }

    /// The cleanup timer firing: purges stale routes (§4.1 `purge`).
    pub fn cleanup_timer_fired(&mut self, now: Tick) {
        self.rt.purge(now, self.config.cleanup_interval, &mut self.subtree);
    }

    /// The report-batch delay timer firing: applies every buffered report
    /// and, if a parent exists, emits one aggregated report upward
    /// (§4.3 "Ingress batching").
    pub fn report_timer_fired(&mut self, now: Tick) -> Option<OutboundFrame> {
        let applied = topology::apply_batch(&mut self.rt, &mut self.subtree, &mut self.report_buffer, self.is_sink, now);
        if !applied {
            return None;
        }
        topology::emit_report(&self.rt, &self.subtree, &self.beacon_state)
    }

    /// Dispatches a received unicast payload by length (§4.4 "Receive
    /// path" / §6 frame classification).
    pub fn on_unicast_received(&mut self, from: LinkAddr, payload: &[u8], now: Tick) -> ReceiveOutcome {
        let mut outcome = ReceiveOutcome::default();

        match wire::classify_unicast(payload) {
            FrameKind::ChildControl => {
                let Some(control) = ChildControl::decode(payload) else {
                    log::debug!("dispatch: malformed child-control frame from {}", from);
                    return outcome;
                };
                if let Some(frame) = forwarding::on_child_control(
                    &mut self.rt, &mut self.subtree, &self.beacon_state, self.is_sink, from, control, now,
                ) {
                    outcome.frames.push(frame);
                }
            }
            FrameKind::TopologyReport => {
                let Some(report) = wire::TopologyReport::decode(payload) else {
                    log::debug!("dispatch: malformed topology report from {}", from);
                    return outcome;
                };
                if self.report_buffer.push(report, self.config.max_buffered_reports) {
                    outcome.arm_report_timer = true;
                }
            }
            FrameKind::Data => {
                let data_outcome = forwarding::on_data_received(
                    &self.rt, self.is_sink, self.self_addr, &self.config, payload,
                );
                outcome.delivery = data_outcome.delivery;
                if let Some(frame) = data_outcome.forward {
                    outcome.frames.push(frame);
                }
            }
        }

        outcome
    }
}

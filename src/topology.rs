//! Topology-report engine: unicasts subtree membership up the tree and
//! batches inbound reports before applying them (§4.3).

use crate::address::LinkAddr;
use crate::beacon::BeaconState;
use crate::clock::Tick;
use crate::config::SECOND_HAND_RSSI;
use crate::frame::OutboundFrame;
use crate::routing_table::{RouteType, RoutingTable};
use crate::subtree::SubtreeRegistry;
use crate::wire::TopologyReport;

/// Bounded FIFO of reports awaiting the batch-apply timer (§4.3 "Ingress
/// batching"). A full buffer drops the incoming report with a log line,
/// matching the reference's "drop with log" policy for buffer saturation.
#[derive(Debug, Default)]
pub struct ReportBuffer {
    pending: Vec<TopologyReport>,
    timer_armed: bool,
}

impl ReportBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a batch-apply timer needs to be (re-)armed by the
    /// caller — i.e. this is the first report since the last flush.
    pub fn push(&mut self, report: TopologyReport, max_buffered: usize) -> bool {
        if self.pending.len() >= max_buffered {
            log::warn!("topology: report buffer full ({} entries), dropping report from {}",
                max_buffered, report.node);
            return false;
        }
        self.pending.push(report);
        if self.timer_armed {
            false
        } else {
            self.timer_armed = true;
            true
        }
    }

    pub fn take(&mut self) -> Vec<TopologyReport> {
        self.timer_armed = false;
        std::mem::take(&mut self.pending)
    }
}

/// Builds the current outgoing report by pulling live contents from the
/// routing table at send time — never a cached snapshot (§4.3 "Emission
/// triggers").
pub fn build_report(rt: &RoutingTable, subtree: &SubtreeRegistry, metric: u16) -> TopologyReport {
    TopologyReport {
        node: rt.self_addr(),
        metric,
        subtree: subtree.iter().collect(),
    }
}

/// Emits the current subtree as a report to `parent`, if any (§4.3
/// emission triggers a-d).
pub fn emit_report(
    rt: &RoutingTable,
    subtree: &SubtreeRegistry,
    state: &BeaconState,
) -> Option<OutboundFrame> {
    let parent = state.parent?;
    let report = build_report(rt, subtree, state.metric);
    Some(OutboundFrame::Unicast { dest: parent, payload: report.encode().to_vec() })
}

/// Applies one buffered report to the routing table and subtree registry
/// (§4.3 "Per-report apply", steps 1-4).
pub fn apply_report(
    rt: &mut RoutingTable,
    subtree: &mut SubtreeRegistry,
    is_sink: bool,
    report: &TopologyReport,
    now: Tick,
) {
    rt.delete_by_next_hop(report.node, is_sink, subtree);
    rt.add(report.node, report.node, RouteType::Topology, report.metric, SECOND_HAND_RSSI, now);

    for &child in &report.subtree {
        if child.is_null() {
            continue;
        }
        rt.add(child, report.node, RouteType::Topology, report.metric + 1, SECOND_HAND_RSSI, now);
        subtree.insert_if_absent(child);
    }
}

/// Applies every buffered report in arrival order, then reports whether an
/// aggregated upstream report should be emitted (§4.3: "if a parent
/// exists, emit one aggregated report upward").
pub fn apply_batch(
    rt: &mut RoutingTable,
    subtree: &mut SubtreeRegistry,
    buffer: &mut ReportBuffer,
    is_sink: bool,
    now: Tick,
) -> bool {
    let reports = buffer.take();
    if reports.is_empty() {
        return false;
    }
    for report in &reports {
        apply_report(rt, subtree, is_sink, report, now);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;

    fn addr(b: u8) -> LinkAddr {
        LinkAddr::new(0, b)
    }

    #[test]
    fn apply_report_installs_node_and_its_subtree() {
        let mut rt = RoutingTable::new(addr(1), Tick::ZERO);
        let mut subtree = SubtreeRegistry::new(addr(1));
        let report = TopologyReport { node: addr(2), metric: 1, subtree: vec![addr(5), addr(6)] };

        apply_report(&mut rt, &mut subtree, true, &report, Tick::ZERO);

        assert_eq!(rt.get(addr(2)).unwrap().metric, 1);
        assert_eq!(rt.get(addr(5)).unwrap().metric, 2);
        assert_eq!(rt.get(addr(5)).unwrap().next_hop, addr(2));
        assert!(subtree.contains(addr(5)));
        assert!(subtree.contains(addr(6)));
    }

    #[test]
    fn apply_report_scrubs_stale_descendants_of_reparented_node() {
        let mut rt = RoutingTable::new(addr(1), Tick::ZERO);
        let mut subtree = SubtreeRegistry::new(addr(1));
        let first = TopologyReport { node: addr(2), metric: 1, subtree: vec![addr(5)] };
        apply_report(&mut rt, &mut subtree, true, &first, Tick::ZERO);
        assert!(rt.get(addr(5)).is_some());

        // addr(5) moved elsewhere; addr(2)'s new report omits it.
        let second = TopologyReport { node: addr(2), metric: 1, subtree: vec![] };
        apply_report(&mut rt, &mut subtree, true, &second, Tick::ZERO);
        assert!(rt.get(addr(5)).is_none());
        assert!(!subtree.contains(addr(5)));
    }

    #[test]
    fn buffer_arms_timer_only_once_until_drained() {
        let mut buffer = ReportBuffer::new();
        let r = TopologyReport { node: addr(2), metric: 1, subtree: vec![] };
        assert!(buffer.push(r.clone(), 7));
        assert!(!buffer.push(r.clone(), 7));
        let drained = buffer.take();
        assert_eq!(drained.len(), 2);
        assert!(buffer.push(r, 7));
    }

    #[test]
    fn buffer_drops_when_full() {
        let mut buffer = ReportBuffer::new();
        let config = NodeConfig::new();
        for i in 0..config.max_buffered_reports {
            assert!(buffer.push(
                TopologyReport { node: addr(i as u8), metric: 1, subtree: vec![] },
                config.max_buffered_reports,
            ) == (i == 0));
        }
        let dropped = buffer.push(
            TopologyReport { node: addr(99), metric: 1, subtree: vec![] },
            config.max_buffered_reports,
        );
        assert!(!dropped);
        assert_eq!(buffer.take().len(), config.max_buffered_reports);
    }
}

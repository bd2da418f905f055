//! Async driver that owns a [`Connection`] and its timers: a single
//! `tokio::select!` loop is the only code that ever calls into the
//! connection, so the core itself needs no `Arc`/`Mutex` — exactly one
//! task ever touches a given `Connection`. One node here, one task;
//! multiple nodes in a simulation each get their own task and channel
//! pair.

use crate::address::LinkAddr;
use crate::clock::Tick;
use crate::config::NodeConfig;
use crate::connection::Connection;
use crate::frame::{Delivery, OutboundFrame};
use crate::link::LinkLayer;
use crate::wire::Beacon;
use tokio::sync::mpsc;
use tokio::time::{self, Instant as TokioInstant};

/// An inbound frame as the link layer hands it up: sender, payload, and
/// the per-frame RSSI attribute (§6 `packetbuf_*` "read per-frame
/// attributes including RSSI").
pub type InboundFrame = (LinkAddr, Vec<u8>, i16);

pub struct Node {
    conn: Connection,
    link: Box<dyn LinkLayer>,
    start: TokioInstant,
}

pub struct NodeHandles {
    pub broadcast_tx: mpsc::UnboundedSender<InboundFrame>,
    pub unicast_tx: mpsc::UnboundedSender<InboundFrame>,
    pub send_tx: mpsc::UnboundedSender<(LinkAddr, Vec<u8>)>,
    pub delivery_rx: mpsc::UnboundedReceiver<Delivery>,
}

impl Node {
    fn now(&self) -> Tick {
        Tick::from_duration_since_start(TokioInstant::now().duration_since(self.start))
    }

    fn transmit(&self, frame: OutboundFrame) {
        match frame {
            OutboundFrame::Broadcast(payload) => self.link.broadcast_send(&payload),
            OutboundFrame::Unicast { dest, payload } => self.link.unicast_send(&payload, dest),
        }
    }

    /// Spawns the cooperative driver task and returns the channels used to
    /// feed it radio frames and application sends, and to drain
    /// application deliveries (§6 "Application contract").
    pub fn spawn(
        self_addr: LinkAddr,
        is_sink: bool,
        config: NodeConfig,
        link: Box<dyn LinkLayer>,
    ) -> (tokio::task::JoinHandle<()>, NodeHandles) {
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        let (unicast_tx, unicast_rx) = mpsc::unbounded_channel();
        let (send_tx, send_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();

        let start = TokioInstant::now();
        let conn = Connection::open(self_addr, is_sink, config, Tick::ZERO);
        let node = Node { conn, link, start };

        let handle = tokio::spawn(node.run(broadcast_rx, unicast_rx, send_rx, delivery_tx));

        (handle, NodeHandles { broadcast_tx, unicast_tx, send_tx, delivery_rx })
    }

    async fn run(
        mut self,
        mut broadcast_rx: mpsc::UnboundedReceiver<InboundFrame>,
        mut unicast_rx: mpsc::UnboundedReceiver<InboundFrame>,
        mut send_rx: mpsc::UnboundedReceiver<(LinkAddr, Vec<u8>)>,
        delivery_tx: mpsc::UnboundedSender<Delivery>,
    ) {
        let initial_delay = self.conn.beacon_state().current_interval;
        let mut beacon_sleep = Box::pin(time::sleep(initial_delay));
        let mut cleanup_tick = time::interval(self.conn.config_cleanup_interval());
        let mut report_sleep: Option<std::pin::Pin<Box<time::Sleep>>> = None;

        // the sink originates the first beacon immediately on open (§6 `open`:
        // "on the sink, arms the initial beacon broadcast").
        if self.conn.is_sink() {
            beacon_sleep.as_mut().reset(TokioInstant::now());
        }

        loop {
            tokio::select! {
                _ = &mut beacon_sleep => {
                    let (frame, delay) = self.conn.beacon_timer_fired();
                    self.transmit(frame);
                    beacon_sleep.as_mut().reset(TokioInstant::now() + delay);
                }

                _ = cleanup_tick.tick() => {
                    let now = self.now();
                    self.conn.cleanup_timer_fired(now);
                }

                _ = maybe_sleep(&mut report_sleep) => {
                    let now = self.now();
                    if let Some(frame) = self.conn.report_timer_fired(now) {
                        self.transmit(frame);
                    }
                    report_sleep = None;
                }

                Some((sender, payload, rssi)) = broadcast_rx.recv() => {
                    let Some(beacon) = Beacon::decode(&payload) else {
                        log::debug!("runtime: malformed broadcast frame from {}", sender);
                        continue;
                    };
                    let now = self.now();
                    let outcome = self.conn.on_beacon_received(sender, beacon, rssi, now);
                    for frame in outcome.frames {
                        self.transmit(frame);
                    }
                    if let Some(delay) = outcome.reschedule_beacon_after {
                        beacon_sleep.as_mut().reset(TokioInstant::now() + delay);
                    }
                }

                Some((sender, payload, _rssi)) = unicast_rx.recv() => {
                    let now = self.now();
                    let outcome = self.conn.on_unicast_received(sender, &payload, now);
                    for frame in outcome.frames {
                        self.transmit(frame);
                    }
                    if let Some(delivery) = outcome.delivery {
                        let _ = delivery_tx.send(delivery);
                    }
                    if outcome.arm_report_timer {
                        report_sleep = Some(Box::pin(time::sleep(self.conn.config_report_batch_delay())));
                    }
                }

                Some((dest, payload)) = send_rx.recv() => {
                    match self.conn.send(dest, &payload) {
                        Ok(frame) => self.transmit(frame),
                        Err(err) => log::warn!("runtime: {}", err),
                    }
                }

                else => break,
            }
        }
    }

}

/// Polls an optional pending sleep, never resolving when there is none —
/// lets the same `select!` arm cover "report timer armed" and "not armed"
/// without a separate branch.
async fn maybe_sleep(slot: &mut Option<std::pin::Pin<Box<time::Sleep>>>) {
    match slot {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

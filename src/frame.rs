//! What the core asks the link layer to transmit. The core never performs
//! I/O itself (§5); every handler returns the frames it wants sent and
//! lets the caller (`runtime::Node` in production, a test harness in
//! tests) push them onto the wire.

use crate::address::LinkAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Broadcast(Vec<u8>),
    Unicast { dest: LinkAddr, payload: Vec<u8> },
}

/// A delivery handed up to the application when a data packet addressed to
/// this node completes its route (§6 `recv(source, hops)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub source: LinkAddr,
    pub hops: u8,
    pub payload: Vec<u8>,
}

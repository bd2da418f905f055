//! Fixed-width, little-endian wire frames (§6 "Wire frames").
//!
//! Frames are hand-packed rather than run through a general serializer:
//! every frame has a fixed length by contract, and frame *type* is itself
//! inferred from that length by the receive dispatcher, so the format is
//! deliberately as simple as `extend_from_slice` calls can make it.

use crate::address::LinkAddr;
use crate::config::MAX_SUBTREE_SIZE;

pub const ADD_CHILD: u8 = 0xA1;
pub const REMOVE_CHILD: u8 = 0xA2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beacon {
    pub seqn: u16,
    pub metric: u16,
}

impl Beacon {
    pub const LEN: usize = 4;

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..2].copy_from_slice(&self.seqn.to_le_bytes());
        out[2..4].copy_from_slice(&self.metric.to_le_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != Self::LEN {
            return None;
        }
        Some(Beacon {
            seqn: u16::from_le_bytes([buf[0], buf[1]]),
            metric: u16::from_le_bytes([buf[2], buf[3]]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyReport {
    pub node: LinkAddr,
    pub metric: u16,
    pub subtree: Vec<LinkAddr>,
}

impl TopologyReport {
    // addr(2) + metric(2) + subtree_size(2) + subtree[10] * addr(2)
    pub const LEN: usize = 2 + 2 + 2 + MAX_SUBTREE_SIZE * 2;

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..2].copy_from_slice(&self.node.to_bytes());
        out[2..4].copy_from_slice(&self.metric.to_le_bytes());
        out[4..6].copy_from_slice(&(self.subtree.len() as u16).to_le_bytes());
        for (i, slot) in out[6..].chunks_exact_mut(2).enumerate() {
            let addr = self.subtree.get(i).copied().unwrap_or(LinkAddr::NULL);
            slot.copy_from_slice(&addr.to_bytes());
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != Self::LEN {
            return None;
        }
        let node = LinkAddr::from_bytes([buf[0], buf[1]]);
        let metric = u16::from_le_bytes([buf[2], buf[3]]);
        let subtree_size = u16::from_le_bytes([buf[4], buf[5]]) as usize;
        let subtree_size = subtree_size.min(MAX_SUBTREE_SIZE);

        let mut subtree = Vec::with_capacity(subtree_size);
        for chunk in buf[6..].chunks_exact(2).take(subtree_size) {
            let addr = LinkAddr::from_bytes([chunk[0], chunk[1]]);
            if !addr.is_null() {
                subtree.push(addr);
            }
        }

        Some(TopologyReport { node, metric, subtree })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildControlKind {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildControl {
    pub kind: ChildControlKind,
    pub child: LinkAddr,
}

impl ChildControl {
    pub const LEN: usize = 1 + 2;

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0] = match self.kind {
            ChildControlKind::Add => ADD_CHILD,
            ChildControlKind::Remove => REMOVE_CHILD,
        };
        out[1..3].copy_from_slice(&self.child.to_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != Self::LEN {
            return None;
        }
        let kind = match buf[0] {
            ADD_CHILD => ChildControlKind::Add,
            REMOVE_CHILD => ChildControlKind::Remove,
            _ => return None,
        };
        Some(ChildControl {
            kind,
            child: LinkAddr::from_bytes([buf[1], buf[2]]),
        })
    }
}

/// The collection header prepended to every data packet (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectHeader {
    pub source: LinkAddr,
    pub dest: LinkAddr,
    pub hops: u8,
}

impl CollectHeader {
    pub const LEN: usize = 2 + 2 + 1;

    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..2].copy_from_slice(&self.source.to_bytes());
        out[2..4].copy_from_slice(&self.dest.to_bytes());
        out[4] = self.hops;
        out
    }

    pub fn decode(buf: &[u8]) -> Option<(Self, &[u8])> {
        if buf.len() < Self::LEN {
            return None;
        }
        let header = CollectHeader {
            source: LinkAddr::from_bytes([buf[0], buf[1]]),
            dest: LinkAddr::from_bytes([buf[2], buf[3]]),
            hops: buf[4],
        };
        Some((header, &buf[Self::LEN..]))
    }
}

/// What kind of frame a unicast-channel payload is, inferred purely from
/// its length (§6: "types must therefore have distinct lengths").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    ChildControl,
    TopologyReport,
    Data,
}

pub fn classify_unicast(payload: &[u8]) -> FrameKind {
    match payload.len() {
        ChildControl::LEN => FrameKind::ChildControl,
        TopologyReport::LEN => FrameKind::TopologyReport,
        _ => FrameKind::Data,
    }
}

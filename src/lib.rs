//! A sink-rooted convergecast routing core for low-power mesh links.
//!
//! The core (`Connection` and the engines it composes) is synchronous and
//! I/O-free; `runtime::Node` drives it against a real or simulated
//! [`link::LinkLayer`] on a single cooperative task.

pub mod address;
pub mod beacon;
pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod forwarding;
pub mod frame;
pub mod link;
pub mod routing_table;
pub mod runtime;
pub mod subtree;
pub mod topology;
pub mod wire;

pub use address::LinkAddr;
pub use config::NodeConfig;
pub use connection::{Connection, ReceiveOutcome};
pub use error::CollectError;
pub use frame::{Delivery, OutboundFrame};
pub use link::LinkLayer;
pub use routing_table::{RouteType, RoutingEntry, RoutingTable};
pub use runtime::{Node, NodeHandles};

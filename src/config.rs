//! Tunable constants exposed as runtime configuration so tests can shrink
//! intervals without constant forks.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder metric used on child-declared routes (`ADD_CHILD`).
/// Priority arbitration keeps it from overriding a better route for the
/// same destination.
pub const CHILD_DECLARED_METRIC: u16 = 100;

/// Sentinel metric meaning "no parent" / "no known path to sink".
pub const NO_PARENT_METRIC: u16 = 65535;

/// Sentinel RSSI attached to routes learned second-hand from a topology
/// report rather than observed directly.
pub const SECOND_HAND_RSSI: i16 = -95;

pub const MAX_SUBTREE_SIZE: usize = 10;
pub const MAX_BUFFERED_REPORTS: usize = 7;
pub const MAX_PATH_LENGTH: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub rssi_threshold: i16,
    pub max_path_length: u8,
    pub max_subtree_size: usize,
    pub max_buffered_reports: usize,
    pub min_parent_switch_interval: Duration,
    pub beacon_initial_interval: Duration,
    pub beacon_min_interval: Duration,
    pub beacon_max_interval: Duration,
    pub beacon_silent_limit: Duration,
    pub stability_threshold: u8,
    pub cleanup_interval: Duration,
    pub report_batch_delay: Duration,
}

impl NodeConfig {
    pub fn new() -> Self {
        Self {
            rssi_threshold: -95,
            max_path_length: MAX_PATH_LENGTH,
            max_subtree_size: MAX_SUBTREE_SIZE,
            max_buffered_reports: MAX_BUFFERED_REPORTS,
            min_parent_switch_interval: Duration::from_secs(40),
            beacon_initial_interval: Duration::from_secs(15),
            beacon_min_interval: Duration::from_secs(10),
            beacon_max_interval: Duration::from_secs(70),
            beacon_silent_limit: Duration::from_secs(20),
            stability_threshold: 3,
            cleanup_interval: Duration::from_secs(120),
            report_batch_delay: Duration::from_secs(6),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rssi_threshold: -95,
            max_path_length: MAX_PATH_LENGTH,
            max_subtree_size: MAX_SUBTREE_SIZE,
            max_buffered_reports: MAX_BUFFERED_REPORTS,
            min_parent_switch_interval: Duration::from_secs(40),
            beacon_initial_interval: Duration::from_secs(15),
            beacon_min_interval: Duration::from_secs(10),
            beacon_max_interval: Duration::from_secs(70),
            beacon_silent_limit: Duration::from_secs(20),
            stability_threshold: 3,
            cleanup_interval: Duration::from_secs(120),
            report_batch_delay: Duration::from_secs(6),
        }
    }
}

//! The `extmon` metric line written to stdout.
//!
//! Downstream SLA tooling queries these lines by exact token order, names
//! and delimiters. Do not alter the format.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::session::AttemptTimings;

pub const MEASUREMENT: &str = "extmon";
pub const SERVICE: &str = "rri";
pub const ORDER_TYPE: &str = "CHECK";

/// One observation of the registry, success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsLine {
    pub available: bool,
    pub login_ms: u64,
    pub order_ms: u64,
    pub total_ms: u64,
    /// Process start, identical for every line of one invocation.
    pub timestamp: i64,
}

impl MetricsLine {
    pub fn success(timings: &AttemptTimings, started: DateTime<Utc>) -> Self {
        Self {
            available: true,
            login_ms: timings.login_ms,
            order_ms: timings.order_ms,
            total_ms: timings.total_ms(),
            timestamp: started.timestamp(),
        }
    }

    /// All timings zero, `available=0`.
    pub fn failure(started: DateTime<Utc>) -> Self {
        Self {
            available: false,
            login_ms: 0,
            order_ms: 0,
            total_ms: 0,
            timestamp: started.timestamp(),
        }
    }
}

impl fmt::Display for MetricsLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},service={},ordertype={} available={},login={},order={},total={} {}",
            MEASUREMENT,
            SERVICE,
            ORDER_TYPE,
            u8::from(self.available),
            self.login_ms,
            self.order_ms,
            self.total_ms,
            self.timestamp
        )
    }
}

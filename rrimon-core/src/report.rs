//! Human-readable report lines on the log stream plus the metric line on
//! the metrics stream.

use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::RriError;
use crate::metrics::MetricsLine;
use crate::session::AttemptTimings;

/// `HH:MM:SS UTC <message>` followed by a blank line.
pub fn format_log_line(now: DateTime<Utc>, message: &str) -> String {
    format!("{} UTC {}\n\n", now.format("%H:%M:%S"), message)
}

pub fn success_message(timings: &AttemptTimings) -> String {
    format!(
        "OK: RRI login + order: {}ms + {}ms = {}ms",
        timings.login_ms,
        timings.order_ms,
        timings.total_ms()
    )
}

pub fn failure_message(error: &RriError) -> String {
    let mut message = String::from("ERROR:");
    for part in error.messages() {
        message.push(' ');
        message.push_str(&part);
    }
    message
}

/// Writes reports to a metrics sink (stdout) and a log sink (stderr).
///
/// Write failures are logged and otherwise ignored so a closed pipe cannot
/// change the outcome of the probe.
pub struct Reporter<O, E> {
    metrics: O,
    log: E,
    started: DateTime<Utc>,
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(metrics: O, log: E, started: DateTime<Utc>) -> Self {
        Self {
            metrics,
            log,
            started,
        }
    }

    pub fn report_success(&mut self, timings: &AttemptTimings) {
        self.write_log(&success_message(timings));
        self.write_metrics(MetricsLine::success(timings, self.started));
    }

    pub fn report_failure(&mut self, error: &RriError) {
        self.write_log(&failure_message(error));
        self.write_metrics(MetricsLine::failure(self.started));
    }

    pub fn into_inner(self) -> (O, E) {
        (self.metrics, self.log)
    }

    fn write_log(&mut self, message: &str) {
        let line = format_log_line(Utc::now(), message);
        if let Err(e) = self.log.write_all(line.as_bytes()).and_then(|_| self.log.flush()) {
            debug!(error = %e, "Could not write report line");
        }
    }

    fn write_metrics(&mut self, line: MetricsLine) {
        if let Err(e) = writeln!(self.metrics, "{}", line).and_then(|_| self.metrics.flush()) {
            debug!(error = %e, "Could not write metrics line");
        }
    }
}

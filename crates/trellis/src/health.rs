//! Latency tracking and health status.
//!
//! Every resolver call records its wall-clock duration into a fixed-size
//! rolling window. Status is derived from the window average:
//!
//! | average                         | status      |
//! |---------------------------------|-------------|
//! | below `degraded_ratio * budget` | `Healthy`   |
//! | below `budget`                  | `Degraded`  |
//! | at or above `budget`            | `Unhealthy` |
//!
//! Status is reporting only. Slow calls are never rejected.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Reported health of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// Average latency comfortably under budget
    #[default]
    Healthy,

    /// Average latency approaching budget
    Degraded,

    /// Average latency at or over budget
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "HEALTHY",
            Self::Degraded => "DEGRADED",
            Self::Unhealthy => "UNHEALTHY",
        };
        write!(f, "{s}")
    }
}

/// Snapshot of the latency window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// Status derived from `average_latency_ms`
    pub status: HealthStatus,
    /// Mean over the window, 0 when empty
    pub average_latency_ms: f64,
    /// Slowest sample in the window, 0 when empty
    pub max_latency_ms: f64,
    /// Number of samples in the window
    pub samples: usize,
    /// Configured latency budget
    pub budget_ms: f64,
}

/// Rolling window of operation latencies.
#[derive(Debug, Clone)]
pub struct HealthRecorder {
    window: VecDeque<Duration>,
    capacity: usize,
    budget: Duration,
    degraded_ratio: f64,
    last_status: HealthStatus,
}

impl HealthRecorder {
    /// Create a recorder keeping the last `capacity` samples.
    ///
    /// A zero `capacity` is treated as one.
    #[must_use]
    pub fn new(capacity: usize, budget: Duration, degraded_ratio: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            budget,
            degraded_ratio,
            last_status: HealthStatus::Healthy,
        }
    }

    /// Record one operation's duration.
    ///
    /// Logs when the derived status changes.
    pub fn record(&mut self, operation: &str, elapsed: Duration) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(elapsed);

        let status = self.status();
        if status == self.last_status {
            return;
        }

        let average_ms = self.average_ms();
        match status {
            HealthStatus::Healthy => info!(
                operation,
                average_ms,
                previous = %self.last_status,
                "Resolver latency back under budget"
            ),
            HealthStatus::Degraded | HealthStatus::Unhealthy => warn!(
                operation,
                average_ms,
                budget_ms = duration_ms(self.budget),
                status = %status,
                previous = %self.last_status,
                "Resolver latency approaching or over budget"
            ),
        }
        self.last_status = status;
    }

    /// Current status. An empty window is healthy.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        if self.window.is_empty() {
            return HealthStatus::Healthy;
        }
        let average = self.average_ms();
        let budget = duration_ms(self.budget);
        if average < budget * self.degraded_ratio {
            HealthStatus::Healthy
        } else if average < budget {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Snapshot of the window.
    #[must_use]
    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: self.status(),
            average_latency_ms: self.average_ms(),
            max_latency_ms: self.window.iter().copied().max().map_or(0.0, duration_ms),
            samples: self.window.len(),
            budget_ms: duration_ms(self.budget),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn average_ms(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let total: Duration = self.window.iter().sum();
        duration_ms(total) / self.window.len() as f64
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn recorder() -> HealthRecorder {
        HealthRecorder::new(4, ms(100), 0.8)
    }

    #[test]
    fn empty_window_is_healthy() {
        let report = recorder().report();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.samples, 0);
        assert!(report.average_latency_ms.abs() < f64::EPSILON);
    }

    #[rstest]
    #[case::well_under(10, HealthStatus::Healthy)]
    #[case::at_degraded_threshold(80, HealthStatus::Degraded)]
    #[case::just_under_budget(99, HealthStatus::Degraded)]
    #[case::at_budget(100, HealthStatus::Unhealthy)]
    #[case::over_budget(750, HealthStatus::Unhealthy)]
    fn status_follows_average(#[case] latency_ms: u64, #[case] expected: HealthStatus) {
        let mut health = recorder();
        health.record("op", ms(latency_ms));
        assert_eq!(health.status(), expected);
    }

    #[test]
    fn window_forgets_old_samples() {
        let mut health = recorder();
        health.record("slow", ms(1_000));
        assert_eq!(health.status(), HealthStatus::Unhealthy);

        for _ in 0..4 {
            health.record("fast", ms(1));
        }
        let report = health.report();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.samples, 4);
        assert!((report.max_latency_ms - 1.0).abs() < 1e-9);
    }

    #[test]
    fn report_averages_the_window() {
        let mut health = recorder();
        health.record("a", ms(20));
        health.record("b", ms(40));

        let report = health.report();
        assert!((report.average_latency_ms - 30.0).abs() < 1e-9);
        assert!((report.max_latency_ms - 40.0).abs() < 1e-9);
        assert!((report.budget_ms - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_keeps_one_sample() {
        let mut health = HealthRecorder::new(0, ms(100), 0.8);
        health.record("a", ms(500));
        health.record("b", ms(5));
        assert_eq!(health.report().samples, 1);
        assert_eq!(health.status(), HealthStatus::Healthy);
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"UNHEALTHY\""
        );
    }
}

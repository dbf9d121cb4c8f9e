//! Point-in-time copy of the poll counters.

use std::time::Duration;

/// Immutable view of [`super::PollMetrics`] at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub fetch_failures: u64,
    pub observations_processed: u64,
    pub observations_inside: u64,
    pub entries_discarded: u64,
    pub entered: u64,
    pub left: u64,
    pub record_failures: u64,
}

impl TelemetrySnapshot {
    /// Total transitions in both directions.
    pub fn transitions(&self) -> u64 {
        self.entered + self.left
    }

    /// Share of processed observations that were inside, 0.0 when none.
    pub fn inside_rate(&self) -> f64 {
        if self.observations_processed == 0 {
            0.0
        } else {
            self.observations_inside as f64 / self.observations_processed as f64
        }
    }

    /// Uptime as `1h 02m 03s`.
    pub fn uptime_human(&self) -> String {
        let secs = self.uptime.as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;
        if hours > 0 {
            format!("{}h {:02}m {:02}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {:02}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_human() {
        let mut snapshot = TelemetrySnapshot {
            uptime: Duration::from_secs(42),
            ..Default::default()
        };
        assert_eq!(snapshot.uptime_human(), "42s");

        snapshot.uptime = Duration::from_secs(125);
        assert_eq!(snapshot.uptime_human(), "2m 05s");

        snapshot.uptime = Duration::from_secs(3723);
        assert_eq!(snapshot.uptime_human(), "1h 02m 03s");
    }

    #[test]
    fn test_rates() {
        let snapshot = TelemetrySnapshot {
            observations_processed: 4,
            observations_inside: 1,
            entered: 2,
            left: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.transitions(), 3);
        assert!((snapshot.inside_rate() - 0.25).abs() < f64::EPSILON);
        assert_eq!(TelemetrySnapshot::default().inside_rate(), 0.0);
    }
}

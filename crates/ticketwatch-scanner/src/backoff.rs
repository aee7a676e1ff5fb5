//! Waits between searches for an id that has not appeared yet.

use std::sync::Arc;
use std::time::Duration;

/// Ordered list of waits. Replaying it always starts from the first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    steps: Arc<[Duration]>,
}

impl BackoffSchedule {
    /// Create a schedule from its steps.
    #[must_use]
    pub fn new(steps: Vec<Duration>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    /// Start a fresh walk through the schedule.
    #[must_use]
    pub fn start(&self) -> BackoffCursor {
        BackoffCursor {
            steps: Arc::clone(&self.steps),
            index: 0,
        }
    }
}

/// Position within a [`BackoffSchedule`]. Holds at the last step once reached.
#[derive(Debug, Clone)]
pub struct BackoffCursor {
    steps: Arc<[Duration]>,
    index: usize,
}

impl BackoffCursor {
    /// The wait at the current position (zero for an empty schedule).
    #[must_use]
    pub fn current(&self) -> Duration {
        self.steps.get(self.index).copied().unwrap_or_default()
    }

    /// Move to the next step, saturating at the last one.
    pub fn advance(&mut self) {
        if self.index + 1 < self.steps.len() {
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[u64]) -> BackoffSchedule {
        BackoffSchedule::new(values.iter().copied().map(Duration::from_secs).collect())
    }

    #[test]
    fn test_saturates_at_last_step() {
        let schedule = secs(&[10, 30]);
        let mut cursor = schedule.start();

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(cursor.current().as_secs());
            cursor.advance();
        }

        assert_eq!(seen, vec![10, 30, 30]);
    }

    #[test]
    fn test_non_decreasing_for_sorted_schedule() {
        let schedule = secs(&[10, 30, 60, 120, 300]);
        let mut cursor = schedule.start();
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            assert!(cursor.current() >= last);
            last = cursor.current();
            cursor.advance();
        }
        assert_eq!(last, Duration::from_secs(300));
    }

    #[test]
    fn test_restart_begins_at_first_step() {
        let schedule = secs(&[10, 30]);
        let mut cursor = schedule.start();
        cursor.advance();
        assert_eq!(cursor.current(), Duration::from_secs(30));

        assert_eq!(schedule.start().current(), Duration::from_secs(10));
    }

    #[test]
    fn test_cursor_outlives_schedule() {
        let mut cursor = secs(&[5, 15]).start();
        cursor.advance();
        assert_eq!(cursor.current(), Duration::from_secs(15));
    }

    #[test]
    fn test_empty_schedule_waits_zero() {
        let schedule = secs(&[]);
        let mut cursor = schedule.start();
        cursor.advance();
        assert_eq!(cursor.current(), Duration::ZERO);
    }
}

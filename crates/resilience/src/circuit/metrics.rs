//! Sliding window of recent call outcomes.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a single recorded call
#[derive(Debug, Clone, Copy)]
pub struct CallRecord {
    pub success: bool,
    pub at: Instant,
    pub duration: Option<Duration>,
}

/// Bounded window holding the most recent calls, oldest first
#[derive(Debug)]
pub struct CallWindow {
    records: VecDeque<CallRecord>,
    capacity: usize,
}

impl CallWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: CallRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Failure percentage in `[0, 100]`; 0 for an empty window
    pub fn failure_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let failures = self.records.iter().filter(|r| !r.success).count();
        failures as f64 / self.records.len() as f64 * 100.0
    }

    /// Failures since the most recent success
    pub fn consecutive_failures(&self) -> usize {
        self.records
            .iter()
            .rev()
            .take_while(|r| !r.success)
            .count()
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.records.iter().rev().find(|r| !r.success).map(|r| r.at)
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.records.iter().rev().find(|r| r.success).map(|r| r.at)
    }

    /// Mean duration of calls that reported one
    pub fn average_duration(&self) -> Option<Duration> {
        let timed: Vec<Duration> = self.records.iter().filter_map(|r| r.duration).collect();
        if timed.is_empty() {
            return None;
        }
        let total: Duration = timed.iter().sum();
        let nanos = total.as_nanos() / timed.len() as u128;
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool) -> CallRecord {
        CallRecord {
            success,
            at: Instant::now(),
            duration: None,
        }
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = CallWindow::new(3);
        window.push(record(false));
        window.push(record(true));
        window.push(record(true));
        window.push(record(true));
        assert_eq!(window.len(), 3);
        assert_eq!(window.failure_rate(), 0.0);
    }

    #[test]
    fn test_failure_rate_and_streak() {
        let mut window = CallWindow::new(10);
        assert_eq!(window.failure_rate(), 0.0);
        window.push(record(true));
        window.push(record(false));
        window.push(record(false));
        window.push(record(true));
        assert_eq!(window.failure_rate(), 50.0);
        assert_eq!(window.consecutive_failures(), 0);
        window.push(record(false));
        window.push(record(false));
        assert_eq!(window.consecutive_failures(), 2);
        assert!(window.last_failure().is_some());
        assert!(window.last_success().is_some());
    }

    #[test]
    fn test_average_duration() {
        let mut window = CallWindow::new(4);
        assert_eq!(window.average_duration(), None);
        for ms in [100, 300] {
            window.push(CallRecord {
                success: true,
                at: Instant::now(),
                duration: Some(Duration::from_millis(ms)),
            });
        }
        window.push(record(false));
        assert_eq!(window.average_duration(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_average_duration_keeps_remainder() {
        let mut window = CallWindow::new(8);
        for ms in [100, 200, 400] {
            window.push(CallRecord {
                success: true,
                at: Instant::now(),
                duration: Some(Duration::from_millis(ms)),
            });
        }
        assert_eq!(window.average_duration(), Some(Duration::from_nanos(233_333_333)));
    }
}

//! Failure events and the time-windowed tracker behind the circuit breaker.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure family. Each has its own limit and window because their
/// baseline noise rates differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    /// REST request failures: frequent, short window.
    Request,
    /// Push-channel failures: rare, long window.
    Stream,
}

impl FailureCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEvent {
    pub timestamp: DateTime<Utc>,
    /// Adapter identity that failed, e.g. `huobi`.
    pub source: String,
    pub info: String,
}

impl FailureEvent {
    pub fn now(source: &str, info: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.to_string(),
            info: info.to_string(),
        }
    }
}

/// Bounded count of failures inside a trailing time window.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    limit: usize,
    window: Duration,
    /// Oldest first.
    events: VecDeque<FailureEvent>,
}

impl FailureTracker {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            events: VecDeque::new(),
        }
    }

    pub fn record(&mut self, event: FailureEvent) {
        // Reporters race on timestamps; keep the deque ordered anyway.
        let pos = self
            .events
            .iter()
            .rposition(|e| e.timestamp <= event.timestamp)
            .map_or(0, |i| i + 1);
        self.events.insert(pos, event);
    }

    /// Drop events at or before `now - window`.
    pub fn sweep(&mut self, now: DateTime<Utc>) {
        let Ok(window) = chrono::Duration::from_std(self.window) else {
            return;
        };
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return;
        };
        while self
            .events
            .front()
            .is_some_and(|e| e.timestamp <= cutoff)
        {
            self.events.pop_front();
        }
    }

    /// Breach predicate: strictly more events than the limit.
    pub fn is_breach(&self) -> bool {
        self.events.len() > self.limit
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Most recent event, if any.
    pub fn latest(&self) -> Option<&FailureEvent> {
        self.events.back()
    }

    /// One-line summary for logs.
    pub fn status(&self) -> String {
        format!(
            "count: {}, limit: {}, window: {}s",
            self.events.len(),
            self.limit,
            self.window.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_at(ts: DateTime<Utc>) -> FailureEvent {
        FailureEvent {
            timestamp: ts,
            source: "huobi".to_string(),
            info: "timeout".to_string(),
        }
    }

    #[test]
    fn test_breach_is_strictly_greater() {
        let now = Utc::now();
        let mut tracker = FailureTracker::new(60, Duration::from_secs(60));
        for _ in 0..60 {
            tracker.record(event_at(now));
        }
        assert!(!tracker.is_breach());
        tracker.record(event_at(now));
        assert!(tracker.is_breach());
    }

    #[test]
    fn test_sweep_drops_expired_only() {
        let now = Utc::now();
        let mut tracker = FailureTracker::new(10, Duration::from_secs(60));
        tracker.record(event_at(now - chrono::Duration::seconds(120)));
        tracker.record(event_at(now - chrono::Duration::seconds(60)));
        tracker.record(event_at(now - chrono::Duration::seconds(59)));
        tracker.record(event_at(now));
        tracker.sweep(now);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_sweep_idempotent() {
        let now = Utc::now();
        let mut tracker = FailureTracker::new(10, Duration::from_secs(30));
        for secs in [100, 40, 20, 5, 0] {
            tracker.record(event_at(now - chrono::Duration::seconds(secs)));
        }
        tracker.sweep(now);
        let once = tracker.len();
        tracker.sweep(now);
        assert_eq!(tracker.len(), once);
        assert_eq!(once, 3);
    }

    #[test]
    fn test_out_of_order_record_still_swept() {
        let now = Utc::now();
        let mut tracker = FailureTracker::new(10, Duration::from_secs(10));
        tracker.record(event_at(now));
        tracker.record(event_at(now - chrono::Duration::seconds(30)));
        tracker.sweep(now);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.latest().map(|e| e.timestamp), Some(now));
    }
}

//! Circuit Breaker - Failure-Rate Shutdown Trigger
//!
//! Owns one `FailureTracker` per failure category. Every transport
//! reports into it concurrently; a single evaluation task sweeps the
//! trackers on a fixed interval and checks `count > limit`.
//!
//! States:
//! - ARMED: evaluating on every tick
//! - TRIPPED: a category breached; the shutdown directive was written
//!   once and evaluation has stopped for the life of the process
//!
//! Tripping never surfaces as an error to any caller.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::config::BreakerConfig;
use crate::domain::command::ControlCommand;
use crate::domain::failure::{FailureCategory, FailureEvent, FailureTracker};
use crate::ports::control::CommandChannel;
use crate::ports::failure::FailureSink;

/// Breaker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
  Armed,
  Tripped,
}

/// Failure-rate circuit breaker.
pub struct CircuitBreaker {
  /// Trackers keyed by category; many writers, one sweeper.
  trackers: Mutex<BTreeMap<FailureCategory, FailureTracker>>,
  /// Set exactly once, on the first breach.
  tripped: AtomicBool,
  /// Evaluation cadence.
  interval: Duration,
  /// Where the shutdown directive goes.
  commands: Arc<dyn CommandChannel>,
  metrics: Option<Arc<MetricsRegistry>>,
  health: Option<Arc<HealthState>>,
}

impl CircuitBreaker {
  /// Build the two-tier breaker (request + stream) from configuration.
  pub fn new(config: &BreakerConfig, commands: Arc<dyn CommandChannel>) -> Self {
    let mut trackers = BTreeMap::new();
    trackers.insert(
      FailureCategory::Request,
      FailureTracker::new(config.request.limit, config.request.window()),
    );
    trackers.insert(
      FailureCategory::Stream,
      FailureTracker::new(config.stream.limit, config.stream.window()),
    );
    Self::with_trackers(trackers, config.evaluation_interval(), commands)
  }

  /// Build with explicit trackers.
  pub fn with_trackers(
    trackers: BTreeMap<FailureCategory, FailureTracker>,
    interval: Duration,
    commands: Arc<dyn CommandChannel>,
  ) -> Self {
    Self {
      trackers: Mutex::new(trackers),
      tripped: AtomicBool::new(false),
      interval,
      commands,
      metrics: None,
      health: None,
    }
  }

  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  #[must_use]
  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = Some(health);
    self
  }

  fn trackers(&self) -> MutexGuard<'_, BTreeMap<FailureCategory, FailureTracker>> {
    self.trackers.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn state(&self) -> BreakerState {
    if self.tripped.load(Ordering::Acquire) {
      BreakerState::Tripped
    } else {
      BreakerState::Armed
    }
  }

  pub fn is_tripped(&self) -> bool {
    self.state() == BreakerState::Tripped
  }

  /// Append an event to `category`. Unknown categories are ignored.
  pub fn record(&self, category: FailureCategory, event: FailureEvent) {
    let recorded = match self.trackers().get_mut(&category) {
      Some(tracker) => {
        tracker.record(event);
        true
      }
      None => false,
    };
    if recorded {
      if let Some(metrics) = &self.metrics {
        metrics
          .failures_recorded
          .with_label_values(&[category.as_str()])
          .inc();
      }
    } else {
      debug!(%category, "No tracker for failure category");
    }
  }

  /// Events currently held per category.
  pub fn counts(&self) -> BTreeMap<FailureCategory, usize> {
    self
      .trackers()
      .iter()
      .map(|(category, tracker)| (*category, tracker.len()))
      .collect()
  }

  /// Evaluate now.
  pub fn evaluate(&self) -> BreakerState {
    self.evaluate_at(Utc::now())
  }

  /// Sweep every tracker as of `now` and trip on the first breach.
  ///
  /// No-op once tripped.
  pub fn evaluate_at(&self, now: DateTime<Utc>) -> BreakerState {
    if self.is_tripped() {
      return BreakerState::Tripped;
    }

    let breach = {
      let mut trackers = self.trackers();
      let mut breach = None;
      for (category, tracker) in trackers.iter_mut() {
        tracker.sweep(now);
        if let Some(metrics) = &self.metrics {
          metrics
            .failures_in_window
            .with_label_values(&[category.as_str()])
            .set(i64::try_from(tracker.len()).unwrap_or(i64::MAX));
        }
        if breach.is_none() && tracker.is_breach() {
          let latest = tracker
            .latest()
            .map(|e| format!("{}: {}", e.source, e.info))
            .unwrap_or_default();
          breach = Some((*category, tracker.status(), latest));
        }
      }
      breach
    };

    match breach {
      Some((category, status, latest)) => {
        self.trip(category, &status, &latest);
        BreakerState::Tripped
      }
      None => BreakerState::Armed,
    }
  }

  fn trip(&self, category: FailureCategory, status: &str, latest: &str) {
    if self
      .tripped
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return;
    }

    error!(%category, status, latest, "Failure rate breached, requesting shutdown");
    if let Some(metrics) = &self.metrics {
      metrics.breaker_tripped.set(1.0);
    }
    if let Some(health) = &self.health {
      health.set_breaker_tripped();
    }
    if let Err(e) = self.commands.write(ControlCommand::Exit) {
      error!(error = %format!("{e:#}"), "Failed to write shutdown directive");
    }
  }

  /// Evaluate on the configured interval until tripped or `shutdown` fires.
  #[instrument(skip_all, name = "circuit_breaker")]
  pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
    info!(interval_ms = self.interval.as_millis() as u64, "Circuit breaker armed");
    loop {
      tokio::select! {
        () = sleep(self.interval) => {}
        _ = shutdown.wait_for(|stop| *stop) => {
          info!("Circuit breaker evaluation stopped");
          return;
        }
      }
      if self.evaluate() == BreakerState::Tripped {
        info!("Circuit breaker tripped, evaluation ended");
        return;
      }
    }
  }
}

impl FailureSink for CircuitBreaker {
  fn report(&self, category: FailureCategory, source: &str, info: &str) {
    self.record(category, FailureEvent::now(source, info));
  }
}

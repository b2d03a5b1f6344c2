//! Periodic Task Runner - One Callback on Its Own Schedule
//!
//! Each `Worker` drives a single `PeriodicJob` in its own tokio task:
//! - RUNNING: invoke the job, then sleep the interval (zero = yield only)
//! - PAUSED: skip the job and sleep the pause interval
//! - STOPPED: leave the loop at the next iteration boundary
//!
//! A failing or panicking job is logged and followed by the error
//! backoff; it never ends the loop. Stop is cooperative and never
//! interrupts an in-flight job.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::WorkerConfig;

/// Work invoked once per iteration.
#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
  async fn run_once(&self) -> Result<()>;
}

/// Runner lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Stopped,
  Running,
  Paused,
}

/// Timing and enablement of one runner.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
  /// Sleep after a successful invocation.
  pub interval: Duration,
  /// Sleep per iteration while paused.
  pub pause_interval: Duration,
  /// Sleep after a failed invocation.
  pub error_backoff: Duration,
  /// A disabled runner reports RUNNING but never spawns.
  pub enabled: bool,
}

impl WorkerSettings {
  /// Defaults: 1 s pause interval, 5 s error backoff, enabled.
  pub const fn new(interval: Duration) -> Self {
    Self {
      interval,
      pause_interval: Duration::from_secs(1),
      error_backoff: Duration::from_secs(5),
      enabled: true,
    }
  }

  /// Runner timings from the `[worker]` section.
  pub const fn from_config(config: &WorkerConfig, interval: Duration) -> Self {
    Self {
      interval,
      pause_interval: Duration::from_millis(config.pause_interval_ms),
      error_backoff: Duration::from_millis(config.error_backoff_ms),
      enabled: true,
    }
  }

  #[must_use]
  pub const fn disabled(mut self) -> Self {
    self.enabled = false;
    self
  }
}

/// State plus the loop generation it applies to.
#[derive(Debug, Clone, Copy)]
struct Control {
  state: WorkerState,
  generation: u64,
}

/// Periodic task runner.
pub struct Worker {
  /// Owner name used in every log record.
  name: String,
  settings: WorkerSettings,
  job: Arc<dyn PeriodicJob>,
  control: watch::Sender<Control>,
  /// Handle of the most recently spawned loop.
  handle: Mutex<Option<JoinHandle<()>>>,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl Worker {
  pub fn new(name: &str, job: Arc<dyn PeriodicJob>, settings: WorkerSettings) -> Self {
    let (control, _) = watch::channel(Control {
      state: WorkerState::Stopped,
      generation: 0,
    });
    Self {
      name: name.to_string(),
      settings,
      job,
      control,
      handle: Mutex::new(None),
      metrics: None,
    }
  }

  /// Attach a metrics registry for callback failure counts.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn state(&self) -> WorkerState {
    self.control.borrow().state
  }

  /// STOPPED → RUNNING. No-op while RUNNING or PAUSED.
  ///
  /// A loop that is still finishing its last invocation after `stop` is
  /// retired; the new loop begins only once it has exited, so
  /// invocations never overlap.
  pub fn start(&self) {
    if self.state() != WorkerState::Stopped {
      return;
    }

    if !self.settings.enabled {
      self.control.send_modify(|c| c.state = WorkerState::Running);
      info!(worker = %self.name, "Worker not started, disabled");
      return;
    }

    let mut generation = 0;
    self.control.send_modify(|c| {
      c.generation += 1;
      c.state = WorkerState::Running;
      generation = c.generation;
    });

    let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = slot.take().filter(|h| !h.is_finished());
    let runner = LoopRunner {
      name: self.name.clone(),
      settings: self.settings.clone(),
      job: Arc::clone(&self.job),
      control: self.control.subscribe(),
      generation,
      metrics: self.metrics.clone(),
    };
    *slot = Some(tokio::spawn(async move {
      if let Some(previous) = previous {
        if let Err(e) = previous.await {
          error!(worker = %runner.name, error = %e, "Retired worker loop ended abnormally");
        }
      }
      runner.run().await;
    }));

    info!(worker = %self.name, interval_ms = self.settings.interval.as_millis() as u64, "Worker started");
  }

  /// RUNNING → PAUSED.
  pub fn pause(&self, reason: &str) {
    let changed = self.control.send_if_modified(|c| {
      if c.state == WorkerState::Running {
        c.state = WorkerState::Paused;
        true
      } else {
        false
      }
    });
    if changed {
      info!(worker = %self.name, reason, "Worker paused");
    }
  }

  /// PAUSED → RUNNING; starts a stopped runner.
  pub fn resume(&self, reason: &str) {
    let changed = self.control.send_if_modified(|c| {
      if c.state == WorkerState::Paused {
        c.state = WorkerState::Running;
        true
      } else {
        false
      }
    });
    if changed {
      info!(worker = %self.name, reason, "Worker resumed");
    } else {
      self.start();
    }
  }

  /// Any state → STOPPED. The in-flight invocation, if any, completes.
  pub fn stop(&self) {
    let changed = self.control.send_if_modified(|c| {
      if c.state == WorkerState::Stopped {
        false
      } else {
        c.state = WorkerState::Stopped;
        true
      }
    });
    if changed {
      info!(worker = %self.name, "Worker stopped");
    }
  }

  /// Wait for the loop task to exit (returns at once if none was spawned).
  pub async fn join(&self) {
    let handle = self
      .handle
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if let Some(handle) = handle {
      if let Err(e) = handle.await {
        error!(worker = %self.name, error = %e, "Worker task ended abnormally");
      }
    }
  }
}

impl Drop for Worker {
  fn drop(&mut self) {
    self.control.send_modify(|c| c.state = WorkerState::Stopped);
  }
}

/// The spawned half of a worker.
struct LoopRunner {
  name: String,
  settings: WorkerSettings,
  job: Arc<dyn PeriodicJob>,
  control: watch::Receiver<Control>,
  generation: u64,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl LoopRunner {
  /// State for this loop; `Stopped` once a newer loop took over.
  fn current_state(&mut self) -> WorkerState {
    let control = *self.control.borrow_and_update();
    if control.generation == self.generation {
      control.state
    } else {
      WorkerState::Stopped
    }
  }

  async fn run(mut self) {
    loop {
      match self.current_state() {
        WorkerState::Stopped => break,
        WorkerState::Paused => {
          if !self.sleep(self.settings.pause_interval).await {
            break;
          }
          continue;
        }
        WorkerState::Running => {}
      }

      let outcome = AssertUnwindSafe(self.job.run_once()).catch_unwind().await;
      let delay = match outcome {
        Ok(Ok(())) => self.settings.interval,
        Ok(Err(e)) => {
          warn!(worker = %self.name, error = %format!("{e:#}"), "Worker callback failed");
          self.record_error();
          self.settings.error_backoff
        }
        Err(panic) => {
          error!(worker = %self.name, panic = %panic_message(panic.as_ref()), "Worker callback panicked");
          self.record_error();
          self.settings.error_backoff
        }
      };

      if delay.is_zero() {
        tokio::task::yield_now().await;
      } else if !self.sleep(delay).await {
        break;
      }
    }
    info!(worker = %self.name, "Worker loop exited");
  }

  /// Sleep `delay` unless this loop is stopped first. False when stopped.
  async fn sleep(&mut self, delay: Duration) -> bool {
    let generation = self.generation;
    tokio::select! {
      () = sleep(delay) => true,
      _ = self.control.wait_for(|c| c.generation != generation || c.state == WorkerState::Stopped) => false,
    }
  }

  fn record_error(&self) {
    if let Some(metrics) = &self.metrics {
      metrics.worker_errors.with_label_values(&[self.name.as_str()]).inc();
    }
  }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
  panic
    .downcast_ref::<&str>()
    .map(ToString::to_string)
    .or_else(|| panic.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Counter {
    calls: AtomicUsize,
  }

  #[async_trait]
  impl PeriodicJob for Counter {
    async fn run_once(&self) -> Result<()> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  fn counter() -> Arc<Counter> {
    Arc::new(Counter {
      calls: AtomicUsize::new(0),
    })
  }

  #[tokio::test(start_paused = true)]
  async fn test_runs_on_interval_until_stopped() {
    let job = counter();
    let worker = Worker::new("counter", job.clone(), WorkerSettings::new(Duration::from_secs(1)));
    worker.start();
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(job.calls.load(Ordering::SeqCst), 4);

    worker.stop();
    worker.join().await;
    assert_eq!(worker.state(), WorkerState::Stopped);
    let after_stop = job.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(job.calls.load(Ordering::SeqCst), after_stop);
  }

  #[tokio::test(start_paused = true)]
  async fn test_pause_skips_callback() {
    let job = counter();
    let worker = Worker::new("counter", job.clone(), WorkerSettings::new(Duration::from_secs(1)));
    worker.start();
    tokio::time::sleep(Duration::from_millis(500)).await;
    worker.pause("test");
    assert_eq!(worker.state(), WorkerState::Paused);
    let paused_at = job.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(job.calls.load(Ordering::SeqCst), paused_at);

    worker.resume("test");
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(job.calls.load(Ordering::SeqCst) > paused_at);
    worker.stop();
  }

  #[tokio::test(start_paused = true)]
  async fn test_disabled_reports_running_without_invoking() {
    let job = counter();
    let worker = Worker::new(
      "dry",
      job.clone(),
      WorkerSettings::new(Duration::from_secs(1)).disabled(),
    );
    worker.start();
    assert_eq!(worker.state(), WorkerState::Running);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(job.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_zero_interval_runs_back_to_back() {
    let job = counter();
    let worker = Worker::new("spin", job.clone(), WorkerSettings::new(Duration::ZERO));
    worker.start();
    for _ in 0..50 {
      tokio::task::yield_now().await;
    }
    worker.stop();
    worker.join().await;
    assert!(job.calls.load(Ordering::SeqCst) > 1);
  }

  /// Tracks how many invocations are in flight at once.
  struct SlowJob {
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
  }

  #[async_trait]
  impl PeriodicJob for SlowJob {
    async fn run_once(&self) -> Result<()> {
      let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(now_active, Ordering::SeqCst);
      self.calls.fetch_add(1, Ordering::SeqCst);
      sleep(Duration::from_secs(3)).await;
      self.active.fetch_sub(1, Ordering::SeqCst);
      Ok(())
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_restart_mid_invocation_never_overlaps() {
    let job = Arc::new(SlowJob {
      active: AtomicUsize::new(0),
      peak: AtomicUsize::new(0),
      calls: AtomicUsize::new(0),
    });
    let worker = Worker::new("slow", job.clone(), WorkerSettings::new(Duration::from_secs(1)));
    worker.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(job.active.load(Ordering::SeqCst), 1);

    worker.stop();
    worker.start();
    assert_eq!(worker.state(), WorkerState::Running);
    tokio::time::sleep(Duration::from_secs(10)).await;

    worker.stop();
    worker.join().await;
    assert_eq!(job.peak.load(Ordering::SeqCst), 1);
    assert!(job.calls.load(Ordering::SeqCst) >= 3);
    assert_eq!(job.active.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn test_panic_message_extraction() {
    let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
    assert_eq!(panic_message(boxed.as_ref()), "boom");
    let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
    assert_eq!(panic_message(boxed.as_ref()), "bang");
  }
}

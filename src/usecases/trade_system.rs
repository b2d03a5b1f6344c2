//! Trade System - Runner Ownership and Teardown Order
//!
//! Owns the strategy runner and the command-poll runner. Teardown:
//! strategy loop, then command-poll loop, then cancel resting orders.

use std::sync::Arc;

use tracing::{error, info, instrument};

use super::command_processor::CommandProcessor;
use super::grid_strategy::GridStrategy;
use super::worker::{Worker, WorkerSettings, WorkerState};
use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::domain::order::CancelAllAck;

pub struct TradeSystem {
  strategy: Arc<GridStrategy>,
  strategy_worker: Worker,
  command_worker: Worker,
  health: Option<Arc<HealthState>>,
}

impl TradeSystem {
  pub fn new(
    strategy: Arc<GridStrategy>,
    strategy_settings: WorkerSettings,
    commands: Arc<CommandProcessor>,
    command_settings: WorkerSettings,
  ) -> Self {
    Self {
      strategy_worker: Worker::new("grid_strategy", strategy.clone(), strategy_settings),
      command_worker: Worker::new("process_command", commands, command_settings),
      strategy,
      health: None,
    }
  }

  #[must_use]
  pub fn with_metrics(mut self, metrics: &Arc<MetricsRegistry>) -> Self {
    self.strategy_worker = self.strategy_worker.with_metrics(Arc::clone(metrics));
    self.command_worker = self.command_worker.with_metrics(Arc::clone(metrics));
    self
  }

  #[must_use]
  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = Some(health);
    self
  }

  pub fn strategy_state(&self) -> WorkerState {
    self.strategy_worker.state()
  }

  pub fn command_state(&self) -> WorkerState {
    self.command_worker.state()
  }

  /// Start command polling, then the strategy.
  pub fn start(&self) {
    info!(symbol = %self.strategy.symbol(), "Trade system starting");
    self.command_worker.start();
    self.strategy_worker.start();
    if let Some(health) = &self.health {
      health.set_trading(true);
    }
  }

  /// Tear down in order and cancel whatever is still resting.
  ///
  /// Each loop is joined before the next step so the final cancel runs
  /// after the last strategy invocation.
  #[instrument(skip(self), fields(symbol = %self.strategy.symbol()))]
  pub async fn stop(&self) -> Option<CancelAllAck> {
    if let Some(health) = &self.health {
      health.set_trading(false);
    }

    self.strategy_worker.stop();
    self.strategy_worker.join().await;
    self.command_worker.stop();
    self.command_worker.join().await;

    match self.strategy.cancel_resting().await {
      Ok(ack) => {
        info!(succeeded = ack.succeeded, failed = ack.failed, "Trade system stopped");
        Some(ack)
      }
      Err(e) => {
        error!(error = %e, "Final cancel-all failed, orders may still be resting");
        None
      }
    }
  }
}

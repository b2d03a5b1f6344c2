//! Command Processor - Polls the Control Channel
//!
//! Runs as a periodic job. A recognized shutdown token flips the
//! process-wide shutdown signal; anything else is logged and dropped.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use super::worker::PeriodicJob;
use crate::domain::command::ControlCommand;
use crate::ports::control::CommandChannel;

pub struct CommandProcessor {
  channel: Arc<dyn CommandChannel>,
  shutdown: Arc<watch::Sender<bool>>,
}

impl CommandProcessor {
  pub fn new(channel: Arc<dyn CommandChannel>, shutdown: Arc<watch::Sender<bool>>) -> Self {
    Self { channel, shutdown }
  }

  /// Take one pending line and act on it.
  ///
  /// Returns the command that was applied, if any.
  pub fn poll(&self) -> Result<Option<ControlCommand>> {
    let Some(line) = self.channel.take()? else {
      return Ok(None);
    };

    match line.parse::<ControlCommand>() {
      Ok(command) => {
        info!(%command, "Processing command");
        if command.requests_shutdown() {
          self.shutdown.send_replace(true);
        }
        Ok(Some(command))
      }
      Err(tokens) => {
        warn!(line = %tokens, "Unrecognized command ignored");
        Ok(None)
      }
    }
  }
}

#[async_trait]
impl PeriodicJob for CommandProcessor {
  async fn run_once(&self) -> Result<()> {
    self.poll().map(|_| ())
  }
}

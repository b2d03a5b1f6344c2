//! Control Port - the single-line shutdown directive side channel.

use anyhow::Result;

use crate::domain::command::ControlCommand;

/// Side channel carrying one command token at a time.
///
/// The circuit breaker writes to it; the command processor polls it.
pub trait CommandChannel: Send + Sync + 'static {
    /// Replace the channel contents with `command`.
    fn write(&self, command: ControlCommand) -> Result<()>;

    /// Read and clear the pending line. `Ok(None)` when nothing is pending.
    fn take(&self) -> Result<Option<String>>;
}

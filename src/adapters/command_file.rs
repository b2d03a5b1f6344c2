//! Command File - Single-Line Control Channel on Disk
//!
//! The circuit breaker writes a command token here; the command
//! processor polls it. Writes go through a temp file and a rename so a
//! poll never observes a half-written token.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::domain::command::ControlCommand;
use crate::ports::control::CommandChannel;

/// `CommandChannel` backed by a small text file.
pub struct CommandFile {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl CommandFile {
    /// Open the channel, truncating whatever a previous run left behind.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::write(&path, "")
            .with_context(|| format!("Failed to reset command file {}", path.display()))?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");

        info!(path = %path.display(), "Command file ready");
        Ok(Self {
            path,
            tmp_path: PathBuf::from(tmp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandChannel for CommandFile {
    fn write(&self, command: ControlCommand) -> Result<()> {
        fs::write(&self.tmp_path, format!("{}\n", command.token()))
            .context("Failed to write tmp command file")?;
        fs::rename(&self.tmp_path, &self.path).context("Failed to rename command file")?;
        info!(path = %self.path.display(), %command, "Command written");
        Ok(())
    }

    fn take(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        let line = content.lines().next().unwrap_or_default().trim().to_string();
        if line.is_empty() {
            return Ok(None);
        }

        fs::write(&self.path, "").context("Failed to clear command file")?;
        debug!(line = %line, "Command line taken");
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_truncates_stale_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Command.txt");
        fs::write(&path, "exit\n").unwrap();
        let channel = CommandFile::create(&path).unwrap();
        assert_eq!(channel.take().unwrap(), None);
    }

    #[test]
    fn test_write_then_take_clears() {
        let dir = tempfile::tempdir().unwrap();
        let channel = CommandFile::create(dir.path().join("Command.txt")).unwrap();
        channel.write(ControlCommand::Exit).unwrap();
        assert_eq!(channel.take().unwrap().as_deref(), Some("exit"));
        assert_eq!(channel.take().unwrap(), None);
    }

    #[test]
    fn test_take_returns_only_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let channel = CommandFile::create(dir.path().join("Command.txt")).unwrap();
        fs::write(channel.path(), "stop now\nexit\n").unwrap();
        assert_eq!(channel.take().unwrap().as_deref(), Some("stop now"));
    }
}

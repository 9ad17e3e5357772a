use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Stdout => "stdout",
            LogStream::Stderr => "stderr",
        }
    }
}

/// One line of game output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: LogStream,
    pub line: String,
}

/// Observer for game output: `(session_id, line)`. Called from reader tasks,
/// so it must not block.
pub type LogCallback = Arc<dyn Fn(&str, &LogLine) + Send + Sync + 'static>;

/// Diagnostics for a game that died within the startup grace period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrashReport {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Everything the process printed, oldest first.
    pub output: Vec<LogLine>,
}

impl CrashReport {
    pub fn lines(&self, stream: LogStream) -> impl Iterator<Item = &str> {
        self.output
            .iter()
            .filter(move |l| l.stream == stream)
            .map(|l| l.line.as_str())
    }
}

impl fmt::Display for CrashReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "exit code {}", code)?,
            None => write!(f, "terminated by signal")?,
        }
        if let Some(last) = self.lines(LogStream::Stderr).last() {
            write!(f, ": {}", last)?;
        }
        Ok(())
    }
}

/// A running game as recorded in the session registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub version_id: String,
    pub pid: Option<u32>,
    pub profile_name: String,
    pub game_dir: Option<PathBuf>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

/// Handle to a game that survived startup. Supervision is read-only: the
/// handle can wait for the process but never kills it.
#[derive(Debug, Clone)]
pub struct GameSession {
    info: SessionInfo,
    exit: watch::Receiver<Option<ProcessExit>>,
}

impl GameSession {
    pub(crate) fn new(info: SessionInfo, exit: watch::Receiver<Option<ProcessExit>>) -> Self {
        Self { info, exit }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn session_id(&self) -> &str {
        &self.info.session_id
    }

    pub fn pid(&self) -> Option<u32> {
        self.info.pid
    }

    /// `None` while the game is still running.
    pub fn exit_status(&self) -> Option<ProcessExit> {
        *self.exit.borrow()
    }

    /// Resolves with the exit code once the process ends.
    pub async fn wait_for_exit(&self) -> Option<i32> {
        let mut rx = self.exit.clone();
        if rx.wait_for(|exit| exit.is_some()).await.is_err() {
            log::debug!("Exit monitor for session {} went away", self.info.session_id);
        }
        let exit = *rx.borrow();
        exit.and_then(|e| e.code)
    }
}

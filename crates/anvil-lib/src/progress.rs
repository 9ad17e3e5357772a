use tokio::sync::mpsc;

/// A structured progress event emitted by long-running operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Coarse phase name, e.g. `"install"`, `"runtime"`, `"download"`.
    pub phase: String,
    pub current: u64,
    /// `None` when the total is unknown.
    pub max: Option<u64>,
    pub message: Option<String>,
}

impl Progress {
    pub fn status(phase: &str, message: impl Into<String>) -> Self {
        Self {
            phase: phase.to_string(),
            current: 0,
            max: None,
            message: Some(message.into()),
        }
    }

    pub fn step(phase: &str, current: u64, max: Option<u64>) -> Self {
        Self {
            phase: phase.to_string(),
            current,
            max,
            message: None,
        }
    }

    /// Completion in `0..=100`, when the total is known and non-zero.
    pub fn percent(&self) -> Option<u8> {
        match self.max {
            Some(max) if max > 0 => Some(((self.current.min(max) * 100) / max) as u8),
            _ => None,
        }
    }
}

/// Receives progress from the resolver, runtime installer and downloads.
///
/// Implementations must be cheap and non-blocking: they are called from
/// inside download loops.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: Progress);

    /// Polled between steps; returning `true` aborts the running operation.
    fn is_cancelled(&self) -> bool {
        false
    }

    fn status(&self, phase: &str, message: &str) {
        self.report(Progress::status(phase, message));
    }

    fn bytes(&self, phase: &str, transferred: u64, total: Option<u64>) {
        self.report(Progress::step(phase, transferred, total));
    }
}

/// Drops every event.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn report(&self, _progress: Progress) {}
}

/// Forwards events into an unbounded channel so a UI can consume them on its own task.
#[derive(Clone)]
pub struct ChannelProgressReporter {
    tx: mpsc::UnboundedSender<Progress>,
}

impl ChannelProgressReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn report(&self, progress: Progress) {
        // A closed receiver only means nobody is watching any more.
        let _ = self.tx.send(progress);
    }

    fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped_and_optional() {
        assert_eq!(Progress::step("download", 50, Some(200)).percent(), Some(25));
        assert_eq!(Progress::step("download", 300, Some(200)).percent(), Some(100));
        assert_eq!(Progress::step("download", 1, None).percent(), None);
        assert_eq!(Progress::step("download", 1, Some(0)).percent(), None);
    }

    #[tokio::test]
    async fn channel_reporter_delivers_in_order() {
        let (reporter, mut rx) = ChannelProgressReporter::new();
        reporter.status("install", "Installing 1.20.1");
        reporter.bytes("download", 10, Some(20));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.phase, "install");
        assert_eq!(first.message.as_deref(), Some("Installing 1.20.1"));
        let second = rx.recv().await.unwrap();
        assert_eq!((second.current, second.max), (10, Some(20)));

        assert!(!reporter.is_cancelled());
        drop(rx);
        assert!(reporter.is_cancelled());
    }
}

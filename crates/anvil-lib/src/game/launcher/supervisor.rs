use super::authlib::AuthlibInjector;
use super::options::{base_jvm_args, LaunchOptions};
use super::registry::SessionRegistry;
use super::types::{CrashReport, GameSession, LogCallback, LogLine, LogStream, ProcessExit, SessionInfo};
use crate::config::ConfigStore;
use crate::game::distribution::DistributionService;
use crate::game::runtime::RuntimeSpec;
use crate::models::Profile;
use crate::utils::hardware::{logical_cpu_count, total_memory_mb};
use crate::utils::process::{detach_session, quote_for_log};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lines kept for a crash report; older output is dropped first.
const CAPTURE_LIMIT: usize = 2000;
/// How long to wait for pipes to drain after an early exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("No usable Java runtime was found")]
    RuntimeNotFound,

    #[error("Failed to build launch command: {0:#}")]
    Command(#[source] anyhow::Error),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare game directory {path:?}: {source}")]
    GameDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Game exited during startup ({0})")]
    CrashOnStart(CrashReport),
}

/// Bounded buffer of output lines, filled only while a launch is being classified.
struct OutputCapture {
    lines: Mutex<VecDeque<LogLine>>,
    active: AtomicBool,
}

impl OutputCapture {
    fn new() -> Self {
        Self {
            lines: Mutex::new(VecDeque::new()),
            active: AtomicBool::new(true),
        }
    }

    fn push(&self, line: LogLine) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == CAPTURE_LIMIT {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Stop capturing and hand back what was collected.
    fn finish(&self) -> Vec<LogLine> {
        self.active.store(false, Ordering::Release);
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.drain(..).collect()
    }
}

/// Builds launch options, starts the game and tells an immediate crash apart
/// from a successful start.
pub struct LaunchSupervisor {
    distribution: Arc<dyn DistributionService>,
    config: Arc<ConfigStore>,
    authlib: Arc<AuthlibInjector>,
    registry: Arc<SessionRegistry>,
    log_callback: Option<LogCallback>,
}

impl LaunchSupervisor {
    pub fn new(
        distribution: Arc<dyn DistributionService>,
        config: Arc<ConfigStore>,
        authlib: Arc<AuthlibInjector>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            distribution,
            config,
            authlib,
            registry,
            log_callback: None,
        }
    }

    /// Receive every output line of every launched game.
    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Build options for `profile` and start `version_id`.
    pub async fn launch(
        &self,
        version_id: &str,
        profile: &Profile,
        runtime: &RuntimeSpec,
        instance_dir: Option<&Path>,
    ) -> Result<GameSession, LaunchError> {
        if runtime.is_unresolved() {
            return Err(LaunchError::RuntimeNotFound);
        }
        let options = self.build_options(profile, runtime, instance_dir).await;
        self.start(version_id, options).await
    }

    pub async fn build_options(
        &self,
        profile: &Profile,
        runtime: &RuntimeSpec,
        instance_dir: Option<&Path>,
    ) -> LaunchOptions {
        let config = self.config.get().await;

        let physical = total_memory_mb();
        if physical > 0 && u64::from(config.ram) > physical {
            warn!(
                "[launch] Configured RAM {} MiB exceeds physical memory {} MiB",
                config.ram, physical
            );
        }

        let mut jvm_args = base_jvm_args(config.ram, config.fps_boost, logical_cpu_count());
        jvm_args.extend(config.extra_jvm_args());

        let auth_injection = if profile.kind.requires_session_injection() {
            self.authlib.injection().await
        } else {
            None
        };
        if let Some(injection) = &auth_injection {
            jvm_args.push(injection.jvm_arg());
        }

        LaunchOptions {
            profile: profile.clone(),
            client_session_id: uuid::Uuid::new_v4().to_string(),
            runtime: runtime.clone(),
            game_dir: instance_dir.map(Path::to_path_buf),
            jvm_args,
            auth_injection,
        }
    }

    /// Spawn the game for prepared `options` and classify its first moments.
    pub async fn start(&self, version_id: &str, options: LaunchOptions) -> Result<GameSession, LaunchError> {
        if options.runtime.is_unresolved() {
            return Err(LaunchError::RuntimeNotFound);
        }

        if let Some(dir) = options.game_dir() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| LaunchError::GameDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let argv = self
            .distribution
            .build_launch_command(version_id, &options)
            .await
            .map_err(LaunchError::Command)?;
        let Some((program, args)) = argv.split_first() else {
            return Err(LaunchError::Command(anyhow::anyhow!(
                "Distribution returned an empty command for {}",
                version_id
            )));
        };

        info!("[launch] Exec command: {}", loggable_command(&argv, options.access_token()));
        debug!("[launch] Working directory: {:?}", options.game_dir());

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        detach_session(&mut command);
        if let Some(dir) = options.game_dir() {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();
        let session_id = options.client_session_id.clone();
        info!("[launch] Game process started with PID {:?} (session {})", pid, session_id);

        let capture = Arc::new(OutputCapture::new());
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(self.spawn_reader(stdout, LogStream::Stdout, &session_id, &capture));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(self.spawn_reader(stderr, LogStream::Stderr, &session_id, &capture));
        }

        let grace = Duration::from_millis(self.config.get().await.launch_grace_ms);
        tokio::time::sleep(grace).await;

        match child.try_wait() {
            Ok(Some(status)) => {
                for reader in readers {
                    if tokio::time::timeout(DRAIN_TIMEOUT, reader).await.is_err() {
                        debug!("[launch] Output reader still open after exit");
                    }
                }
                let report = CrashReport {
                    exit_code: status.code(),
                    output: capture.finish(),
                };
                error!("[launch] {} exited during startup: {}", version_id, report);
                for line in report.lines(LogStream::Stderr) {
                    error!("[launch] stderr: {}", line);
                }
                return Err(LaunchError::CrashOnStart(report));
            }
            Ok(None) => {}
            Err(e) => warn!("[launch] Could not poll game process, assuming it is running: {}", e),
        }

        // Past the grace period only the observer sees output.
        capture.finish();

        let info = SessionInfo {
            session_id: session_id.clone(),
            version_id: version_id.to_string(),
            pid,
            profile_name: options.username().to_string(),
            game_dir: options.game_dir.clone(),
            started_at: chrono::Utc::now(),
        };
        self.registry.register(info.clone()).await;

        let (exit_tx, exit_rx) = watch::channel(None);
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) if status.success() => {
                    info!("[launch] Session {} (PID {:?}) exited normally", session_id, pid);
                    status.code()
                }
                Ok(status) => {
                    error!("[launch] Session {} (PID {:?}) exited with {}", session_id, pid, status);
                    status.code()
                }
                Err(e) => {
                    error!("[launch] Failed to wait for session {} (PID {:?}): {}", session_id, pid, e);
                    None
                }
            };
            registry.unregister(&session_id).await;
            let _ = exit_tx.send(Some(ProcessExit { code }));
        });

        Ok(GameSession::new(info, exit_rx))
    }

    fn spawn_reader<R>(
        &self,
        reader: R,
        stream: LogStream,
        session_id: &str,
        capture: &Arc<OutputCapture>,
    ) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let session_id = session_id.to_string();
        let capture = capture.clone();
        let callback = self.log_callback.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&buf);
                        let line = LogLine {
                            stream,
                            line: text.trim_end_matches(['\r', '\n']).to_string(),
                        };
                        if let Some(cb) = &callback {
                            cb(&session_id, &line);
                        }
                        capture.push(line);
                    }
                    Err(e) => {
                        debug!("[launch] {} reader for {} stopped: {}", stream.as_str(), session_id, e);
                        break;
                    }
                }
            }
        })
    }
}

/// The command line as a copy-pasteable string with the access token masked.
fn loggable_command(argv: &[String], access_token: Option<&str>) -> String {
    let secret = access_token.filter(|t| !t.is_empty());
    argv.iter()
        .map(|arg| match secret {
            Some(token) if arg.contains(token) => quote_for_log(&arg.replace(token, "<redacted>")),
            _ => quote_for_log(arg),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_is_masked_in_logs() {
        let argv = vec![
            "java".to_string(),
            "--accessToken".to_string(),
            "s3cr3t".to_string(),
            "--gameDir".to_string(),
            "/games/My Pack".to_string(),
        ];
        assert_eq!(
            loggable_command(&argv, Some("s3cr3t")),
            "java --accessToken <redacted> --gameDir \"/games/My Pack\""
        );
        assert_eq!(loggable_command(&argv[..1], Some("")), "java");
    }

    #[test]
    fn capture_is_bounded_and_stops() {
        let capture = OutputCapture::new();
        for i in 0..(CAPTURE_LIMIT + 5) {
            capture.push(LogLine {
                stream: LogStream::Stdout,
                line: i.to_string(),
            });
        }
        let lines = capture.finish();
        assert_eq!(lines.len(), CAPTURE_LIMIT);
        assert_eq!(lines[0].line, "5");

        capture.push(LogLine {
            stream: LogStream::Stderr,
            line: "late".into(),
        });
        assert!(capture.finish().is_empty());
    }
}

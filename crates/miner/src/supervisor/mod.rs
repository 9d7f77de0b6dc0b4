//! Launches the external miner and owns its lifecycle.

mod output;
mod session;

pub use output::{LogSink, OutputSink, OutputStream, TAIL_LINES};
pub use session::{MiningSession, SessionState};

use crate::error::MinerError;
use log::{debug, info, warn};
use output::OutputTail;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// How long buffered output is still read after the miner has exited.
const DRAIN_DEADLINE: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum ChildProcessError {
    #[error("Failed to launch {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Miner {}", describe_exit(.code))]
    Exited { code: Option<i32>, tail: Vec<String> },
    #[error("Miner supervision aborted: {0}")]
    Aborted(String),
}

impl ChildProcessError {
    /// Last lines the miner printed before failing.
    pub fn tail(&self) -> &[String] {
        match self {
            ChildProcessError::Exited { tail, .. } => tail,
            _ => &[],
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub executable: PathBuf,
    pub config_artifact: PathBuf,
    pub coin: String,
    pub wallet: String,
    pub pool_url: String,
}

impl LaunchRequest {
    pub fn config_arg(&self) -> String {
        format!("--config={}", self.config_artifact.display())
    }
}

/// Releases the supervisor's single session slot when dropped.
struct ActiveSlot(Arc<AtomicBool>);

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ProcessSupervisor {
    cancellation_token: CancellationToken,
    grace_period: Duration,
    active: Arc<AtomicBool>,
}

impl ProcessSupervisor {
    /// Sessions started by this supervisor stop when `cancellation_token`
    /// is cancelled.
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            grace_period: DEFAULT_GRACE_PERIOD,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn start(
        &self,
        request: LaunchRequest,
        sink: Arc<dyn OutputSink>,
    ) -> Result<MiningSession, MinerError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MinerError::SessionAlreadyActive);
        }
        let slot = ActiveSlot(self.active.clone());

        let mut child = spawn_miner(&request)?;
        let pid = child.id();
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ChildProcessError::Aborted("miner output pipes unavailable".into()).into());
        };

        info!(
            "Started miner (pid {}) for {} on {}",
            pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string()),
            request.coin,
            request.pool_url
        );

        let (state_tx, state_rx) = watch::channel(SessionState::Running);
        let stop = self.cancellation_token.child_token();
        let worker = tokio::spawn(supervise(
            child,
            BufReader::new(stdout).lines(),
            BufReader::new(stderr).lines(),
            sink,
            stop.clone(),
            self.grace_period,
            state_tx,
            slot,
        ));

        Ok(MiningSession {
            coin: request.coin,
            wallet: request.wallet,
            pool_url: request.pool_url,
            pid,
            state: state_rx,
            stop,
            worker,
        })
    }
}

fn spawn_miner(request: &LaunchRequest) -> Result<Child, ChildProcessError> {
    if !request.config_artifact.is_file() {
        return Err(ChildProcessError::Launch {
            path: request.config_artifact.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "configuration file missing"),
        });
    }

    Command::new(&request.executable)
        .arg(request.config_arg())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ChildProcessError::Launch {
            path: request.executable.clone(),
            source,
        })
}

enum Exit {
    Cancelled,
    Exited(io::Result<std::process::ExitStatus>),
}

#[allow(clippy::too_many_arguments)]
async fn supervise<O, E>(
    mut child: Child,
    mut stdout: Lines<O>,
    mut stderr: Lines<E>,
    sink: Arc<dyn OutputSink>,
    stop: CancellationToken,
    grace_period: Duration,
    state: watch::Sender<SessionState>,
    _slot: ActiveSlot,
) -> Result<(), ChildProcessError>
where
    O: AsyncBufRead + Unpin,
    E: AsyncBufRead + Unpin,
{
    let mut tail = OutputTail::new(TAIL_LINES);
    let mut stdout_open = true;
    let mut stderr_open = true;

    let exit = loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                terminate(&mut child, grace_period).await;
                break Exit::Cancelled;
            }
            line = stdout.next_line(), if stdout_open => {
                stdout_open = forward(line, OutputStream::Stdout, sink.as_ref(), &mut tail);
            }
            line = stderr.next_line(), if stderr_open => {
                stderr_open = forward(line, OutputStream::Stderr, sink.as_ref(), &mut tail);
            }
            status = child.wait() => break Exit::Exited(status),
        }
    };

    // Processes left behind by the miner may keep the pipes open.
    if stdout_open {
        drain(&mut stdout, OutputStream::Stdout, sink.as_ref(), &mut tail).await;
    }
    if stderr_open {
        drain(&mut stderr, OutputStream::Stderr, sink.as_ref(), &mut tail).await;
    }

    let outcome = match exit {
        Exit::Cancelled => {
            info!("Miner stopped");
            Ok(())
        }
        Exit::Exited(Ok(status)) if status.success() => {
            info!("Miner exited cleanly");
            Ok(())
        }
        Exit::Exited(Ok(status)) => Err(ChildProcessError::Exited {
            code: status.code(),
            tail: tail.into_lines(),
        }),
        Exit::Exited(Err(e)) => Err(ChildProcessError::Aborted(e.to_string())),
    };

    state.send_replace(if outcome.is_ok() {
        SessionState::Stopped
    } else {
        SessionState::Failed
    });
    outcome
}

/// Returns whether the stream is still open.
fn forward(
    line: io::Result<Option<String>>,
    stream: OutputStream,
    sink: &dyn OutputSink,
    tail: &mut OutputTail,
) -> bool {
    match line {
        Ok(Some(line)) => {
            sink.line(stream, &line);
            tail.push(stream, &line);
            true
        }
        Ok(None) => false,
        Err(e) => {
            debug!("Stopped reading miner {stream:?}: {e}");
            false
        }
    }
}

async fn drain<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    stream: OutputStream,
    sink: &dyn OutputSink,
    tail: &mut OutputTail,
) {
    let drained = timeout(DRAIN_DEADLINE, async {
        while forward(lines.next_line().await, stream, sink, tail) {}
    })
    .await;
    if drained.is_err() {
        debug!("Gave up draining miner {stream:?} after {DRAIN_DEADLINE:?}");
    }
}

async fn terminate(child: &mut Child, grace_period: Duration) {
    request_termination(child);

    match timeout(grace_period, child.wait()).await {
        Ok(Ok(status)) => debug!("Miner exited after termination request: {status}"),
        Ok(Err(e)) => warn!("Failed to wait for miner: {e}"),
        Err(_) => {
            warn!("Miner still running after {grace_period:?}, killing it");
            if let Err(e) = child.kill().await {
                warn!("Failed to kill miner: {e}");
            }
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        warn!("Miner pid {pid} out of range");
        return;
    };

    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        warn!(
            "Failed to send SIGTERM to miner: {}",
            io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to terminate miner: {e}");
    }
}

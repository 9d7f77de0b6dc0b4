use super::ChildProcessError;
use std::fmt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Running => write!(f, "running"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// A running (or finished) miner process owned by a `ProcessSupervisor`.
///
/// Dropping the session does not stop the miner; call [`MiningSession::stop`]
/// or cancel the supervisor's token.
pub struct MiningSession {
    pub(super) coin: String,
    pub(super) wallet: String,
    pub(super) pool_url: String,
    pub(super) pid: Option<u32>,
    pub(super) state: watch::Receiver<SessionState>,
    pub(super) stop: CancellationToken,
    pub(super) worker: JoinHandle<Result<(), ChildProcessError>>,
}

impl MiningSession {
    pub fn coin(&self) -> &str {
        &self.coin
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn pool_url(&self) -> &str {
        &self.pool_url
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Requests termination: SIGTERM, then a forced kill once the grace
    /// period runs out. Returns immediately; use [`MiningSession::wait`]
    /// to observe the outcome.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Resolves once the miner has exited and its output is drained.
    pub async fn wait(self) -> Result<(), ChildProcessError> {
        match self.worker.await {
            Ok(outcome) => outcome,
            Err(e) => Err(ChildProcessError::Aborted(e.to_string())),
        }
    }
}

impl fmt::Debug for MiningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiningSession")
            .field("coin", &self.coin)
            .field("pool_url", &self.pool_url)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .finish()
    }
}

use crate::acquisition::AcquisitionError;
use crate::device::DetectionError;
use crate::supervisor::ChildProcessError;
use shared::models::UnsupportedCoinError;

#[derive(Debug, thiserror::Error)]
pub enum MinerError {
    #[error("Device detection failed: {0}")]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    UnsupportedCoin(#[from] UnsupportedCoinError),
    #[error("Failed to acquire miner executable: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("A mining session is already active")]
    SessionAlreadyActive,
    #[error("Miner process error: {0}")]
    ChildProcess(#[from] ChildProcessError),
    #[error("System requirements not met")]
    RequirementsNotMet,
    #[error("Missing privilege elevation: {0}")]
    NotElevated(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Environment setup failed: {0:#}")]
    Environment(#[from] anyhow::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MinerError {
    /// Suggested next step for the operator, when there is one.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            MinerError::Detection(err) => Some(err.remediation()),
            MinerError::Acquisition(_) => {
                Some("Check your network connection or pass --xmrig-path")
            }
            MinerError::NotElevated(_) => Some("Re-run as Administrator (or root)"),
            MinerError::RequirementsNotMet => {
                Some("Use --skip-system-checks to continue anyway")
            }
            _ => None,
        }
    }
}

use crate::error::MinerError;
use crate::state::MinerSettings;
use anyhow::{Context, Result};
use log::debug;
use shared::models::MiningConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub const REQUIRED_DIRS: [&str; 3] = ["logs", "config", "data"];
pub const CONFIG_ARTIFACT_FILENAME: &str = "config.json";

/// The working directory layout the miner runs in.
#[derive(Debug, Clone)]
pub struct MinerEnvironment {
    root: PathBuf,
}

impl MinerEnvironment {
    /// Creates `logs/`, `config/` and `data/` under `root` if missing.
    pub fn prepare(root: &Path) -> Result<Self> {
        for dir in REQUIRED_DIRS {
            let path = root.join(dir);
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
        }
        debug!("Mining environment ready at {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Where a downloaded miner is unpacked.
    pub fn install_dir(&self) -> &Path {
        &self.root
    }

    pub fn config_artifact_path(&self) -> PathBuf {
        self.root.join(CONFIG_ARTIFACT_FILENAME)
    }

    pub fn load_settings(&self) -> Result<MinerSettings> {
        MinerSettings::load_or_create(&self.config_dir())
    }

    /// Writes the miner configuration the external process is launched with.
    pub fn write_config_artifact(&self, config: &MiningConfig) -> Result<PathBuf, MinerError> {
        let path = self.config_artifact_path();
        fs::write(&path, config.to_json_pretty()?)?;
        debug!("Wrote miner configuration to {}", path.display());
        Ok(path)
    }
}

mod environment;
mod settings;

pub use environment::{MinerEnvironment, CONFIG_ARTIFACT_FILENAME, REQUIRED_DIRS};
pub use settings::{MinerSettings, SETTINGS_FILENAME};

pub mod acquisition;
pub mod checks;
pub mod cli;
pub mod console;
pub mod device;
pub mod error;
pub mod operations;
pub mod state;
pub mod supervisor;
pub mod utils;

pub use cli::Cli;
pub use error::MinerError;
pub use utils::logging::setup_logging;

pub mod command;
pub mod prompt;

pub use command::Cli;

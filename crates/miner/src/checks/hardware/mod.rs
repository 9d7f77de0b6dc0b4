pub mod memory;
pub mod requirements;
pub mod storage;
pub use requirements::RequirementsChecker;

mod logger;

pub use logger::Console;

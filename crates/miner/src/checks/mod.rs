pub mod hardware;
pub mod issue;
pub mod privilege;

pub mod hardware;
pub mod persist;
pub mod process;
pub mod version;

pub mod authlib;
pub mod options;
pub mod registry;
pub mod supervisor;
pub mod types;

pub use authlib::{AuthlibInjector, AUTHLIB_INJECTOR_URL};
pub use options::{base_jvm_args, AuthInjection, LaunchOptions};
pub use registry::SessionRegistry;
pub use supervisor::{LaunchError, LaunchSupervisor};
pub use types::{CrashReport, GameSession, LogCallback, LogLine, LogStream, ProcessExit, SessionInfo};

pub mod common;
pub mod instance;
pub mod profile;

pub use common::{ContentCategory, LoaderKind};
pub use instance::Instance;
pub use profile::{offline_account_uuid, Profile, ProfileKind};

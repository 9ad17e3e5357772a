//! HTTP plumbing shared by the runtime installer, the add-on registry, the
//! authlib fetcher and the OAuth profile lookup.

pub mod archive;
pub mod download;

use reqwest::Client;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("anvil-launcher/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// A client with the launcher user agent. Connect timeout only: large
/// runtime archives may legitimately take minutes to stream.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
}

pub use download::{download_to_path, download_to_temp, sha1_hex};

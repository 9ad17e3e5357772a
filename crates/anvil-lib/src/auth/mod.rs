//! Player identities: the persisted profile list and the OAuth sign-in flow.

mod callback;
pub mod oauth;
pub mod profiles;

pub use oauth::{AuthHandle, AuthStage, BrowserOpener, OAuthFlow, OAuthProvider};
pub use profiles::{ProfileError, ProfileStore};

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid OAuth configuration: {0}")]
    Config(String),

    #[error("Failed to listen for the OAuth callback on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read the OAuth callback: {0}")]
    Accept(#[source] std::io::Error),

    #[error("No OAuth callback received within {0:?}")]
    Timeout(Duration),

    #[error("OAuth state mismatch, the callback was not issued for this sign-in")]
    CsrfMismatch,

    #[error("Sign-in was denied: {0}")]
    Denied(String),

    #[error("Unexpected callback request: {0}")]
    InvalidCallback(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Profile fetch failed with HTTP {status}: {body}")]
    ProfileFetch { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Profile {0} has no refresh token")]
    NoRefreshToken(String),

    #[error("Sign-in task ended unexpectedly: {0}")]
    Task(String),
}

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

/// How a profile authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Offline,
    #[serde(alias = "elyby")]
    Oauth,
}

impl ProfileKind {
    /// OAuth profiles are validated by a third-party session server, so the
    /// game needs the authlib-injector agent to talk to it.
    pub fn requires_session_injection(&self) -> bool {
        matches!(self, ProfileKind::Oauth)
    }
}

/// A player identity used to launch the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Opaque, stable key of this profile inside the profile store.
    pub id: String,

    #[serde(rename = "name")]
    pub display_name: String,

    #[serde(rename = "uuid")]
    pub account_uuid: String,

    #[serde(rename = "type")]
    pub kind: ProfileKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Profile {
    pub fn offline(display_name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            account_uuid: offline_account_uuid(display_name).to_string(),
            kind: ProfileKind::Offline,
            access_token: None,
            refresh_token: None,
        }
    }

    pub fn oauth(
        display_name: String,
        account_uuid: String,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            display_name,
            account_uuid,
            kind: ProfileKind::Oauth,
            access_token: Some(access_token),
            refresh_token,
        }
    }
}

/// Name-based UUID for offline play: MD5 of `OfflinePlayer:<name>` with the
/// version 3 bits set and no namespace, matching the game server.
pub fn offline_account_uuid(name: &str) -> Uuid {
    let digest: [u8; 16] = Md5::digest(format!("OfflinePlayer:{}", name).as_bytes()).into();
    Builder::from_md5_bytes(digest).into_uuid()
}

use super::types::SessionInfo;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Running game sessions, keyed by session id. Entries are added once a
/// launch survives startup and removed by the exit monitor.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionInfo>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, info: SessionInfo) {
        log::info!("Registering session {} (PID {:?})", info.session_id, info.pid);
        self.sessions.write().await.insert(info.session_id.clone(), info);
    }

    pub async fn unregister(&self, session_id: &str) -> Option<SessionInfo> {
        log::info!("Unregistering session {}", session_id);
        self.sessions.write().await.remove(session_id)
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    pub async fn is_running(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn register_and_unregister() {
        let registry = SessionRegistry::new();
        registry
            .register(SessionInfo {
                session_id: "abc".into(),
                version_id: "1.20.1".into(),
                pid: Some(7),
                profile_name: "Player".into(),
                game_dir: None,
                started_at: Utc::now(),
            })
            .await;

        assert!(registry.is_running("abc").await);
        assert_eq!(registry.list().await.len(), 1);
        assert_eq!(registry.unregister("abc").await.map(|s| s.pid), Some(Some(7)));
        assert!(!registry.is_running("abc").await);
        assert!(registry.get("abc").await.is_none());
    }
}

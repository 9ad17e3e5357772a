use crate::game::runtime::RuntimeSpec;
use crate::models::Profile;
use std::path::{Path, PathBuf};

/// Everything the distribution needs to assemble a command line for one launch.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub profile: Profile,
    /// Fresh for every launch.
    pub client_session_id: String,
    pub runtime: RuntimeSpec,
    /// Working/game directory override. `None` runs in the shared game root.
    pub game_dir: Option<PathBuf>,
    /// In order: heap bounds, tuning flags, user extras, java agent.
    pub jvm_args: Vec<String>,
    pub auth_injection: Option<AuthInjection>,
}

impl LaunchOptions {
    pub fn username(&self) -> &str {
        &self.profile.display_name
    }

    pub fn player_uuid(&self) -> &str {
        &self.profile.account_uuid
    }

    /// Offline profiles have no token; distributions usually pass an empty string.
    pub fn access_token(&self) -> Option<&str> {
        self.profile.access_token.as_deref()
    }

    pub fn game_dir(&self) -> Option<&Path> {
        self.game_dir.as_deref()
    }
}

/// The authlib-injector agent and the auth server it redirects session checks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInjection {
    pub agent_jar: PathBuf,
    pub api_root: String,
}

impl AuthInjection {
    pub fn jvm_arg(&self) -> String {
        format!("-javaagent:{}={}", self.agent_jar.display(), self.api_root)
    }
}

/// Heap bounds, plus the tuning set when `performance` is on.
pub fn base_jvm_args(ram_mb: u32, performance: bool, cpu_count: usize) -> Vec<String> {
    let mut args = vec![format!("-Xmx{}M", ram_mb), "-Xms128M".to_string()];
    if performance {
        args.extend([
            "-XX:+UnlockExperimentalVMOptions".to_string(),
            format!("-XX:ParallelGCThreads={}", cpu_count.max(1) * 2),
            "-XX:+AggressiveOpts".to_string(),
            "-XX:+AggressiveHeap".to_string(),
        ]);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_bounds_come_first() {
        assert_eq!(base_jvm_args(2048, false, 8), vec!["-Xmx2048M", "-Xms128M"]);
    }

    #[test]
    fn performance_set_scales_with_cores() {
        let args = base_jvm_args(4096, true, 6);
        assert_eq!(args[0], "-Xmx4096M");
        assert!(args.contains(&"-XX:ParallelGCThreads=12".to_string()));
        assert!(args.contains(&"-XX:+UnlockExperimentalVMOptions".to_string()));
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn agent_argument_format() {
        let injection = AuthInjection {
            agent_jar: PathBuf::from("/home/p/authlib/authlib-injector.jar"),
            api_root: "ely.by".into(),
        };
        assert_eq!(
            injection.jvm_arg(),
            "-javaagent:/home/p/authlib/authlib-injector.jar=ely.by"
        );
    }
}

use crate::utils::process::hide_console;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// How many directory levels below a runtime root may hide `bin/java`.
const EXECUTABLE_SEARCH_DEPTH: usize = 3;

static VERSION_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"version\s+?.\s*?(\d+)(\.(\d+))?").ok());

/// Executable names to look for, best first. `javaw` has no console window.
fn executable_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["javaw.exe", "java.exe"]
    } else {
        &["java"]
    }
}

/// Find the java executable in a runtime directory. Covers `bin/java`,
/// vendor archives that nest one or two directories deep, and the macOS
/// `Contents/Home/bin` bundle layout.
pub fn find_java_executable(dir: &Path) -> Option<PathBuf> {
    search_executable(dir, EXECUTABLE_SEARCH_DEPTH)
}

fn search_executable(dir: &Path, depth: usize) -> Option<PathBuf> {
    for bin in [dir.join("bin"), dir.join("Contents").join("Home").join("bin")] {
        for name in executable_names() {
            let candidate = bin.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    if depth == 0 {
        return None;
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    subdirs.iter().find_map(|d| search_executable(d, depth - 1))
}

/// Finds a Java already present on the host: `JAVA_HOME`, then well-known
/// install roots (highest directory name first), then `PATH`.
#[derive(Debug, Clone)]
pub struct SystemJavaDetector {
    java_home: Option<PathBuf>,
    search_roots: Vec<PathBuf>,
    use_path: bool,
}

impl SystemJavaDetector {
    pub fn new(java_home: Option<PathBuf>, search_roots: Vec<PathBuf>, use_path: bool) -> Self {
        Self {
            java_home,
            search_roots,
            use_path,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("JAVA_HOME").map(PathBuf::from),
            default_search_roots(),
            true,
        )
    }

    pub fn detect(&self) -> Option<PathBuf> {
        self.java_home_candidate()
            .or_else(|| self.root_candidates().into_iter().next())
            .or_else(|| self.path_candidate())
    }

    /// Every candidate this detector knows about, verified by running it.
    pub fn scan(&self) -> Vec<DetectedJava> {
        let mut seen = HashSet::new();
        self.java_home_candidate()
            .into_iter()
            .chain(self.root_candidates())
            .chain(self.path_candidate())
            .filter(|p| seen.insert(p.clone()))
            .filter_map(|p| match verify_java(&p) {
                Ok(info) => Some(info),
                Err(e) => {
                    log::debug!("Skipping {:?}: {:#}", p, e);
                    None
                }
            })
            .collect()
    }

    fn java_home_candidate(&self) -> Option<PathBuf> {
        let home = self.java_home.as_ref()?;
        executable_names()
            .iter()
            .map(|name| home.join("bin").join(name))
            .find(|p| p.is_file())
    }

    fn root_candidates(&self) -> Vec<PathBuf> {
        let mut found: Vec<(PathBuf, PathBuf)> = Vec::new();
        for root in &self.search_roots {
            let Ok(entries) = std::fs::read_dir(root) else {
                continue;
            };
            for entry in entries.flatten() {
                let lower = entry.file_name().to_string_lossy().to_lowercase();
                if !directory_markers().iter().any(|m| lower.starts_with(m)) || !entry.path().is_dir() {
                    continue;
                }
                if let Some(java) = search_executable(&entry.path(), 1) {
                    found.push((entry.path(), java));
                }
            }
        }
        // Reverse lexicographic order of the install directory stands in for
        // "newest first". It is only a heuristic: `jdk1.8.0` sorts above `jdk-21`.
        found.sort_by(|a, b| b.0.cmp(&a.0));
        found.into_iter().map(|(_, java)| java).collect()
    }

    fn path_candidate(&self) -> Option<PathBuf> {
        if !self.use_path {
            return None;
        }
        let names: &[&str] = if cfg!(windows) { &["javaw", "java"] } else { &["java"] };
        names.iter().find_map(|name| which::which(name).ok())
    }
}

fn default_search_roots() -> Vec<PathBuf> {
    let roots: &[&str] = if cfg!(windows) {
        &[
            "C:\\Program Files\\Java",
            "C:\\Program Files (x86)\\Java",
            "C:\\Program Files\\Eclipse Adoptium",
            "C:\\Users\\Public\\Java",
        ]
    } else if cfg!(target_os = "macos") {
        &["/Library/Java/JavaVirtualMachines"]
    } else {
        &["/usr/lib/jvm", "/usr/java"]
    };
    roots.iter().map(PathBuf::from).collect()
}

fn directory_markers() -> &'static [&'static str] {
    if cfg!(target_os = "linux") {
        &["jdk", "jre", "java-"]
    } else {
        &["jdk", "jre"]
    }
}

/// A Java installation confirmed by running `java -version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedJava {
    pub path: PathBuf,
    pub major_version: u32,
    pub is_64bit: bool,
}

pub fn scan_system_javas() -> Vec<DetectedJava> {
    SystemJavaDetector::from_env().scan()
}

pub fn verify_java(path: &Path) -> Result<DetectedJava> {
    if !path.exists() {
        anyhow::bail!("Java path does not exist: {:?}", path);
    }

    // `-version` prints to stderr.
    let mut command = std::process::Command::new(path);
    command.arg("-version");
    let output = hide_console(&mut command)
        .output()
        .context("Failed to run java -version")?;
    let version_str = String::from_utf8_lossy(&output.stderr);

    let major_version = parse_major_version(&version_str)
        .with_context(|| format!("Could not parse Java version from: {}", version_str))?;
    let is_64bit = ["64-Bit", "x86_64", "amd64", "aarch64"]
        .iter()
        .any(|marker| version_str.contains(marker));

    Ok(DetectedJava {
        path: path.to_path_buf(),
        major_version,
        is_64bit,
    })
}

/// Major version from `java -version` output; `1.8.0_x` is Java 8.
pub fn parse_major_version(version_output: &str) -> Option<u32> {
    let caps = VERSION_RE.as_ref()?.captures(version_output)?;
    let major = caps.get(1)?.as_str().parse::<u32>().ok()?;
    if major == 1 {
        return caps.get(3)?.as_str().parse::<u32>().ok();
    }
    Some(major)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exe() -> &'static str {
        executable_names()[0]
    }

    fn fake_runtime(root: &Path, name: &str) -> PathBuf {
        let bin = root.join(name).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let path = bin.join(exe());
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn parses_version_banners() {
        assert_eq!(parse_major_version("openjdk version \"17.0.9\" 2023-10-17"), Some(17));
        assert_eq!(parse_major_version("java version \"1.8.0_381\""), Some(8));
        assert_eq!(parse_major_version("openjdk version \"21-ea\" 2023-09-19"), Some(21));
        assert_eq!(parse_major_version("garbage"), None);
    }

    #[test]
    fn finds_nested_and_macos_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("zulu17.44/zulu17.44-jre/bin");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join(exe()), b"").unwrap();
        assert_eq!(find_java_executable(dir.path()), Some(nested.join(exe())));

        let mac = tempfile::tempdir().unwrap();
        let home_bin = mac.path().join("Contents/Home/bin");
        std::fs::create_dir_all(&home_bin).unwrap();
        std::fs::write(home_bin.join(exe()), b"").unwrap();
        assert_eq!(find_java_executable(mac.path()), Some(home_bin.join(exe())));
    }

    #[test]
    fn java_home_wins_over_roots() {
        let home = tempfile::tempdir().unwrap();
        let roots = tempfile::tempdir().unwrap();
        let home_java = fake_runtime(home.path(), "");
        fake_runtime(roots.path(), "jdk-21");

        let detector = SystemJavaDetector::new(
            Some(home.path().to_path_buf()),
            vec![roots.path().to_path_buf()],
            false,
        );
        assert_eq!(detector.detect(), Some(home_java));
    }

    #[test]
    fn roots_sort_marked_directories_descending() {
        let roots = tempfile::tempdir().unwrap();
        fake_runtime(roots.path(), "jdk-17.0.2");
        let newest = fake_runtime(roots.path(), "jdk-21.0.1");
        fake_runtime(roots.path(), "graalvm-ce");

        let detector = SystemJavaDetector::new(None, vec![roots.path().to_path_buf()], false);
        assert_eq!(detector.detect(), Some(newest));

        // Plain string order, not version order.
        let legacy = fake_runtime(roots.path(), "jdk1.8.0_381");
        assert_eq!(detector.detect(), Some(legacy));
    }

    #[test]
    fn nothing_found_is_none() {
        let empty = tempfile::tempdir().unwrap();
        let detector = SystemJavaDetector::new(
            Some(empty.path().join("missing")),
            vec![empty.path().to_path_buf()],
            false,
        );
        assert_eq!(detector.detect(), None);
        assert!(detector.scan().is_empty());
    }
}

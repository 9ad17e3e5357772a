use super::detect::find_java_executable;
use super::JavaRequirement;
use crate::net::archive::{extract_tar_gz, extract_zip};
use crate::net::{download_to_temp, http_client};
use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ZULU_API_BASE: &str = "https://api.azul.com/metadata/v1/zulu/packages";

/// Installs a Java runtime for a requirement into a target directory and
/// returns the path of its java executable.
pub trait RuntimeInstaller: Send + Sync {
    fn install<'a>(
        &'a self,
        requirement: &'a JavaRequirement,
        target_dir: &'a Path,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, Result<PathBuf>>;
}

#[derive(Debug, Deserialize)]
struct ZuluPackage {
    download_url: String,
    #[serde(default)]
    java_version: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    fn ext(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }
}

/// Query parameters describing the host for the Azul metadata API.
struct ZuluPlatform {
    os: &'static str,
    arch: &'static str,
    hw_bitness: &'static str,
    archive: ArchiveKind,
}

impl ZuluPlatform {
    fn current() -> Self {
        let os = match std::env::consts::OS {
            "windows" => "windows",
            "macos" => "macos",
            _ => "linux",
        };
        let (arch, hw_bitness) = match std::env::consts::ARCH {
            "aarch64" => ("arm", "64"),
            "arm" => ("arm", "32"),
            "x86" => ("x86", "32"),
            _ => ("x86", "64"),
        };
        let archive = if os == "windows" { ArchiveKind::Zip } else { ArchiveKind::TarGz };
        Self {
            os,
            arch,
            hw_bitness,
            archive,
        }
    }
}

/// Downloads Azul Zulu JRE builds.
pub struct ZuluRuntimeInstaller {
    client: Client,
    api_base: String,
}

impl ZuluRuntimeInstaller {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_base: ZULU_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn find_package(&self, major: u32, platform: &ZuluPlatform) -> Result<ZuluPackage> {
        let major = major.to_string();
        let ext = platform.archive.ext();
        let response = self
            .client
            .get(&self.api_base)
            .query(&[
                ("os", platform.os),
                ("arch", platform.arch),
                ("hw_bitness", platform.hw_bitness),
                ("bundle_type", "jre"),
                ("javafx_bundled", "false"),
                ("java_version", major.as_str()),
                ("ext", ext),
                ("archive_type", ext),
                ("latest", "true"),
                ("release_status", "ga"),
                ("availability_types", "CA"),
                ("certifications", "tck"),
                ("page", "1"),
                ("page_size", "1"),
            ])
            .send()
            .await
            .context("Failed to query Zulu API")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to query Zulu API: HTTP {}", response.status());
        }

        let packages: Vec<ZuluPackage> = response.json().await.context("Invalid Zulu API response")?;
        packages
            .into_iter()
            .next()
            .with_context(|| format!("No Zulu JRE {} package for {}/{}", major, platform.os, platform.arch))
    }

    async fn install_inner(
        &self,
        requirement: &JavaRequirement,
        target_dir: &Path,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<PathBuf> {
        let platform = ZuluPlatform::current();
        let package = self.find_package(requirement.major_version, &platform).await?;
        log::info!(
            "Downloading Zulu JRE {:?} from: {}",
            package.java_version,
            package.download_url
        );

        // The archive is staged on disk beside the component and removed once extracted.
        let staging = target_dir.parent().unwrap_or(target_dir);
        let archive = download_to_temp(
            &self.client,
            &package.download_url,
            staging,
            None,
            Some(reporter.as_ref()),
        )
        .await?;
        if reporter.is_cancelled() {
            anyhow::bail!("Runtime installation cancelled");
        }

        reporter.status("runtime", &format!("Extracting Java {}", requirement.major_version));
        let target = target_dir.to_path_buf();
        let kind = platform.archive;
        let extracted = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            if target.exists() {
                std::fs::remove_dir_all(&target).with_context(|| format!("Failed to clear {:?}", target))?;
            }
            let file = archive.reopen().context("Failed to reopen downloaded archive")?;
            let unpacked = match kind {
                ArchiveKind::Zip => extract_zip(std::io::BufReader::new(file), &target),
                ArchiveKind::TarGz => extract_tar_gz(std::io::BufReader::new(file), &target),
            };
            let java = unpacked.and_then(|_| {
                find_java_executable(&target).context("Could not find java executable after extraction")
            });
            if java.is_err() {
                let _ = std::fs::remove_dir_all(&target);
            }
            java
        })
        .await
        .context("Extraction task panicked")??;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&extracted, std::fs::Permissions::from_mode(0o755))?;
        }

        Ok(extracted)
    }
}

impl RuntimeInstaller for ZuluRuntimeInstaller {
    fn install<'a>(
        &'a self,
        requirement: &'a JavaRequirement,
        target_dir: &'a Path,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, Result<PathBuf>> {
        Box::pin(self.install_inner(requirement, target_dir, reporter))
    }
}

use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;

enum Failure {
    /// Network hiccups, 5xx, truncated bodies.
    Transient(anyhow::Error),
    /// 4xx, hash mismatch, cancellation. Retrying will not help.
    Permanent(anyhow::Error),
}

/// Download `url` into a temporary file created in `dir`, with retries,
/// streaming progress to `reporter` and verifying `expected_sha1` when given.
/// The file is removed when the returned handle drops.
pub async fn download_to_temp(
    client: &Client,
    url: &str,
    dir: &Path,
    expected_sha1: Option<&str>,
    reporter: Option<&dyn ProgressReporter>,
) -> Result<NamedTempFile> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {:?}", dir))?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetch_once(client, url, dir, expected_sha1, reporter).await {
            Ok(file) => return Ok(file),
            Err(Failure::Permanent(e)) => return Err(e),
            Err(Failure::Transient(e)) if attempt >= MAX_ATTEMPTS => {
                return Err(e).context(format!("Failed to download {} after {} attempts", url, attempt));
            }
            Err(Failure::Transient(e)) => {
                log::warn!("Download failed (attempt {}/{}): {:#}. Retrying...", attempt, MAX_ATTEMPTS, e);
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)).await;
            }
        }
    }
}

/// Download `url` next to `dest` and rename it into place once verified.
pub async fn download_to_path(
    client: &Client,
    url: &str,
    dest: &Path,
    expected_sha1: Option<&str>,
    reporter: Option<&dyn ProgressReporter>,
) -> Result<()> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = download_to_temp(client, url, parent, expected_sha1, reporter).await?;
    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move download into {:?}", dest))?;
    Ok(())
}

async fn fetch_once(
    client: &Client,
    url: &str,
    dir: &Path,
    expected_sha1: Option<&str>,
    reporter: Option<&dyn ProgressReporter>,
) -> std::result::Result<NamedTempFile, Failure> {
    log::debug!("Downloading {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Failure::Transient(e.into()))?;

    let status = response.status();
    if status.is_client_error() {
        return Err(Failure::Permanent(anyhow::anyhow!("HTTP error {}: {}", status, url)));
    }
    if !status.is_success() {
        return Err(Failure::Transient(anyhow::anyhow!("HTTP error {}: {}", status, url)));
    }

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))
        .map_err(Failure::Permanent)?;
    let mut file = tmp
        .reopen()
        .map(tokio::fs::File::from_std)
        .map_err(|e| Failure::Permanent(e.into()))?;

    let total = response.content_length();
    let mut downloaded: u64 = 0;
    let mut hasher = Sha1::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if reporter.map(|r| r.is_cancelled()).unwrap_or(false) {
            return Err(Failure::Permanent(anyhow::anyhow!("Download cancelled: {}", url)));
        }
        let chunk = chunk.map_err(|e| Failure::Transient(e.into()))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Failure::Permanent(e.into()))?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        if let Some(rep) = reporter {
            rep.bytes("download", downloaded, total);
        }
    }
    file.flush().await.map_err(|e| Failure::Permanent(e.into()))?;
    file.sync_all().await.map_err(|e| Failure::Permanent(e.into()))?;

    if let Some(expected) = expected_sha1 {
        let computed = hex_digest(hasher);
        if !computed.eq_ignore_ascii_case(expected) {
            return Err(Failure::Permanent(anyhow::anyhow!(
                "SHA1 mismatch for {}: expected {}, got {}",
                url,
                expected,
                computed
            )));
        }
    }

    Ok(tmp)
}

pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex_digest(hasher)
}

fn hex_digest(hasher: Sha1) -> String {
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}

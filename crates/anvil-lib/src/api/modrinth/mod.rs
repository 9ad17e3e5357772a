//! Client for a Modrinth-compatible add-on registry.

pub mod facets;
pub mod types;

pub use facets::{build_facets, facets_json, Facets};
pub use types::{
    resolve_downloadable, ContentDetails, ContentSummary, FileHashes, ProjectType, VersionFile, VersionRecord,
};

use crate::game::instance::{content_path, InstanceError};
use crate::models::{ContentCategory, Instance};
use crate::net::{download_to_path, http_client};
use futures::stream::{self, Stream, TryStreamExt};
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use thiserror::Error;
use types::SearchResponse;

pub const MODRINTH_API_URL: &str = "https://api.modrinth.com/v2";

const DEFAULT_INDEX: &str = "relevance";
const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned HTTP {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Unexpected registry response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Version {0} has no downloadable files")]
    NoDownloadableFile(String),

    #[error("{0} projects cannot be installed into an instance")]
    NotInstallable(ProjectType),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("Download failed: {0:#}")]
    Download(#[source] anyhow::Error),
}

/// A search request. Version and loader filters usually come from the
/// instance the results are meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub text: String,
    pub project_type: ProjectType,
    pub version_filter: Vec<String>,
    pub loader_filter: Vec<String>,
    /// Sort order: `relevance`, `downloads`, `follows`, `newest` or `updated`.
    pub index: String,
    pub limit: u32,
    pub offset: u32,
}

impl ContentQuery {
    pub fn new(text: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            text: text.into(),
            project_type,
            version_filter: Vec::new(),
            loader_filter: Vec::new(),
            index: DEFAULT_INDEX.to_string(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Scope a query to what can run in `instance`.
    pub fn for_instance(text: impl Into<String>, project_type: ProjectType, instance: &Instance) -> Self {
        let mut query = Self::new(text, project_type).versions([instance.base_version.clone()]);
        if instance.loader_kind.is_modded() {
            query = query.loaders([instance.loader_kind.as_str()]);
        }
        query
    }

    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.version_filter = versions.into_iter().map(Into::into).collect();
        self
    }

    pub fn loaders<I, S>(mut self, loaders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loader_filter = loaders.into_iter().map(Into::into).collect();
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn facets(&self) -> Facets {
        build_facets(self.project_type, &self.version_filter, &self.loader_filter)
    }
}

pub struct ContentRegistry {
    client: Client,
    base_url: String,
}

impl ContentRegistry {
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_base_url(MODRINTH_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn search(&self, query: &ContentQuery) -> Result<Vec<ContentSummary>, RegistryError> {
        Ok(self.search_page(query).await?.hits)
    }

    async fn search_page(&self, query: &ContentQuery) -> Result<SearchResponse, RegistryError> {
        let facets = facets_json(&query.facets());
        debug!("[modrinth] search '{}' facets={}", query.text, facets);

        let params = [
            ("query", query.text.clone()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
            ("index", query.index.clone()),
            ("facets", facets),
        ];
        self.get_json(&format!("{}/search", self.base_url), &params)
            .await?
            .ok_or_else(|| RegistryError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                url: format!("{}/search", self.base_url),
                body: String::new(),
            })
    }

    /// All hits for `query`, fetched lazily `page_size` at a time.
    pub fn search_stream<'a>(
        &'a self,
        query: ContentQuery,
        page_size: u32,
    ) -> impl Stream<Item = Result<ContentSummary, RegistryError>> + 'a {
        let page_size = page_size.max(1);
        let first = query.offset;

        stream::try_unfold(Some(first), move |offset| {
            let query = query.clone();
            async move {
                let Some(offset) = offset else {
                    return Ok::<_, RegistryError>(None);
                };
                let page = self.search_page(&query.offset(offset).limit(page_size)).await?;
                let fetched = page.hits.len() as u32;
                let next = offset + fetched;
                let exhausted = fetched < page_size || page.total_hits.is_some_and(|total| u64::from(next) >= total);
                let state = if exhausted { None } else { Some(next) };
                Ok(Some((page.hits, state)))
            }
        })
        .map_ok(|hits| stream::iter(hits.into_iter().map(Ok::<_, RegistryError>)))
        .try_flatten()
    }

    /// Project page, or `None` when the registry does not know `project_id`.
    pub async fn get_details(&self, project_id: &str) -> Result<Option<ContentDetails>, RegistryError> {
        let url = format!("{}/project/{}", self.base_url, project_id);
        self.get_json(&url, &[]).await
    }

    /// Versions of a project, optionally narrowed to loaders and game versions.
    pub async fn get_versions(
        &self,
        project_id: &str,
        loaders: &[String],
        game_versions: &[String],
    ) -> Result<Vec<VersionRecord>, RegistryError> {
        let url = format!("{}/project/{}/version", self.base_url, project_id);
        let mut params = Vec::new();
        if !loaders.is_empty() {
            let loaders: Vec<String> = loaders.iter().map(|l| l.to_lowercase()).collect();
            params.push(("loaders", json_list(&loaders)));
        }
        if !game_versions.is_empty() {
            params.push(("game_versions", json_list(game_versions)));
        }
        Ok(self.get_json(&url, &params).await?.unwrap_or_default())
    }

    /// Download the file of `record` into the matching folder of `instance`.
    pub async fn install_version(
        &self,
        record: &VersionRecord,
        instance: &Instance,
        category: ContentCategory,
    ) -> Result<PathBuf, RegistryError> {
        let file = resolve_downloadable(record).ok_or_else(|| RegistryError::NoDownloadableFile(record.id.clone()))?;
        let dest = content_path(instance, category, &file.filename)?;

        info!(
            "[modrinth] Installing {} {} into {:?}",
            record.project_id, record.version_number, dest
        );
        download_to_path(&self.client, &file.url, &dest, file.hashes.sha1.as_deref(), None)
            .await
            .map_err(RegistryError::Download)?;
        Ok(dest)
    }

    /// Download into the folder implied by the project type of the search.
    pub async fn install_for(
        &self,
        record: &VersionRecord,
        instance: &Instance,
        project_type: ProjectType,
    ) -> Result<PathBuf, RegistryError> {
        let category = project_type
            .category()
            .ok_or(RegistryError::NotInstallable(project_type))?;
        self.install_version(record, instance, category).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, RegistryError> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("[modrinth] {} not found", url);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| RegistryError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

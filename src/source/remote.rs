//! Remote repository fetching with batch optimization.
//!
//! Remote sources are served from a GitHub-style surface: a one-shot branch
//! archive for batches, the raw endpoint for individual files, and the
//! contents API for tree listings. Sources sharing `repo@branch` are grouped
//! and fetched with one combined archive request; on batch failure the group
//! falls back to sequential per-file fetches, with no further retries.
//!
//! Archive contents are held in an in-memory table for the duration of one
//! compile, so edges discovered mid-traversal inside an already-fetched
//! repository never trigger another request.

use anyhow::Result;
use std::collections::HashMap;
use std::io::Read;

use crate::core::BraidError;
use crate::recipe::RemoteSource;

const ARCHIVE_BASE: &str = "https://codeload.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";
const API_BASE: &str = "https://api.github.com";

/// One `repo@branch` fetch group.
pub type GroupKey = (String, String);

/// Client for remote repository content, with a per-compile content table.
pub struct RemoteClient {
    http: reqwest::Client,
    /// Content table: `repo@branch` group -> path -> file content.
    table: HashMap<GroupKey, HashMap<String, String>>,
    /// Groups whose batch archive has been fetched (or attempted).
    prefetched: std::collections::HashSet<GroupKey>,
}

impl Default for RemoteClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteClient {
    /// Create a new client.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("braid/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("default reqwest client configuration is valid");
        Self {
            http,
            table: HashMap::new(),
            prefetched: std::collections::HashSet::new(),
        }
    }

    /// Batch-fetch every group appearing in `sources`.
    ///
    /// One archive request per distinct `repo@branch`; a failed archive
    /// falls back to sequential per-file fetches for that group only. Files
    /// that still fail are dropped with a warning - recoverable, never
    /// fatal.
    pub async fn prefetch(&mut self, sources: &[RemoteSource]) {
        for (group, paths) in group_by_repo(sources) {
            if self.prefetched.contains(&group) {
                continue;
            }
            self.prefetched.insert(group.clone());

            let (repo, branch) = &group;
            match self.fetch_archive(repo, branch).await {
                Ok(bytes) => match extract_archive(&bytes) {
                    Ok(entries) => {
                        tracing::debug!(
                            "batch archive for {repo}@{branch}: {} entries",
                            entries.len()
                        );
                        self.table.insert(group, entries);
                    }
                    Err(e) => {
                        tracing::warn!("unreadable archive for {repo}@{branch}: {e}");
                        self.fallback_fetch(&group, &paths).await;
                    }
                },
                Err(e) => {
                    tracing::warn!("batch fetch failed for {repo}@{branch}: {e}");
                    self.fallback_fetch(&group, &paths).await;
                }
            }
        }
    }

    /// Fetch a single file, preferring the batch content table.
    ///
    /// Misses fall back to one raw fetch; the result is cached either way.
    pub async fn fetch(
        &mut self,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<String, BraidError> {
        let group = (repo.to_string(), branch.to_string());
        if let Some(content) = self.table.get(&group).and_then(|entries| entries.get(path)) {
            return Ok(content.clone());
        }

        let content = self.fetch_raw(repo, branch, path).await?;
        self.table.entry(group).or_default().insert(path.to_string(), content.clone());
        Ok(content)
    }

    /// List the markdown documents directly contained in a repository tree.
    ///
    /// One directory-listing call against the contents API; entries come
    /// back sorted for deterministic expansion order.
    pub async fn list_tree(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<Vec<String>, BraidError> {
        let dir = path.trim_end_matches('/');
        let url = format!("{API_BASE}/repos/{repo}/contents/{dir}?ref={branch}");
        tracing::debug!("listing tree {repo}@{branch}:{dir}");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| fetch_failure(repo, branch, &e.to_string()))?;

        let entries: Vec<serde_json::Value> =
            response.json().await.map_err(|e| fetch_failure(repo, branch, &e.to_string()))?;

        let mut files: Vec<String> = entries
            .iter()
            .filter(|entry| entry.get("type").and_then(|t| t.as_str()) == Some("file"))
            .filter_map(|entry| entry.get("path").and_then(|p| p.as_str()))
            .filter(|path| path.ends_with(".md"))
            .map(String::from)
            .collect();
        files.sort();
        Ok(files)
    }

    async fn fallback_fetch(&mut self, group: &GroupKey, paths: &[String]) {
        let (repo, branch) = group;
        for path in paths {
            match self.fetch_raw(repo, branch, path).await {
                Ok(content) => {
                    self.table.entry(group.clone()).or_default().insert(path.clone(), content);
                }
                Err(e) => {
                    tracing::warn!("dropping {repo}@{branch}:{path}: {e}");
                    eprintln!("Warning: failed to fetch {repo}@{branch}:{path}, dropping it: {e}");
                }
            }
        }
    }

    async fn fetch_archive(&self, repo: &str, branch: &str) -> Result<Vec<u8>, BraidError> {
        let url = format!("{ARCHIVE_BASE}/{repo}/zip/refs/heads/{branch}");
        tracing::debug!("fetching archive {url}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| fetch_failure(repo, branch, &e.to_string()))?;
        let bytes =
            response.bytes().await.map_err(|e| fetch_failure(repo, branch, &e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_raw(&self, repo: &str, branch: &str, path: &str) -> Result<String, BraidError> {
        let url = format!("{RAW_BASE}/{repo}/{branch}/{path}");
        tracing::debug!("fetching file {url}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| fetch_failure(repo, branch, &e.to_string()))?;
        response.text().await.map_err(|e| fetch_failure(repo, branch, &e.to_string()))
    }
}

fn fetch_failure(repo: &str, branch: &str, reason: &str) -> BraidError {
    BraidError::FetchFailure {
        repo: repo.to_string(),
        branch: branch.to_string(),
        reason: reason.to_string(),
    }
}

/// Group declared sources by `repo@branch`, preserving first-appearance
/// order of both groups and paths.
pub fn group_by_repo(sources: &[RemoteSource]) -> Vec<(GroupKey, Vec<String>)> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut groups: HashMap<GroupKey, Vec<String>> = HashMap::new();

    for source in sources {
        let key = (source.repo.clone(), source.branch.clone());
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        let paths = groups.entry(key).or_default();
        if !source.is_tree() && !paths.contains(&source.path) {
            paths.push(source.path.clone());
        }
    }

    order
        .into_iter()
        .map(|key| {
            let paths = groups.remove(&key).unwrap_or_default();
            (key, paths)
        })
        .collect()
}

/// Unpack a branch archive into a path -> content table.
///
/// Archive entries carry a synthetic `repo-branch/` top-level directory; it
/// is stripped so table keys match in-repository paths. Binary entries are
/// skipped.
fn extract_archive(bytes: &[u8]) -> Result<HashMap<String, String>> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)?;
    let mut entries = HashMap::new();

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let Some((_, path)) = name.split_once('/') else {
            continue;
        };
        if path.is_empty() {
            continue;
        }

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        if let Ok(text) = String::from_utf8(buffer) {
            entries.insert(path.to_string(), text);
        }
    }

    Ok(entries)
}

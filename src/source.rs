use crate::error::{FileError, SyncError};
use crate::model::{RemoteFileEntry, TreeListing};
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use reqwest::header::ACCEPT;
use std::time::Duration;

pub const DEFAULT_OWNER: &str = "Fantinati-Anthony";
pub const DEFAULT_REPO: &str = "Chrome-Addons";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_SUBTREE: &str = "AT-Unified-Addon";

pub const RAW_BASE: &str = "https://raw.githubusercontent.com";
pub const API_BASE: &str = "https://api.github.com";

const GITHUB_JSON: &str = "application/vnd.github.v3+json";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DOWNLOAD_STALL_TIMEOUT: Duration = Duration::from_secs(60);

fn client_builder() -> ClientBuilder {
    Client::builder()
        .user_agent(format!("at-toolkit/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
}

/// Client for small metadata and tree requests, capped at two minutes each.
pub fn http_client() -> reqwest::Result<Client> {
    client_builder().timeout(REQUEST_TIMEOUT).build()
}

/// Client for batch downloads. There is no cap on the whole transfer; a
/// request only fails once no bytes arrive for `stall`.
pub fn download_client(stall: Duration) -> reqwest::Result<Client> {
    client_builder().read_timeout(stall).build()
}

/// The GitHub repository subtree the extension is published from.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub subtree: String,
    pub raw_base: String,
    pub api_base: String,
}

impl Default for RemoteSource {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            repo: DEFAULT_REPO.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            subtree: DEFAULT_SUBTREE.to_string(),
            raw_base: RAW_BASE.to_string(),
            api_base: API_BASE.to_string(),
        }
    }
}

impl RemoteSource {
    fn subtree_prefix(&self) -> String {
        let subtree = self.subtree.trim_matches('/');
        if subtree.is_empty() {
            String::new()
        } else {
            format!("{subtree}/")
        }
    }

    pub fn version_url(&self) -> String {
        self.raw_url(&format!("{}version.json", self.subtree_prefix()))
    }

    pub fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch
        )
    }

    pub fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch,
            path.trim_start_matches('/')
        )
    }

    /// Keeps the blobs under the tracked subtree, relative to it.
    pub fn entries_from_listing(&self, listing: TreeListing) -> Vec<RemoteFileEntry> {
        let prefix = self.subtree_prefix();
        listing
            .tree
            .into_iter()
            .filter(|item| item.kind == "blob")
            .filter_map(|item| {
                let relative = item.path.strip_prefix(&prefix)?;
                if !is_safe_relative(relative) {
                    tracing::warn!(path = %item.path, "skipping unsafe path in remote listing");
                    return None;
                }
                Some(RemoteFileEntry {
                    relative_path: relative.to_string(),
                    source_locator: self.raw_url(&item.path),
                })
            })
            .collect()
    }

    pub async fn fetch_file_list(
        &self,
        client: &Client,
    ) -> Result<Vec<RemoteFileEntry>, SyncError> {
        let url = self.tree_url();
        tracing::info!(%url, "fetching remote file list");
        let resp = client
            .get(&url)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| SyncError::ListingFailed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::ListingFailed(format!("GitHub API error: {status}")));
        }
        let listing: TreeListing = resp
            .json()
            .await
            .map_err(|e| SyncError::ListingFailed(e.to_string()))?;
        if listing.truncated {
            tracing::warn!("remote listing was truncated, some files may be missing");
        }
        let entries = self.entries_from_listing(listing);
        if entries.is_empty() {
            return Err(SyncError::ListingFailed(format!(
                "no files found under {}",
                self.subtree_prefix()
            )));
        }
        Ok(entries)
    }

    pub async fn fetch_file(
        &self,
        client: &Client,
        entry: &RemoteFileEntry,
    ) -> Result<Bytes, FileError> {
        let failed = |reason: String| FileError::Download {
            path: entry.relative_path.clone(),
            reason,
        };
        let resp = client
            .get(&entry.source_locator)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(failed(format!("status {status}")));
        }
        resp.bytes().await.map_err(|e| failed(e.to_string()))
    }
}

/// Rejects paths that could land outside the target folder.
pub fn is_safe_relative(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeEntry;

    fn entry(path: &str, kind: &str) -> TreeEntry {
        TreeEntry { path: path.to_string(), kind: kind.to_string() }
    }

    #[test]
    fn urls_follow_github_layout() {
        let src = RemoteSource::default();
        assert_eq!(
            src.version_url(),
            "https://raw.githubusercontent.com/Fantinati-Anthony/Chrome-Addons/main/AT-Unified-Addon/version.json"
        );
        assert_eq!(
            src.tree_url(),
            "https://api.github.com/repos/Fantinati-Anthony/Chrome-Addons/git/trees/main?recursive=1"
        );
    }

    #[test]
    fn listing_keeps_blobs_under_subtree() {
        let src = RemoteSource::default();
        let listing = TreeListing {
            tree: vec![
                entry("README.md", "blob"),
                entry("AT-Unified-Addon", "tree"),
                entry("AT-Unified-Addon/manifest.json", "blob"),
                entry("AT-Unified-Addon/modules", "tree"),
                entry("AT-Unified-Addon/modules/updater.js", "blob"),
                entry("AT-Unified-Addon-old/popup.js", "blob"),
                entry("AT-Unified-Addon/../escape.js", "blob"),
            ],
            truncated: false,
        };
        let entries = src.entries_from_listing(listing);
        let paths: Vec<_> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, ["manifest.json", "modules/updater.js"]);
        assert_eq!(
            entries[1].source_locator,
            "https://raw.githubusercontent.com/Fantinati-Anthony/Chrome-Addons/main/AT-Unified-Addon/modules/updater.js"
        );
    }

    #[test]
    fn unsafe_paths() {
        assert!(is_safe_relative("a/b/c.js"));
        assert!(!is_safe_relative(""));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("a/../../b"));
        assert!(!is_safe_relative("a//b"));
        assert!(!is_safe_relative("a\\b"));
    }
}

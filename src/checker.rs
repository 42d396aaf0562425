use crate::error::CheckError;
use crate::model::{UpdateCheckResult, VersionDescriptor};
use crate::source::RemoteSource;
use crate::store::{self, StateStore};
use crate::version::is_newer;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde_json::json;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub const MARKER_FILE: &str = "manifest.json";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Where the local version used for comparisons came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    Manifest,
    /// No readable manifest, so this tool's own version stands in.
    ToolFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: String,
    pub source: VersionSource,
}

impl InstalledVersion {
    fn fallback() -> Self {
        Self { version: env!("CARGO_PKG_VERSION").to_string(), source: VersionSource::ToolFallback }
    }
}

/// Version of the installed extension: the `version` field of its manifest
/// when an install folder is known, this tool's own version otherwise.
pub fn installed_version(install_dir: Option<&Path>) -> InstalledVersion {
    let Some(dir) = install_dir else {
        return InstalledVersion::fallback();
    };
    let manifest = dir.join(MARKER_FILE);
    let parsed = std::fs::read_to_string(&manifest)
        .map_err(anyhow::Error::from)
        .and_then(|raw| Ok(serde_json::from_str::<serde_json::Value>(&raw)?));
    match parsed {
        Ok(value) => match value.get("version").and_then(|v| v.as_str()) {
            Some(version) => {
                InstalledVersion { version: version.to_string(), source: VersionSource::Manifest }
            }
            None => {
                tracing::warn!(path = %manifest.display(), "manifest has no version field");
                InstalledVersion::fallback()
            }
        },
        Err(e) => {
            tracing::warn!(path = %manifest.display(), "could not read manifest: {e}");
            InstalledVersion::fallback()
        }
    }
}

pub struct UpdateChecker {
    client: Client,
    source: RemoteSource,
    store: StateStore,
    local_version: String,
}

impl UpdateChecker {
    pub fn new(
        client: Client,
        source: RemoteSource,
        store: StateStore,
        local_version: impl Into<String>,
    ) -> Self {
        Self { client, source, store, local_version: local_version.into() }
    }

    async fn fetch_descriptor(&self) -> Result<VersionDescriptor, CheckError> {
        let stamp = chrono::Utc::now().timestamp_millis();
        let resp = self
            .client
            .get(self.source.version_url())
            .query(&[("t", stamp)])
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| CheckError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CheckError::Network(format!("server answered {status}")));
        }
        let body = resp.bytes().await.map_err(|e| CheckError::Network(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| CheckError::Parse(e.to_string()))
    }

    /// Fetches the version descriptor and compares it with the installed
    /// version. Failures come back inside the result and leave the stored
    /// state untouched.
    pub async fn check_for_update(&self) -> UpdateCheckResult {
        let local_version = self.local_version.clone();
        let descriptor = match self.fetch_descriptor().await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("update check failed: {e}");
                return UpdateCheckResult {
                    has_update: false,
                    local_version,
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let has_update = is_newer(&descriptor.version, &local_version);
        if has_update {
            tracing::info!(
                released = ?descriptor.release_date,
                "update available: {} -> {}",
                local_version,
                descriptor.version
            );
        } else {
            tracing::debug!(remote = %descriptor.version, "already up to date");
        }

        let saved = self.store.set([
            (store::LAST_UPDATE_CHECK, json!(chrono::Utc::now().timestamp_millis())),
            (store::REMOTE_VERSION, json!(descriptor.version)),
            (store::HAS_UPDATE, json!(has_update)),
            (store::CHANGELOG, json!(descriptor.changelog)),
        ]);
        if let Err(e) = saved {
            tracing::error!("could not persist update state: {e}");
        }

        UpdateCheckResult {
            has_update,
            local_version,
            remote_version: Some(descriptor.version),
            changelog: Some(descriptor.changelog),
            error: None,
        }
    }

    /// Checks once immediately, then on every tick of `every`, until
    /// `shutdown` resolves.
    pub async fn run_schedule<F, R>(&self, every: Duration, shutdown: F, mut on_result: R)
    where
        F: Future<Output = ()>,
        R: FnMut(&UpdateCheckResult),
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("update schedule stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let result = self.check_for_update().await;
                    on_result(&result);
                }
            }
        }
    }
}

//! Self-update: replace the files of a local extension folder with the
//! latest published ones.
//!
//! A run moves through `Idle -> AwaitingFolderGrant -> FetchingFileList ->
//! Downloading -> Complete`. Folder, marker and listing problems end the run
//! in `Error` before anything is written. Once downloading starts every
//! listed file is attempted; a file that fails to download or write is
//! logged and counted, and the run still completes.

use crate::checker::MARKER_FILE;
use crate::error::SyncError;
use crate::folder::{FolderGrant, FolderPicker, TargetFolder};
use crate::model::{ItemOutcome, ItemStatus};
use crate::source::RemoteSource;
use reqwest::Client;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Idle,
    AwaitingFolderGrant,
    FetchingFileList,
    Downloading {
        processed: usize,
        total: usize,
        current: Option<String>,
    },
    Complete {
        written: usize,
        failed: usize,
    },
    Error(SyncError),
}

#[derive(Debug)]
pub struct SyncReport {
    pub state: SyncState,
    pub outcomes: Vec<ItemOutcome>,
}

impl SyncReport {
    fn ended(state: SyncState) -> Self {
        Self { state, outcomes: Vec::new() }
    }
}

pub struct SelfUpdater {
    client: Client,
    source: RemoteSource,
    marker: String,
}

impl SelfUpdater {
    pub fn new(client: Client, source: RemoteSource) -> Self {
        Self { client, source, marker: MARKER_FILE.to_string() }
    }

    /// Runs one update from folder grant to completion. Every state change
    /// is passed to `observe` before the next step starts.
    pub async fn run<P, O>(&self, picker: &mut P, mut observe: O) -> SyncReport
    where
        P: FolderPicker,
        O: FnMut(&SyncState),
    {
        observe(&SyncState::AwaitingFolderGrant);
        let folder = match picker.request_folder_access().await {
            Ok(FolderGrant::Granted(folder)) => folder,
            Ok(FolderGrant::Cancelled) => {
                tracing::info!("folder selection cancelled");
                let state = SyncState::Idle;
                observe(&state);
                return SyncReport::ended(state);
            }
            Err(e) => return self.fail(e, &mut observe),
        };
        self.sync_into(&folder, observe).await
    }

    /// Same as [`run`](Self::run) for a folder that was already granted.
    pub async fn sync_into<F, O>(&self, folder: &F, mut observe: O) -> SyncReport
    where
        F: TargetFolder,
        O: FnMut(&SyncState),
    {
        if !folder.has_marker_file(&self.marker).await {
            return self.fail(SyncError::InvalidTarget(self.marker.clone()), &mut observe);
        }

        observe(&SyncState::FetchingFileList);
        let files = match self.source.fetch_file_list(&self.client).await {
            Ok(files) => files,
            Err(e) => return self.fail(e, &mut observe),
        };

        let total = files.len();
        tracing::info!(total, "starting file sync");
        observe(&SyncState::Downloading { processed: 0, total, current: None });

        let mut outcomes = Vec::with_capacity(total);
        for (i, entry) in files.iter().enumerate() {
            let attempt = match self.source.fetch_file(&self.client, entry).await {
                Ok(content) => folder.write_file(&entry.relative_path, &content).await,
                Err(e) => Err(e),
            };
            let outcome = match attempt {
                Ok(()) => {
                    tracing::debug!(path = %entry.relative_path, "written");
                    ItemOutcome {
                        item: entry.relative_path.clone(),
                        status: ItemStatus::Written,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::warn!("skipping {}: {e}", entry.relative_path);
                    ItemOutcome {
                        item: entry.relative_path.clone(),
                        status: ItemStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
            observe(&SyncState::Downloading {
                processed: i + 1,
                total,
                current: Some(entry.relative_path.clone()),
            });
        }

        let failed = outcomes.iter().filter(|o| o.failed()).count();
        let state = SyncState::Complete { written: total - failed, failed };
        tracing::info!(written = total - failed, failed, "file sync complete");
        observe(&state);
        SyncReport { state, outcomes }
    }

    fn fail<O: FnMut(&SyncState)>(&self, error: SyncError, observe: &mut O) -> SyncReport {
        tracing::error!("update aborted: {error}");
        let state = SyncState::Error(error);
        observe(&state);
        SyncReport::ended(state)
    }
}

use thiserror::Error;

/// Recovered failures of a single version check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("network error: {0}")]
    Network(String),
    #[error("could not read version descriptor: {0}")]
    Parse(String),
}

/// Failures that end a self-update run in the `Error` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("folder access is not available here: {0}")]
    UnsupportedEnvironment(String),
    #[error("folder access was refused: {0}")]
    FolderRejected(String),
    #[error("this folder does not look like the extension folder ({0} is missing)")]
    InvalidTarget(String),
    #[error("could not retrieve the remote file list: {0}")]
    ListingFailed(String),
}

/// Per-file failure during a sync. Counted and logged, never fatal.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to download {path}: {reason}")]
    Download { path: String, reason: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("refusing to write outside the target folder: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(reqwest::StatusCode),
    #[error("could not save file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("no valid URL found")]
    NoValidUrls,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

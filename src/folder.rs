//! Host-side folder access for the self-updater.

use crate::error::{FileError, SyncError};
use crate::source::is_safe_relative;
use async_trait::async_trait;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

/// A folder the user granted read/write access to.
#[async_trait]
pub trait TargetFolder: Send + Sync {
    async fn has_marker_file(&self, name: &str) -> bool;

    /// Creates `relative` and its parents if absent. Existing content is kept.
    async fn create_subdirectory(&self, relative: &str) -> std::io::Result<()>;

    async fn write_file(&self, relative: &str, content: &[u8]) -> Result<(), FileError>;
}

pub enum FolderGrant<F> {
    Granted(F),
    Cancelled,
}

#[async_trait]
pub trait FolderPicker: Send {
    type Folder: TargetFolder;

    async fn request_folder_access(&mut self) -> Result<FolderGrant<Self::Folder>, SyncError>;
}

#[derive(Debug, Clone)]
pub struct LocalFolder {
    root: PathBuf,
}

impl LocalFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TargetFolder for LocalFolder {
    async fn has_marker_file(&self, name: &str) -> bool {
        tokio::fs::metadata(self.root.join(name))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn create_subdirectory(&self, relative: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(relative)).await
    }

    async fn write_file(&self, relative: &str, content: &[u8]) -> Result<(), FileError> {
        if !is_safe_relative(relative) {
            return Err(FileError::InvalidPath(relative.to_string()));
        }
        let write_err = |source| FileError::Write { path: relative.to_string(), source };
        if let Some((parent, _)) = relative.rsplit_once('/') {
            self.create_subdirectory(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(self.root.join(relative), content)
            .await
            .map_err(write_err)
    }
}

/// Grants access to the folder named on the command line, or asks for one
/// on the terminal. A blank answer cancels.
pub struct CliFolderPicker {
    preset: Option<PathBuf>,
    can_prompt: bool,
}

impl CliFolderPicker {
    /// Prompts only when stdin is a terminal.
    pub fn new(preset: Option<PathBuf>) -> Self {
        Self::with_prompt(preset, std::io::stdin().is_terminal())
    }

    pub fn with_prompt(preset: Option<PathBuf>, can_prompt: bool) -> Self {
        Self { preset, can_prompt }
    }
}

fn prompt_for_folder() -> std::io::Result<Option<PathBuf>> {
    let mut stdout = std::io::stdout();
    write!(stdout, "Extension folder (leave blank to cancel): ")?;
    stdout.flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| PathBuf::from(answer)))
}

fn check_access(path: &Path) -> Result<PathBuf, SyncError> {
    let meta = std::fs::metadata(path)
        .map_err(|e| SyncError::FolderRejected(format!("{}: {e}", path.display())))?;
    if !meta.is_dir() {
        return Err(SyncError::FolderRejected(format!("{} is not a folder", path.display())));
    }
    if meta.permissions().readonly() {
        return Err(SyncError::FolderRejected(format!("{} is read-only", path.display())));
    }
    Ok(path.to_path_buf())
}

#[async_trait]
impl FolderPicker for CliFolderPicker {
    type Folder = LocalFolder;

    async fn request_folder_access(&mut self) -> Result<FolderGrant<LocalFolder>, SyncError> {
        let chosen = match self.preset.take() {
            Some(path) => Some(path),
            None => {
                if !self.can_prompt {
                    return Err(SyncError::UnsupportedEnvironment(
                        "no --folder given and no terminal to ask on".to_string(),
                    ));
                }
                tokio::task::spawn_blocking(prompt_for_folder)
                    .await
                    .map_err(|e| SyncError::UnsupportedEnvironment(e.to_string()))?
                    .map_err(|e| SyncError::UnsupportedEnvironment(e.to_string()))?
            }
        };
        match chosen {
            Some(path) => Ok(FolderGrant::Granted(LocalFolder::new(check_access(&path)?))),
            None => Ok(FolderGrant::Cancelled),
        }
    }
}

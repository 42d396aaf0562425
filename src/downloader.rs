use crate::error::DownloadError;
use async_trait::async_trait;
use futures::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

pub type DownloadId = u64;

/// Something that can fetch one URL to local storage.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn enqueue_download(&self, url: &str) -> Result<DownloadId, DownloadError>;
}

/// Saves each URL into a destination folder under the name taken from the
/// URL, adding ` (n)` when that name is already taken.
pub struct HttpDownloader {
    client: Client,
    dest: PathBuf,
    next_id: AtomicU64,
    progress: Option<MultiProgress>,
}

impl HttpDownloader {
    pub fn new(client: Client, dest: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dest: dest.into(),
            next_id: AtomicU64::new(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    fn progress_bar(&self, len: Option<u64>, name: &str) -> ProgressBar {
        let Some(multi) = &self.progress else {
            return ProgressBar::hidden();
        };
        let pb = multi.add(ProgressBar::new(len.unwrap_or(0)));
        if let Ok(style) =
            ProgressStyle::default_bar().template("{bar:40.cyan/blue} {bytes}/{total_bytes} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(name.to_string());
        pb
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn enqueue_download(&self, url: &str) -> Result<DownloadId, DownloadError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status));
        }

        tokio::fs::create_dir_all(&self.dest).await?;
        let (path, mut out) = reserve_file(&self.dest, &file_name_from_url(url)).await?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let pb = self.progress_bar(resp.content_length(), &name);

        let mut stream = resp.bytes_stream();
        let copied = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                out.write_all(&chunk).await?;
                pb.inc(chunk.len() as u64);
            }
            out.flush().await?;
            Ok::<(), DownloadError>(())
        }
        .await;
        pb.finish_and_clear();

        if let Err(e) = copied {
            drop(out);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        tracing::debug!(id, path = %path.display(), "download saved");
        Ok(id)
    }
}

/// Last path segment of the URL, reduced to a safe file name.
pub fn file_name_from_url(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.rfind(|p| !p.is_empty()).map(str::to_string))
        })
        .unwrap_or_default();
    let cleaned: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned.to_string()
    }
}

fn numbered(name: &str, n: u32) -> String {
    match name.split_once('.') {
        Some((stem, ext)) => format!("{stem} ({n}).{ext}"),
        None => format!("{name} ({n})"),
    }
}

/// Creates the first free `name`, `name (1)`, `name (2)`... in `dir`.
async fn reserve_file(dir: &Path, name: &str) -> std::io::Result<(PathBuf, File)> {
    let mut n = 0;
    loop {
        let candidate = if n == 0 { name.to_string() } else { numbered(name, n) };
        let path = dir.join(&candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

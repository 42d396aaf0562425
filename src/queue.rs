//! Batch downloads with a ceiling on how many run at once.

use crate::downloader::{DownloadId, Downloader};
use crate::error::QueueError;
use crate::model::{ItemOutcome, ItemStatus};
use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

pub const DEFAULT_CONCURRENCY: usize = 3;

const OK_URL_WIDTH: usize = 40;
const FAILED_URL_WIDTH: usize = 30;

static TRANSFER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://\S+$").expect("static regex"));

/// Trims candidates and keeps only non-blank `http(s)://` URLs, in order.
pub fn filter_urls<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .filter_map(|c| {
            let url = c.as_ref().trim();
            TRANSFER_URL.is_match(url).then(|| url.to_string())
        })
        .collect()
}

/// One URL per line.
pub fn parse_url_list(text: &str) -> Vec<String> {
    filter_urls(text.lines())
}

pub fn truncate_url(url: &str, width: usize) -> String {
    match url.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", &url[..cut]),
        None => url.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Started { total: usize, concurrency: usize },
    Succeeded { url: String, id: DownloadId },
    Failed { url: String, error: String },
    Done { succeeded: usize, failed: usize },
}

impl QueueEvent {
    pub fn log_line(&self) -> String {
        match self {
            QueueEvent::Started { total, concurrency } => {
                format!("Starting: {total} file(s), {concurrency} at a time...")
            }
            QueueEvent::Succeeded { url, .. } => format!("OK: {}", truncate_url(url, OK_URL_WIDTH)),
            QueueEvent::Failed { url, error } => {
                format!("Error: {} ({error})", truncate_url(url, FAILED_URL_WIDTH))
            }
            QueueEvent::Done { succeeded, failed } => {
                format!("Done! {succeeded} succeeded, {failed} failed")
            }
        }
    }
}

#[derive(Debug)]
pub struct DownloadQueue {
    pending: VecDeque<String>,
    in_flight: usize,
    limit: usize,
}

impl DownloadQueue {
    /// Builds a batch from raw candidates. A limit of zero means the default.
    pub fn new<I, S>(candidates: I, limit: usize) -> Result<Self, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pending: VecDeque<String> = filter_urls(candidates).into();
        if pending.is_empty() {
            return Err(QueueError::NoValidUrls);
        }
        let limit = if limit == 0 { DEFAULT_CONCURRENCY } else { limit };
        Ok(Self { pending, in_flight: 0, limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs the whole batch. Up to `limit` downloads start in input order;
    /// each completion, success or failure, starts the next queued URL.
    pub async fn run<D, F>(mut self, downloader: &D, mut on_event: F) -> Vec<ItemOutcome>
    where
        D: Downloader + ?Sized,
        F: FnMut(&QueueEvent),
    {
        let total = self.pending.len();
        on_event(&QueueEvent::Started { total, concurrency: self.limit });

        let dispatch = |url: String| async move {
            let result = downloader.enqueue_download(&url).await;
            (url, result)
        };

        let mut running = FuturesUnordered::new();
        while self.in_flight < self.limit {
            let Some(url) = self.pending.pop_front() else { break };
            running.push(dispatch(url));
            self.in_flight += 1;
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some((url, result)) = running.next().await {
            self.in_flight -= 1;
            let event = match result {
                Ok(id) => {
                    tracing::info!(%url, id, "download finished");
                    outcomes.push(ItemOutcome { item: url.clone(), status: ItemStatus::Ok, error: None });
                    QueueEvent::Succeeded { url, id }
                }
                Err(e) => {
                    tracing::warn!(%url, "download failed: {e}");
                    outcomes.push(ItemOutcome {
                        item: url.clone(),
                        status: ItemStatus::Failed,
                        error: Some(e.to_string()),
                    });
                    QueueEvent::Failed { url, error: e.to_string() }
                }
            };
            on_event(&event);

            if let Some(next) = self.pending.pop_front() {
                running.push(dispatch(next));
                self.in_flight += 1;
            }
        }

        debug_assert!(self.pending.is_empty() && self.in_flight == 0);
        let failed = outcomes.iter().filter(|o| o.failed()).count();
        on_event(&QueueEvent::Done { succeeded: total - failed, failed });
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DownloadError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        current: AtomicUsize,
        peak: AtomicUsize,
        started: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Downloader for Recorder {
        async fn enqueue_download(&self, url: &str) -> Result<DownloadId, DownloadError> {
            self.started.lock().unwrap().push(url.to_string());
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let n: u64 = url.rsplit('/').next().unwrap().parse().unwrap();
            tokio::time::sleep(Duration::from_millis(5 + (n * 7) % 20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            if n % 4 == 0 {
                let io = std::io::Error::other("simulated failure");
                Err(DownloadError::Io(io))
            } else {
                Ok(n)
            }
        }
    }

    fn batch(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://example.com/files/{i}")).collect()
    }

    #[test]
    fn filters_blank_and_foreign_schemes() {
        let urls = parse_url_list(
            "https://a.example/x\n\n   \nftp://b.example/y\n  HTTP://c.example/z  \njavascript:alert(1)\nhttps://\n",
        );
        assert_eq!(urls, ["https://a.example/x", "HTTP://c.example/z"]);
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            DownloadQueue::new(["", "file:///etc/passwd", "  "], 3),
            Err(QueueError::NoValidUrls)
        ));
        assert_eq!(DownloadQueue::new(batch(2), 0).unwrap().limit(), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn log_lines_truncate_urls() {
        let url = "https://example.com/a/very/long/path/to/some/file.zip".to_string();
        let ok = QueueEvent::Succeeded { url: url.clone(), id: 1 }.log_line();
        assert_eq!(ok, format!("OK: {}...", &url[..40]));
        let failed = QueueEvent::Failed { url: url.clone(), error: "boom".into() }.log_line();
        assert_eq!(failed, format!("Error: {}... (boom)", &url[..30]));
        assert_eq!(truncate_url("https://x.y", 40), "https://x.y");
    }

    #[tokio::test]
    async fn never_exceeds_limit_and_finishes_everything() {
        let recorder = Recorder::default();
        let queue = DownloadQueue::new(batch(10), 3).unwrap();
        let mut events = Vec::new();
        let outcomes = queue.run(&recorder, |e| events.push(e.clone())).await;

        assert!(recorder.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(recorder.peak.load(Ordering::SeqCst), 3);
        assert_eq!(outcomes.len(), 10);
        assert_eq!(outcomes.iter().filter(|o| o.failed()).count(), 2);

        let started = recorder.started.lock().unwrap().clone();
        assert_eq!(&started[..3], &batch(10)[..3]);
        let mut sorted = started.clone();
        sorted.sort();
        let mut expected = batch(10);
        expected.sort();
        assert_eq!(sorted, expected);

        assert_eq!(events.first(), Some(&QueueEvent::Started { total: 10, concurrency: 3 }));
        assert_eq!(events.last(), Some(&QueueEvent::Done { succeeded: 8, failed: 2 }));
        assert_eq!(events.len(), 12);
    }

    #[tokio::test]
    async fn only_valid_urls_are_dispatched() {
        let recorder = Recorder::default();
        let mut input = vec!["".to_string(), "not a url".to_string()];
        input.extend(batch(2));
        let queue = DownloadQueue::new(input, 5).unwrap();
        let mut events = Vec::new();
        queue.run(&recorder, |e| events.push(e.clone())).await;
        assert_eq!(events[0], QueueEvent::Started { total: 2, concurrency: 5 });
        assert_eq!(*recorder.started.lock().unwrap(), batch(2));
    }
}

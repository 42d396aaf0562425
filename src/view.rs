//! Terminal rendering of checker results, sync states and queue events.
//! Nothing here decides anything; it only projects state onto stdout.

use crate::checker::{InstalledVersion, VersionSource};
use crate::model::{UpdateCheckResult, UpdateState};
use crate::queue::QueueEvent;
use crate::sync::SyncState;
use chrono::{Local, TimeZone};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Note shown when comparisons run against this tool's version because no
/// extension manifest was found.
pub fn version_source_note(installed: &InstalledVersion) -> Option<String> {
    match installed.source {
        VersionSource::Manifest => None,
        VersionSource::ToolFallback => Some(format!(
            "Note: no extension manifest found, comparing against at-toolkit's own v{}. \
             Pass --install-dir to use the installed extension's version.",
            installed.version
        )),
    }
}

pub fn print_version_source(installed: &InstalledVersion) {
    if let Some(note) = version_source_note(installed) {
        println!("{note}");
    }
}

pub fn print_check_result(result: &UpdateCheckResult) {
    if let Some(err) = &result.error {
        println!("Update check failed: {err}");
        return;
    }
    match (&result.remote_version, result.has_update) {
        (Some(remote), true) => {
            println!("Update available: v{} -> v{remote}", result.local_version);
            if let Some(changelog) = result.changelog.as_deref().filter(|c| !c.is_empty()) {
                println!("{changelog}");
            }
            println!("Run `at-toolkit sync` to install it.");
        }
        _ => println!("v{} is up to date.", result.local_version),
    }
}

pub fn print_status(local_version: &str, state: &UpdateState) {
    let checked = state
        .last_update_check
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string());
    match checked {
        Some(when) => println!("v{local_version} | last checked {when}"),
        None => println!("v{local_version} | never checked"),
    }
    if let (true, Some(remote)) = (state.banner_visible(), &state.remote_version) {
        println!("Update available: v{local_version} -> v{remote}");
        if let Some(changelog) = state.changelog.as_deref().filter(|c| !c.is_empty()) {
            println!("{changelog}");
        }
    } else if state.has_update {
        println!("Update notice dismissed.");
    }
}

pub struct SyncView {
    bar: Option<ProgressBar>,
}

impl SyncView {
    pub fn new() -> Self {
        Self { bar: None }
    }

    pub fn render(&mut self, state: &SyncState) {
        match state {
            SyncState::Idle => println!("Update cancelled."),
            SyncState::AwaitingFolderGrant => println!("Step 1: select the extension folder"),
            SyncState::FetchingFileList => println!("Step 2: fetching the file list..."),
            SyncState::Downloading { processed, total, current } => {
                let bar = self.bar.get_or_insert_with(|| {
                    let pb = ProgressBar::new(*total as u64);
                    if let Ok(style) = ProgressStyle::default_bar()
                        .template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
                    {
                        pb.set_style(style);
                    }
                    pb
                });
                bar.set_position(*processed as u64);
                if let Some(path) = current {
                    bar.set_message(path.clone());
                }
            }
            SyncState::Complete { written, failed } => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
                println!("Step 3: update finished, {written} file(s) written, {failed} skipped.");
                println!("Reload the extension to apply the update.");
            }
            SyncState::Error(e) => {
                if let Some(bar) = self.bar.take() {
                    bar.abandon();
                }
                println!("Error: {e}");
            }
        }
    }
}

impl Default for SyncView {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints queue log lines above the per-download progress bars.
pub struct QueueView {
    multi: MultiProgress,
}

impl QueueView {
    pub fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }

    pub fn render(&self, event: &QueueEvent) {
        let line = event.log_line();
        self.multi.suspend(|| println!("{line}"));
    }
}

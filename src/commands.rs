use crate::checker::{UpdateChecker, installed_version};
use crate::cli::{Args, Command, ReportArgs};
use crate::downloader::HttpDownloader;
use crate::folder::CliFolderPicker;
use crate::model::ItemOutcome;
use crate::error::QueueError;
use crate::queue::{DEFAULT_CONCURRENCY, DownloadQueue, parse_url_list};
use crate::source::{DOWNLOAD_STALL_TIMEOUT, download_client, http_client};
use crate::store::{self, StateStore};
use crate::sync::{SelfUpdater, SyncState};
use crate::{output, view};
use anyhow::{Context, Result, bail};
use indicatif::MultiProgress;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

pub async fn run(args: Args) -> Result<()> {
    let store = StateStore::open(args.state_file.clone().unwrap_or_else(StateStore::default_path));
    let source = args.source.remote_source();
    let installed = installed_version(args.install_dir.as_deref());
    let local_version = installed.version.clone();

    match args.command {
        Command::Check => {
            view::print_version_source(&installed);
            let checker = UpdateChecker::new(http_client()?, source, store, local_version);
            view::print_check_result(&checker.check_for_update().await);
        }
        Command::Watch { interval_minutes } => {
            view::print_version_source(&installed);
            let checker = UpdateChecker::new(http_client()?, source, store, local_version);
            let every = Duration::from_secs(interval_minutes.saturating_mul(60));
            println!("Checking every {interval_minutes} minute(s), Ctrl-C to stop.");
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("could not listen for Ctrl-C: {e}");
                    std::future::pending::<()>().await;
                }
            };
            checker.run_schedule(every, shutdown, view::print_check_result).await;
        }
        Command::Status => {
            let state = store.update_state().context("reading update state")?;
            view::print_version_source(&installed);
            view::print_status(&local_version, &state);
        }
        Command::Dismiss => {
            let state = store.update_state().context("reading update state")?;
            match state.remote_version {
                Some(remote) if state.has_update => {
                    store.set([
                        (store::UPDATE_DISMISSED, json!(true)),
                        (store::DISMISSED_VERSION, json!(remote)),
                    ])?;
                    println!("Update notice for v{remote} dismissed.");
                }
                _ => println!("No pending update to dismiss."),
            }
        }
        Command::Sync { folder, report } => {
            let updater = SelfUpdater::new(http_client()?, source);
            let mut picker = CliFolderPicker::new(folder.or(args.install_dir));
            let mut sync_view = view::SyncView::new();
            let result = updater.run(&mut picker, |s| sync_view.render(s)).await;
            save_report(&result.outcomes, &report)?;
            if let SyncState::Error(e) = result.state {
                bail!(e);
            }
        }
        Command::Download { urls, file, concurrency, dest, report } => {
            let mut candidates = urls;
            if let Some(list) = file {
                let text = std::fs::read_to_string(&list)
                    .with_context(|| format!("reading {}", list.display()))?;
                candidates.extend(parse_url_list(&text));
            }
            let queue = prepare_batch(&store, &candidates, concurrency)?;

            let multi = MultiProgress::new();
            let client = download_client(DOWNLOAD_STALL_TIMEOUT)?;
            let downloader = HttpDownloader::new(client, dest).with_progress(multi.clone());
            let queue_view = view::QueueView::new(multi);
            let outcomes = queue.run(&downloader, |e| queue_view.render(e)).await;
            save_report(&outcomes, &report)?;
        }
    }
    Ok(())
}

/// Builds the queue with `--concurrency` or the remembered limit. A
/// requested limit is only remembered once the batch has valid URLs.
fn prepare_batch(
    store: &StateStore,
    candidates: &[String],
    requested: Option<usize>,
) -> Result<DownloadQueue, QueueError> {
    let queue = DownloadQueue::new(candidates, download_limit(store, requested))?;
    if let Some(limit) = requested {
        if let Err(e) = store.set([(store::DOWNLOAD_CONCURRENCY, json!(limit))]) {
            tracing::warn!("could not remember concurrency: {e}");
        }
    }
    Ok(queue)
}

fn download_limit(store: &StateStore, requested: Option<usize>) -> usize {
    if let Some(limit) = requested {
        return limit;
    }
    store
        .get::<usize>(store::DOWNLOAD_CONCURRENCY)
        .unwrap_or_else(|e| {
            tracing::warn!("could not read saved concurrency: {e}");
            None
        })
        .unwrap_or(DEFAULT_CONCURRENCY)
}

fn save_report(outcomes: &[ItemOutcome], args: &ReportArgs) -> Result<Option<PathBuf>> {
    let Some(prefix) = &args.report else {
        return Ok(None);
    };
    let path = output::write_report(outcomes, prefix, &args.format)?;
    println!("Report saved to {}", path.display());
    Ok(Some(path))
}

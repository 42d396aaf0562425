mod checker;
mod cli;
mod commands;
mod downloader;
mod error;
mod folder;
mod model;
mod output;
mod queue;
mod source;
mod store;
mod sync;
mod version;
mod view;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    let default_filter = if args.verbose {
        "at_toolkit=info"
    } else {
        "at_toolkit=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    commands::run(args).await
}

mod cli;
mod discovery;
mod error;
mod launch;
mod model;
mod orchestrator;
mod params;
mod profile;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraggle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = cli::Cli::parse();

    if let Err(e) = cli::run(args).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

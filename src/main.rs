use std::sync::Arc;

use clap::Parser;
use reverie::analysis::{Analyzer, WordFrequencyAnalyzer};
use reverie::api::start_api;
use reverie::config::{NodeConfig, RuntimeProfile};
use reverie::server::LedgerServer;
use reverie::Ledger;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = NodeConfig::parse();
    let profile = RuntimeProfile::detect().with_override(config.workers);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
    .worker_threads(profile.worker_threads)
    .enable_all()
    .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(async_main(config, profile));
}

async fn async_main(config: NodeConfig, profile: RuntimeProfile) {
    let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info,reverie=info"));
    tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_level(true)
    .init();

    info!(
        cores = profile.logical_cores,
        workers = profile.worker_threads,
        owner = %config.owner,
        "starting reverie node"
    );

    let ledger = Arc::new(Ledger::new(config.owner.clone()));
    let analyzer: Arc<dyn Analyzer> = Arc::new(WordFrequencyAnalyzer::new());

    tokio::spawn(start_api(ledger.clone(), analyzer.clone(), config.http_port));

    let addr = config.addr.clone();
    let server = LedgerServer::new(ledger.clone(), analyzer);
    tokio::spawn(async move {
        if let Err(e) = server.run(&addr).await {
            error!(addr = %addr, error = %e, "ledger server stopped");
        }
    });

    info!("node is ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!(
        thoughts = ledger.thought_count(),
        dreams = ledger.dream_count(),
        "shutting down"
    );
}

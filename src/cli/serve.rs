//! `codequiz serve`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use codequiz::cache::QuestionCache;
use codequiz::health::{start_periodic_usage_flush, QuizMetrics};
use codequiz::providers::GeminiProvider;
use codequiz::quiz::prompt::load_prompt;
use codequiz::quiz::{Generator, Validator};
use codequiz::replenisher::join_with_grace;
use codequiz::web::{start_server, AppState, SessionCodec};
use codequiz::{Config, Orchestrator, Replenisher};

pub(crate) async fn cmd_serve(config: Config) -> Result<()> {
    let secret = config.session_secret()?.to_string();
    let provider = GeminiProvider::from_config(&config.gemini)?;
    info!(model = provider.model(), "Using Gemini provider");

    let prompt = load_prompt(config.gemini.prompt_file.as_deref())?;
    let generator =
        Generator::new(Arc::new(provider), prompt).with_validator(Validator::new(config.validation));
    let cache = Arc::new(QuestionCache::new(config.cache.size));
    let metrics = Arc::new(QuizMetrics::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let replenisher = Replenisher::new(
        Arc::clone(&cache),
        generator.clone(),
        config.cache.min,
        config.replenish.clone(),
        Arc::clone(&metrics),
    )
    .start(shutdown_rx.clone());
    let flush = start_periodic_usage_flush(Arc::clone(&metrics), shutdown_rx.clone());

    let orchestrator = Orchestrator::new(cache, generator, &config.retrieval, Arc::clone(&metrics));
    let state = AppState::new(
        &config,
        orchestrator,
        SessionCodec::new(&secret, config.server.session_max_age_secs),
        metrics,
    );

    let shutdown_tx = Arc::new(shutdown_tx);
    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Shutdown requested");
        let _ = signal_tx.send(true);
    });

    let served = start_server(&config, state, shutdown_rx).await;
    let _ = shutdown_tx.send(true);

    if join_with_grace(replenisher, config.replenish.shutdown_grace()).await {
        info!("Replenisher stopped");
    }
    let _ = flush.await;
    served.context("quiz server failed")
}

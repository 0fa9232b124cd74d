use std::sync::Arc;

use anyhow::Context;
use medtriage::api::{AppState, build_router};
use medtriage::core::config::TriageConfig;
use medtriage::geo::HospitalLocator;
use medtriage::llm::{EmbeddingProviderFactory, LlmProviderFactory, MedicalAssistant};
use medtriage::storage::PredictionStore;
use medtriage::triage::{LogisticRegressionClassifier, TriageEngine};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,medtriage=info")))
        .init();

    let config = TriageConfig::load().context("loading configuration")?;

    let embedder = EmbeddingProviderFactory::from_config(&config.embedding).context("building embedding provider")?;
    let classifier = LogisticRegressionClassifier::load_optional(config.classifier.artifact_path.as_deref());
    let engine = Arc::new(TriageEngine::new(&config, embedder, classifier).context("building triage engine")?);

    if !engine.warm_up().await {
        warn!("Embedding model unavailable, recommendations will report 'unavailable'");
    }

    let assistant = LlmProviderFactory::from_config(&config.llm)
        .context("building LLM provider")?
        .map(|provider| Arc::new(MedicalAssistant::new(provider)));

    let state = AppState {
        engine,
        assistant,
        locator: Arc::new(HospitalLocator::new(config.geo.clone()).context("building hospital locator")?),
        store: PredictionStore::open(&config.storage.database_path).context("opening prediction store")?,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    info!("medtriage-server listening on {}", config.server.bind_addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

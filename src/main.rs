//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use meeting_intel::adapters::ai::{MockInsightAdapter, OpenAiAdapter};
use meeting_intel::adapters::persistence::InMemoryMeetingStore;
use meeting_intel::adapters::ui::TuiInputPort;
use meeting_intel::ports::{ContactDirectory, InputPort, InsightService, MeetingStore};
use meeting_intel::shared::config::AppConfig;
use meeting_intel::usecases::{AvailabilityPlanner, InsightAggregator, PrepService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        AppConfig::default()
    });

    // --- Meeting store (seed file or bundled sample data) ---
    let store = Arc::new(match cfg.seed_path.as_deref() {
        Some(path) => {
            info!(path, "loading seed file");
            InMemoryMeetingStore::load_seed_file(path)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?
        }
        None => InMemoryMeetingStore::with_embedded_seed().map_err(|e| anyhow::anyhow!("{}", e))?,
    });
    let meeting_store: Arc<dyn MeetingStore> = Arc::clone(&store) as Arc<dyn MeetingStore>;
    let contacts: Arc<dyn ContactDirectory> = Arc::clone(&store) as Arc<dyn ContactDirectory>;

    // --- Insight service ---
    let insight: Arc<dyn InsightService> = if cfg.is_ai_configured() {
        info!(
            model = %cfg.ai_model_or_default(),
            url = %cfg.ai_api_url_or_default(),
            "insights enabled with OpenAI adapter"
        );
        Arc::new(OpenAiAdapter::new(
            cfg.ai_api_url_or_default(),
            cfg.ai_api_key().unwrap_or_default(),
            cfg.ai_model_or_default(),
        ))
    } else {
        warn!("MEETING_INTEL_AI_API_KEY not set, using mock insight adapter");
        Arc::new(MockInsightAdapter::new())
    };

    // --- Services ---
    let policy = cfg.retry_policy();
    info!(
        max_attempts = policy.max_attempts,
        base_delay_ms = policy.base_delay.as_millis() as u64,
        mode = ?cfg.execution_mode(),
        "retry policy"
    );

    let planner = Arc::new(AvailabilityPlanner::new(
        Arc::clone(&meeting_store),
        cfg.planner_config(),
    ));
    let aggregator = Arc::new(
        InsightAggregator::new(Arc::clone(&insight), Arc::clone(&meeting_store), policy)
            .with_mode(cfg.execution_mode()),
    );
    let prep = Arc::new(PrepService::new(insight, meeting_store, contacts, policy));

    let input_port: Arc<dyn InputPort> =
        Arc::new(TuiInputPort::new(store, planner, aggregator, prep));

    // --- Run (main menu -> Slots / Analysis / Prep) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

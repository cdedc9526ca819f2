use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use studio::core::config::{load_config, STARTER_CONFIG};
use studio::core::job_store::JobStore;
use studio::core::llm::{ChatModel, LlmClient};
use studio::core::outbox::Outbox;
use studio::core::preprocess::ContentPreprocessor;
use studio::core::rate_limit::RateLimiter;
use studio::core::runner::PodcastJobRunner;
use studio::core::script::ScriptGenerator;
use studio::core::steps::StepJournal;
use studio::core::summarizer::ChunkSummarizer;
use studio::core::switchboard::SwitchboardClient;
use studio::core::synth::SegmentSynthesizer;
use studio::core::tts::TtsClient;
use studio::core::worker::{run_worker_loop, JobSource};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());

    // Write a starter config on first run
    if !Path::new(&config_path).exists() {
        std::fs::write(&config_path, STARTER_CONFIG)?;
        log::info!("Wrote starter config to {}", config_path);
    }

    let config = load_config(&config_path)?;

    // Missing keys are fatal before any job is claimed
    config.llm.api_key()?;
    config.tts.api_key()?;

    let cache_dir = config.pipeline.cache_dir();
    std::fs::create_dir_all(&cache_dir)?;
    let db = sled::open(Path::new(&cache_dir).join("studio_db"))?;

    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(config.pipeline.min_call_interval_ms)));
    let llm: Arc<dyn ChatModel> = Arc::new(LlmClient::new(config.llm.clone()));
    let tts = Arc::new(TtsClient::new(config.tts.clone()));
    let switchboard = Arc::new(SwitchboardClient::new(config.switchboard.clone()));

    let outbox = Arc::new(Outbox::open(&db, switchboard.clone())?);
    let journal = Arc::new(StepJournal::open(&db)?);

    // Spawn outbox redelivery loop
    tokio::spawn(
        outbox
            .clone()
            .run_loop(Duration::from_secs(config.pipeline.outbox_interval_secs)),
    );

    let store: Arc<dyn JobStore> = outbox;
    let runner = Arc::new(PodcastJobRunner::new(
        ContentPreprocessor::new(ChunkSummarizer::new(llm.clone(), limiter.clone())),
        ScriptGenerator::new(llm, limiter.clone()),
        SegmentSynthesizer::new(tts, switchboard.clone(), limiter),
        store,
        journal,
    ));

    log::info!("Starting Studio worker...");

    let source: Arc<dyn JobSource> = switchboard;
    run_worker_loop(runner, source, Duration::from_secs(config.pipeline.poll_interval_secs)).await;

    Ok(())
}

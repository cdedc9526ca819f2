use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::path::Path;
use studio::core::config::load_config;
use studio::core::language::DEFAULT_LANGUAGE;
use studio::core::podcast::{ScriptSegment, Speaker};
use studio::core::synth::{wav_duration, SegmentSynthesizer};
use studio::core::tts::{SpeechEngine, TtsClient};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting TTS test...");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    if !Path::new(&config_path).exists() {
        log::error!("Config file not found at {}", config_path);
        return Ok(());
    }

    let config = load_config(&config_path)?;
    log::info!("Loaded config with TTS model: {}", config.tts.model);

    let tts_client = TtsClient::new(config.tts.clone());

    let segment = ScriptSegment::new(
        Speaker::Host,
        "Welcome to our podcast! This is a short sample to check the voice settings.",
    );
    let request = SegmentSynthesizer::request_for(&segment, DEFAULT_LANGUAGE);
    log::info!("Generating audio with voice '{}': {}", request.voice, request.text);

    match tts_client.speak(&request).await {
        Ok(encoded) => {
            let audio_data = general_purpose::STANDARD.decode(encoded.trim())?;
            log::info!("Audio generated successfully. Size: {} bytes", audio_data.len());
            if let Some(secs) = wav_duration(&audio_data) {
                log::info!("Duration: {:.2}s", secs);
            }
            let output_path = "test_output.wav";
            fs::write(output_path, audio_data)?;
            log::info!("Saved audio to {}", output_path);
        }
        Err(e) => {
            log::error!("Failed to generate audio: {:?}", e);
        }
    }

    Ok(())
}

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::core::language::voices_for;
use crate::core::podcast::{AudioSegment, ScriptSegment};
use crate::core::rate_limit::RateLimiter;
use crate::core::tts::{SpeechEngine, SpeechRequest};

/// Where synthesized audio files end up. Returns the public URL.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn store_audio(&self, data: Vec<u8>, filename: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub audio_url: String,
    pub duration_secs: Option<f64>,
}

pub struct SegmentSynthesizer {
    tts: Arc<dyn SpeechEngine>,
    sink: Arc<dyn AudioSink>,
    limiter: Arc<RateLimiter>,
}

impl SegmentSynthesizer {
    pub fn new(tts: Arc<dyn SpeechEngine>, sink: Arc<dyn AudioSink>, limiter: Arc<RateLimiter>) -> Self {
        Self { tts, sink, limiter }
    }

    pub fn request_for(segment: &ScriptSegment, language: &str) -> SpeechRequest {
        let voices = voices_for(language);
        SpeechRequest {
            text: segment.text.clone(),
            language: language.to_string(),
            voice: voices.voice_for(segment.speaker).to_string(),
            pitch: segment.speaker.pitch(),
        }
    }

    /// `index` is the 0-based script position; the name is numbered from 1.
    pub fn filename(job_id: &str, index: usize, segment: &ScriptSegment) -> String {
        format!("podcast-{}-segment-{}-{}.wav", job_id, index + 1, segment.speaker)
    }

    /// One TTS call plus upload. Retries happen inside the speech engine;
    /// whatever error is left is returned as-is.
    pub async fn synthesize(
        &self,
        job_id: &str,
        index: usize,
        segment: &ScriptSegment,
        language: &str,
    ) -> Result<SynthesizedAudio> {
        let request = Self::request_for(segment, language);
        let encoded = self.limiter.run(|| self.tts.speak(&request)).await?;

        let audio = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| anyhow!("TTS returned invalid base64 audio: {}", e))?;
        let duration_secs = wav_duration(&audio);

        let filename = Self::filename(job_id, index, segment);
        let audio_url = self.sink.store_audio(audio, &filename).await?;

        Ok(SynthesizedAudio { audio_url, duration_secs })
    }

    /// Total version of [`synthesize`](Self::synthesize): failures become a
    /// failed segment with an empty URL.
    pub async fn synthesize_segment(
        &self,
        job_id: &str,
        index: usize,
        segment: &ScriptSegment,
        language: &str,
    ) -> AudioSegment {
        match self.synthesize(job_id, index, segment, language).await {
            Ok(audio) => AudioSegment {
                speaker: segment.speaker,
                text: segment.text.clone(),
                audio_url: audio.audio_url,
                succeeded: true,
                duration_secs: audio.duration_secs,
            },
            Err(e) => {
                log::error!("Failed to generate audio for segment {}: {:#}", index, e);
                AudioSegment::failed(segment)
            }
        }
    }
}

/// Length in seconds when `data` is a WAV file.
pub fn wav_duration(data: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(std::io::Cursor::new(data)).ok()?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ApiError;
    use crate::core::podcast::Speaker;
    use std::sync::Mutex;

    fn wav_bytes(samples: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..samples {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    struct FakeTts {
        audio: Result<String, ()>,
        requests: Mutex<Vec<SpeechRequest>>,
    }

    #[async_trait]
    impl SpeechEngine for FakeTts {
        async fn speak(&self, request: &SpeechRequest) -> Result<String, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.audio
                .clone()
                .map_err(|_| ApiError::RateLimited { attempts: 4 })
        }
    }

    #[derive(Default)]
    struct MemorySink {
        files: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl AudioSink for MemorySink {
        async fn store_audio(&self, data: Vec<u8>, filename: &str) -> Result<String> {
            self.files.lock().unwrap().push((filename.to_string(), data.len()));
            Ok(format!("/audio/{}", filename))
        }
    }

    fn synthesizer(audio: Result<String, ()>) -> (SegmentSynthesizer, Arc<FakeTts>, Arc<MemorySink>) {
        let tts = Arc::new(FakeTts { audio, requests: Mutex::new(Vec::new()) });
        let sink = Arc::new(MemorySink::default());
        let limiter = Arc::new(RateLimiter::new(std::time::Duration::ZERO));
        (SegmentSynthesizer::new(tts.clone(), sink.clone(), limiter), tts, sink)
    }

    #[test]
    fn guest_gets_lower_pitch_and_second_voice() {
        let request = SegmentSynthesizer::request_for(&ScriptSegment::new(Speaker::Guest, "Hi"), "ta-IN");
        assert_eq!(request.voice, "karun");
        assert_eq!(request.pitch, -0.1);
        assert_eq!(request.language, "ta-IN");

        let request = SegmentSynthesizer::request_for(&ScriptSegment::new(Speaker::Host, "Hi"), "xx-XX");
        assert_eq!(request.voice, "anushka");
        assert_eq!(request.pitch, 0.0);
    }

    #[test]
    fn duration_is_read_from_wav_header() {
        assert_eq!(wav_duration(&wav_bytes(22050, 22050)), Some(1.0));
        assert_eq!(wav_duration(b"not a wav"), None);
    }

    #[tokio::test]
    async fn decoded_audio_is_uploaded_under_segment_name() {
        let wav = wav_bytes(11025, 22050);
        let (synth, _, sink) = synthesizer(Ok(general_purpose::STANDARD.encode(&wav)));
        let segment = ScriptSegment::new(Speaker::Host, "Welcome!");

        let audio = synth.synthesize_segment("job-9", 3, &segment, "en-IN").await;

        assert!(audio.succeeded);
        assert_eq!(audio.audio_url, "/audio/podcast-job-9-segment-4-host.wav");
        assert_eq!(audio.duration_secs, Some(0.5));
        assert_eq!(sink.files.lock().unwrap()[0], ("podcast-job-9-segment-4-host.wav".to_string(), wav.len()));
    }

    #[tokio::test]
    async fn failed_call_yields_failed_segment() {
        let (synth, tts, sink) = synthesizer(Err(()));
        let segment = ScriptSegment::new(Speaker::Guest, "Indeed.");

        let audio = synth.synthesize_segment("job-9", 0, &segment, "en-IN").await;

        assert_eq!(audio, AudioSegment::failed(&segment));
        assert_eq!(tts.requests.lock().unwrap().len(), 1);
        assert!(sink.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_base64_is_an_error() {
        let (synth, _, _) = synthesizer(Ok("%%%".to_string()));
        let segment = ScriptSegment::new(Speaker::Host, "Hello");
        assert!(synth.synthesize("job", 0, &segment, "en-IN").await.is_err());
    }
}

use anyhow::Result;
use std::sync::Arc;
use tokio::time::Duration;

use crate::core::error::PipelineError;
use crate::core::job_store::JobStore;
use crate::core::language::voices_for;
use crate::core::podcast::{
    estimated_duration, transcript, ApiCallSummary, AudioSegment, JobInput, JobStatus, PodcastMetadata,
    PodcastResult, ScriptSegment,
};
use crate::core::preprocess::ContentPreprocessor;
use crate::core::script::ScriptGenerator;
use crate::core::steps::StepJournal;
use crate::core::synth::SegmentSynthesizer;

pub const SEGMENT_PAUSE: Duration = Duration::from_millis(1200);

/// Drives one job from `processing` to `completed` or `failed`.
pub struct PodcastJobRunner {
    preprocessor: ContentPreprocessor,
    generator: ScriptGenerator,
    synthesizer: SegmentSynthesizer,
    store: Arc<dyn JobStore>,
    journal: Arc<StepJournal>,
    segment_pause: Duration,
}

impl PodcastJobRunner {
    pub fn new(
        preprocessor: ContentPreprocessor,
        generator: ScriptGenerator,
        synthesizer: SegmentSynthesizer,
        store: Arc<dyn JobStore>,
        journal: Arc<StepJournal>,
    ) -> Self {
        Self {
            preprocessor,
            generator,
            synthesizer,
            store,
            journal,
            segment_pause: SEGMENT_PAUSE,
        }
    }

    pub fn journal(&self) -> &Arc<StepJournal> {
        &self.journal
    }

    /// Runs the job and records its final status. The pipeline error, if any,
    /// is returned after the job has been marked `failed`.
    pub async fn run(&self, job: &JobInput) -> Result<PodcastResult> {
        self.journal.begin(job)?;
        log::info!("Starting podcast job {} ('{}', {})", job.id, job.title, job.language);

        let outcome = self.execute(job).await;

        let recorded = match &outcome {
            Ok(result) => {
                log::info!(
                    "Job {} completed: {}/{} audio segments",
                    job.id,
                    result.metadata.successful_audio_segments,
                    result.metadata.segment_count
                );
                self.store
                    .update_status(&job.id, JobStatus::Completed, Some(result), None)
                    .await
            }
            Err(e) => {
                let message = format!("{:#}", e);
                log::error!("Job {} failed: {}", job.id, message);
                self.store
                    .update_status(&job.id, JobStatus::Failed, None, Some(&message))
                    .await
            }
        };

        // Journal entries stay until the final status is stored, so a
        // restart can report it again without redoing any work.
        match recorded {
            Ok(()) => self.journal.finish(&job.id)?,
            Err(e) => log::error!("Could not record final status for job {}: {:#}", job.id, e),
        }

        outcome
    }

    async fn execute(&self, job: &JobInput) -> Result<PodcastResult> {
        if job.content.trim().is_empty() {
            return Err(PipelineError::EmptyContent.into());
        }

        self.store
            .update_status(&job.id, JobStatus::Processing, None, None)
            .await?;

        let steps = self.journal.for_job(&job.id);

        let prepared = self.preprocessor.process(&job.content, &job.title, &steps).await?;

        let script: Vec<ScriptSegment> = steps
            .run("generate-script", || {
                self.generator.generate(&prepared.content, &job.title, &job.language)
            })
            .await?;

        let mut audio_segments = Vec::with_capacity(script.len());
        for (index, segment) in script.iter().enumerate() {
            log::info!("[{}] audio segment {}/{} ({})", job.id, index + 1, script.len(), segment.speaker);
            let audio: AudioSegment = steps
                .run(&format!("generate-audio-segment-{}", index + 1), || async {
                    Ok::<_, anyhow::Error>(
                        self.synthesizer
                            .synthesize_segment(&job.id, index, segment, &job.language)
                            .await,
                    )
                })
                .await?;
            audio_segments.push(audio);

            if index + 1 < script.len() {
                steps
                    .sleep(&format!("wait-after-segment-{}", index + 1), self.segment_pause)
                    .await?;
            }
        }

        Ok(assemble_result(job, script, audio_segments, prepared.truncated_chunks)?)
    }
}

/// Builds the job result from per-segment outcomes. Fails only when no
/// segment produced audio.
pub fn assemble_result(
    job: &JobInput,
    script: Vec<ScriptSegment>,
    audio_segments: Vec<AudioSegment>,
    truncated_chunks: usize,
) -> Result<PodcastResult, PipelineError> {
    let successes = audio_segments.iter().filter(|s| s.succeeded).count();
    if successes == 0 {
        return Err(PipelineError::NoAudio {
            attempted: audio_segments.len(),
        });
    }

    let durations: Vec<f64> = audio_segments.iter().filter_map(|s| s.duration_secs).collect();
    let total_audio_secs = if durations.is_empty() {
        None
    } else {
        Some(durations.iter().sum())
    };

    let metadata = PodcastMetadata {
        job_id: job.id.clone(),
        language: job.language.clone(),
        segment_count: script.len(),
        successful_audio_segments: successes,
        voices: voices_for(&job.language),
        estimated_duration: estimated_duration(script.len()),
        total_audio_secs,
        truncated_chunks,
        api_calls: ApiCallSummary {
            script_generation: 1,
            text_to_speech: successes as u32,
            total: 1 + successes as u32,
        },
    };

    Ok(PodcastResult {
        transcript: transcript(&audio_segments),
        audio_segments,
        script,
        metadata,
    })
}

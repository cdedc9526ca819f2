//! Records that flow through the podcast pipeline and out to the job store.
//! JSON field names are camelCase because the polling UI reads them as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::language::VoicePair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Speaker {
    Host,
    Guest,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Host => "host",
            Speaker::Guest => "guest",
        }
    }

    /// Uppercase tag used in transcripts, e.g. `[HOST]`.
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Host => "HOST",
            Speaker::Guest => "GUEST",
        }
    }

    /// Fixed pitch offset so the two voices sound distinct.
    pub fn pitch(&self) -> f32 {
        match self {
            Speaker::Host => 0.0,
            Speaker::Guest => -0.1,
        }
    }
}

impl FromStr for Speaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Speaker::Host),
            "guest" => Ok(Speaker::Guest),
            other => Err(format!("Invalid speaker: {}", other)),
        }
    }
}

impl TryFrom<String> for Speaker {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub speaker: Speaker,
    pub text: String,
}

impl ScriptSegment {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// Outcome of summarizing one chunk. `succeeded == false` means the summary
/// is the truncated original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSummary {
    pub chunk_index: usize,
    pub summary: String,
    pub succeeded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSegment {
    pub speaker: Speaker,
    pub text: String,
    pub audio_url: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl AudioSegment {
    pub fn failed(segment: &ScriptSegment) -> Self {
        Self {
            speaker: segment.speaker,
            text: segment.text.clone(),
            audio_url: String::new(),
            succeeded: false,
            duration_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallSummary {
    pub script_generation: u32,
    pub text_to_speech: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastMetadata {
    pub job_id: String,
    pub language: String,
    pub segment_count: usize,
    pub successful_audio_segments: usize,
    pub voices: VoicePair,
    pub estimated_duration: String,
    #[serde(default)]
    pub total_audio_secs: Option<f64>,
    /// Trailing chunks dropped by the chunk cap; 0 when the whole document was used.
    #[serde(default)]
    pub truncated_chunks: usize,
    pub api_calls: ApiCallSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastResult {
    pub audio_segments: Vec<AudioSegment>,
    pub transcript: String,
    pub script: Vec<ScriptSegment>,
    pub metadata: PodcastMetadata,
}

/// `[HOST]: text` lines in spoken order, separated by blank lines.
pub fn transcript(segments: &[AudioSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{}]: {}", s.speaker.label(), s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Rough listening time, 1.5 minutes per script turn.
pub fn estimated_duration(segment_count: usize) -> String {
    format!("~{} minutes", (segment_count * 3).div_ceil(2))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Terminal states are absorbing. Re-marking `processing` is allowed so a
    /// resumed job can report again.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => next != JobStatus::Pending,
            JobStatus::Processing => next != JobStatus::Pending,
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a worker needs to run one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    pub id: String,
    pub content: String,
    pub title: String,
    pub language: String,
}

/// Job as seen by pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(rename = "jobId")]
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PodcastResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(speaker: Speaker, text: &str, ok: bool) -> AudioSegment {
        AudioSegment {
            speaker,
            text: text.to_string(),
            audio_url: if ok { format!("/audio/{}.wav", text) } else { String::new() },
            succeeded: ok,
            duration_secs: None,
        }
    }

    #[test]
    fn speaker_parses_case_insensitively() {
        let seg: ScriptSegment = serde_json::from_str(r#"{"speaker":"Host","text":"hi"}"#).unwrap();
        assert_eq!(seg.speaker, Speaker::Host);
        assert!(serde_json::from_str::<ScriptSegment>(r#"{"speaker":"narrator","text":"x"}"#).is_err());
        assert_eq!(serde_json::to_string(&Speaker::Guest).unwrap(), "\"guest\"");
    }

    #[test]
    fn transcript_tags_speakers_in_order() {
        let segments = vec![
            audio(Speaker::Host, "Welcome", true),
            audio(Speaker::Guest, "Thanks", false),
        ];
        assert_eq!(transcript(&segments), "[HOST]: Welcome\n\n[GUEST]: Thanks");
    }

    #[test]
    fn transcript_is_stable_across_calls() {
        let segments = vec![
            audio(Speaker::Host, "One", true),
            audio(Speaker::Guest, "Two", true),
            audio(Speaker::Host, "Three", false),
        ];
        assert_eq!(transcript(&segments), transcript(&segments.clone()));
    }

    #[test]
    fn duration_estimate_rounds_up() {
        assert_eq!(estimated_duration(12), "~18 minutes");
        assert_eq!(estimated_duration(11), "~17 minutes");
    }

    #[test]
    fn terminal_statuses_are_absorbing() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn job_record_uses_polling_field_names() {
        let record = JobRecord {
            id: "job-1".to_string(),
            status: JobStatus::Failed,
            result: None,
            error: Some("boom".to_string()),
            created_at: 1,
            updated_at: 2,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["createdAt"], 1);
        assert!(json.get("result").is_none());
    }
}

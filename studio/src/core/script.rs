use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

use crate::core::error::ScriptGenerationError;
use crate::core::language::{language_name, DEFAULT_LANGUAGE};
use crate::core::llm::{ChatModel, ChatRequest};
use crate::core::podcast::{ScriptSegment, Speaker};
use crate::core::rate_limit::RateLimiter;
use crate::core::tokens;

const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 8192;
/// Soft prompt budget used to size the content.
pub const MAX_PROMPT_TOKENS: usize = 7000;
/// Requests above this are refused without calling the model.
pub const HARD_PROMPT_LIMIT: usize = 7168;
pub const MIN_TURNS: usize = 5;
pub const TARGET_TURNS: usize = 10;
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length...]";

const FILLER_TURNS: [(Speaker, &str); 5] = [
    (Speaker::Host, "This really highlights some key insights from the content."),
    (Speaker::Guest, "Absolutely, and I think this has broader implications for the field."),
    (Speaker::Host, "What would you say are the most important takeaways for our listeners?"),
    (Speaker::Guest, "I'd say the main points really center around practical applications."),
    (Speaker::Host, "That's a great way to summarize it. Thank you for this insightful discussion."),
];

pub fn language_instruction(language: &str) -> String {
    if language == DEFAULT_LANGUAGE {
        "Generate the script in English.".to_string()
    } else {
        format!(
            "Generate the script in {}. Make sure the conversation flows naturally in that language.",
            language_name(language)
        )
    }
}

pub fn render_prompt(title: &str, content: &str, language: &str) -> String {
    format!(
        "You are a podcast script writer. Create an engaging 8-10 minute podcast conversation between two hosts discussing the following content. \n\n\
         Content Title: {title}\n\
         Content: {content}\n\n\
         Requirements:\n\
         - Create a natural, conversational dialogue between Host and Guest\n\
         - Include interesting insights and explain technical things in a simple way with examples, questions, and back-and-forth discussion\n\
         - Make it engaging and informative\n\
         - Keep each speaker turn to 1-3 sentences for natural flow\n\
         - Include natural transitions and reactions\n\
         - Create at least 10-15 dialog exchanges for a substantial conversation\n\
         - Total length should be appropriate for 8-10 minutes of speech\n\
         - {instruction}\n\n\
         IMPORTANT: You MUST return a valid JSON object with a \"script\" property containing an array. No markdown formatting, no code blocks, no backticks.\n\n\
         Format:\n\
         {{ \"script\": [ {{\"speaker\": \"host\", \"text\": \"Welcome to our podcast! Today we're discussing...\"}}, {{\"speaker\": \"guest\", \"text\": \"Thanks for having me...\"}} ] }}",
        title = title,
        content = content,
        instruction = language_instruction(language),
    )
}

/// Renders the prompt, cutting the content down to whatever the fixed part
/// of the template leaves of the budget.
pub fn build_prompt(content: &str, title: &str, language: &str) -> Result<String, ScriptGenerationError> {
    let fixed_tokens = tokens::estimate(&render_prompt(title, "", language));
    let max_content_tokens = MAX_PROMPT_TOKENS.saturating_sub(fixed_tokens);
    let content_tokens = tokens::estimate(content);

    let prompt = if content_tokens > max_content_tokens {
        log::warn!(
            "Content has ~{} tokens, truncating to {} to fit the script prompt",
            content_tokens,
            max_content_tokens
        );
        let cut = tokens::truncate_chars(content, max_content_tokens * tokens::CHARS_PER_TOKEN);
        render_prompt(title, &format!("{}{}", cut, TRUNCATION_MARKER), language)
    } else {
        render_prompt(title, content, language)
    };

    let prompt_tokens = tokens::estimate(&prompt);
    if prompt_tokens > HARD_PROMPT_LIMIT {
        return Err(ScriptGenerationError::OverBudget {
            tokens: prompt_tokens,
            limit: HARD_PROMPT_LIMIT,
        });
    }
    log::info!("Script prompt is ~{} tokens", prompt_tokens);
    Ok(prompt)
}

/// Drops a leading ```json (or bare ```) fence and a trailing ``` fence.
/// Either may be missing.
pub fn strip_code_fence(raw: &str) -> &str {
    let opening = Regex::new(r"^\s*```(?:json)?").unwrap();
    let closing = Regex::new(r"```\s*$").unwrap();

    let mut text = raw;
    if let Some(m) = opening.find(text) {
        text = &text[m.end()..];
    }
    if let Some(m) = closing.find(text) {
        text = &text[..m.start()];
    }
    text.trim()
}

/// Turn list from the first matching shape: a bare array, then a `script`
/// array, then a `segments` array.
fn script_turns(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(turns) => Some(turns),
        Value::Object(mut map) => match map.remove("script") {
            Some(Value::Array(turns)) => Some(turns),
            _ => match map.remove("segments") {
                Some(Value::Array(turns)) => Some(turns),
                _ => None,
            },
        },
        _ => None,
    }
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptSegment>, ScriptGenerationError> {
    if raw.trim().is_empty() {
        return Err(ScriptGenerationError::Empty);
    }

    let value: Value = serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        log::error!("Failed to parse script JSON: {}. Raw: {}", e, tokens::truncate_chars(raw, 500));
        ScriptGenerationError::Parse(e.to_string())
    })?;

    let turns = script_turns(value).ok_or(ScriptGenerationError::InvalidShape)?;

    let segments: Vec<ScriptSegment> = turns
        .into_iter()
        .filter_map(|turn| match serde_json::from_value::<ScriptSegment>(turn) {
            Ok(seg) if !seg.text.trim().is_empty() => Some(ScriptSegment::new(seg.speaker, seg.text.trim())),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Dropping malformed script turn: {}", e);
                None
            }
        })
        .collect();

    if segments.len() < MIN_TURNS {
        return Err(ScriptGenerationError::TooShort(segments.len()));
    }
    Ok(pad_script(segments))
}

/// Scripts shorter than the target get the fixed closing exchange appended.
pub fn pad_script(mut segments: Vec<ScriptSegment>) -> Vec<ScriptSegment> {
    if segments.len() < TARGET_TURNS {
        log::warn!("Script has only {} turns, adding closing exchange", segments.len());
        segments.extend(FILLER_TURNS.iter().map(|(speaker, text)| ScriptSegment::new(*speaker, *text)));
    }
    segments
}

pub struct ScriptGenerator {
    llm: Arc<dyn ChatModel>,
    limiter: Arc<RateLimiter>,
}

impl ScriptGenerator {
    pub fn new(llm: Arc<dyn ChatModel>, limiter: Arc<RateLimiter>) -> Self {
        Self { llm, limiter }
    }

    pub async fn generate(
        &self,
        content: &str,
        title: &str,
        language: &str,
    ) -> Result<Vec<ScriptSegment>, ScriptGenerationError> {
        let prompt = build_prompt(content, title, language)?;
        let request = ChatRequest::user(prompt, TEMPERATURE).with_max_tokens(MAX_OUTPUT_TOKENS);

        let raw = self.limiter.run(|| self.llm.chat(&request)).await?;
        let script = parse_script(&raw)?;
        log::info!("Generated script with {} turns", script.len());
        Ok(script)
    }
}

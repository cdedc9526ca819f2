pub mod chunker;
pub mod config;
pub mod error;
pub mod job_store;
pub mod language;
pub mod llm;
pub mod ocr;
pub mod outbox;
pub mod podcast;
pub mod preprocess;
pub mod rate_limit;
pub mod retry;
pub mod runner;
pub mod script;
pub mod steps;
pub mod summarizer;
pub mod switchboard;
pub mod synth;
pub mod tokens;
pub mod tts;
pub mod worker;

//! LLM-backed priority suggestions.
//!
//! The model is only asked to classify a request into one of the four
//! priority levels and explain why. Its answer is validated against the
//! priority enum and never coerced; anything else is a format error.
//!
//! - `llm` - the chat-completion client seam and an OpenAI-compatible implementation
//! - `priority` - prompt construction, response parsing, and suggester selection

pub mod llm;
pub mod priority;

pub use llm::{CompletionRequest, LlmClient, LlmError, OpenAiCompatibleClient};
pub use priority::{build_suggester, LlmPrioritySuggester};

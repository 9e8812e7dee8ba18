use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use matreq_core::config::{AppConfig, SuggestionMode};
use matreq_core::domain::request::Priority;
use matreq_core::priority::{
    PrioritySuggester, PrioritySuggestion, RuleBasedPrioritySuggester, SuggestionError,
    SuggestionInput,
};

use crate::llm::{CompletionRequest, LlmClient, LlmError, OpenAiCompatibleClient};

pub const SYSTEM_PROMPT: &str = "You are a construction procurement expert. \
Always respond with valid JSON only, no additional text.";

pub const DEFAULT_EXPLANATION: &str = "Priority suggested based on material characteristics.";

impl From<LlmError> for SuggestionError {
    fn from(value: LlmError) -> Self {
        match value {
            LlmError::MissingApiKey => Self::Configuration("AI service is not configured".into()),
            LlmError::Transport(message) => Self::UpstreamUnavailable(message),
            LlmError::UpstreamStatus { status, .. } => {
                Self::UpstreamUnavailable(format!("upstream returned status {status}"))
            }
            LlmError::MissingContent => Self::Format("response had no message content".into()),
            LlmError::Decode(message) => Self::Format(message),
        }
    }
}

/// Asks a chat-completion model for a priority. Failures are reported as they
/// are; this suggester never substitutes a rule-based answer.
pub struct LlmPrioritySuggester<C> {
    client: C,
    temperature: f32,
    max_tokens: u32,
}

impl<C> LlmPrioritySuggester<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client, temperature: 0.3, max_tokens: 200 }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn completion_request(&self, input: &SuggestionInput) -> CompletionRequest {
        CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_prompt(input),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_object: true,
        }
    }
}

pub fn build_prompt(input: &SuggestionInput) -> String {
    let notes_line = input.notes().map(|notes| format!("Notes: {notes}")).unwrap_or_default();

    format!(
        "You are a construction procurement expert. Given the following material request, \
suggest the priority level (low, medium, high, or urgent) and provide a brief explanation \
(1-2 sentences) explaining why.

Material: {material}
Quantity: {quantity} {unit}
{notes_line}

Consider:
- Critical construction materials (cement, concrete, steel, rebar) typically need higher priority
- Large quantities may require advance procurement planning
- Project-critical materials that could block construction progress should be urgent
- Standard materials in small quantities can be low priority

Respond ONLY with a valid JSON object in this exact format:
{{
  \"priority\": \"urgent\" | \"high\" | \"medium\" | \"low\",
  \"reason\": \"Your explanation here (1-2 sentences)\"
}}",
        material = input.material_name.trim(),
        quantity = input.quantity,
        unit = input.unit,
    )
}

/// Reads `{"priority": .., "reason": ..}` from model output. The priority must
/// be one of the four levels verbatim; the explanation falls back from
/// `reason` to `explanation` to a fixed sentence.
pub fn parse_suggestion(content: &str) -> Result<PrioritySuggestion, SuggestionError> {
    let value: Value = serde_json::from_str(content.trim())
        .map_err(|error| SuggestionError::Format(format!("response is not JSON: {error}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| SuggestionError::Format("response is not a JSON object".to_string()))?;

    let priority = match object.get("priority").and_then(Value::as_str) {
        Some("low") => Priority::Low,
        Some("medium") => Priority::Medium,
        Some("high") => Priority::High,
        Some("urgent") => Priority::Urgent,
        Some(other) => {
            return Err(SuggestionError::Format(format!("unknown priority `{other}`")));
        }
        None => return Err(SuggestionError::Format("priority is missing".to_string())),
    };

    let non_empty = |field: &str| {
        object.get(field).and_then(Value::as_str).map(str::trim).filter(|text| !text.is_empty())
    };
    let explanation = non_empty("reason").or_else(|| non_empty("explanation"));

    Ok(PrioritySuggestion {
        priority,
        explanation: explanation.unwrap_or(DEFAULT_EXPLANATION).to_string(),
    })
}

#[async_trait]
impl<C> PrioritySuggester for LlmPrioritySuggester<C>
where
    C: LlmClient,
{
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn suggest(
        &self,
        input: &SuggestionInput,
    ) -> Result<PrioritySuggestion, SuggestionError> {
        input.validate()?;

        let content = self.client.complete(&self.completion_request(input)).await.map_err(
            |error| {
                warn!(
                    event_name = "priority.suggestion.llm_failed",
                    error = %error,
                    "llm priority suggestion failed"
                );
                SuggestionError::from(error)
            },
        )?;

        parse_suggestion(&content).map_err(|error| {
            warn!(
                event_name = "priority.suggestion.invalid_format",
                error = %error,
                "llm returned an unusable priority suggestion"
            );
            error
        })
    }
}

/// Picks the suggester named by `suggestion.mode`.
pub fn build_suggester(config: &AppConfig) -> Result<Arc<dyn PrioritySuggester>, SuggestionError> {
    let suggester: Arc<dyn PrioritySuggester> = match config.suggestion.mode {
        SuggestionMode::Rules => Arc::new(RuleBasedPrioritySuggester::new()),
        SuggestionMode::Llm => {
            let client = OpenAiCompatibleClient::from_config(&config.llm)?;
            if !config.llm.has_api_key() {
                warn!(
                    event_name = "priority.suggester.missing_api_key",
                    "llm suggestion mode selected without an api key; calls will fail"
                );
            }
            Arc::new(
                LlmPrioritySuggester::new(client)
                    .with_sampling(config.llm.temperature, config.llm.max_tokens),
            )
        }
    };

    info!(
        event_name = "priority.suggester.selected",
        suggester = suggester.name(),
        "priority suggester ready"
    );
    Ok(suggester)
}

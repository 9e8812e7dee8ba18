//! Priority suggestions for new material requests.
//!
//! Two interchangeable implementations share the [`PrioritySuggester`]
//! contract: the deterministic [`RuleBasedPrioritySuggester`] in this crate and
//! the LLM-backed suggester in `matreq-agent`. Which one serves a call is a
//! configuration decision (`suggestion.mode`); a failing remote call is never
//! answered by the rule-based variant.

mod rules;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::Priority;

pub use rules::{RuleBasedPrioritySuggester, CRITICAL_TERMS, STRUCTURAL_TERMS};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionInput {
    pub material_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SuggestionInput {
    pub fn new(material_name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self { material_name: material_name.into(), quantity, unit: unit.into(), notes: None }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), SuggestionError> {
        if self.material_name.trim().is_empty() {
            return Err(SuggestionError::InvalidInput("material_name is required".to_string()));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(SuggestionError::InvalidInput("quantity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref().map(str::trim).filter(|notes| !notes.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySuggestion {
    pub priority: Priority,
    pub explanation: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SuggestionError {
    #[error("invalid suggestion input: {0}")]
    InvalidInput(String),
    #[error("suggestion service is not configured: {0}")]
    Configuration(String),
    #[error("suggestion service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("invalid suggestion response format: {0}")]
    Format(String),
}

impl SuggestionError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Configuration(_) => "configuration",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::Format(_) => "format",
        }
    }
}

#[async_trait]
pub trait PrioritySuggester: Send + Sync {
    fn name(&self) -> &'static str;
    async fn suggest(&self, input: &SuggestionInput)
        -> Result<PrioritySuggestion, SuggestionError>;
}

use async_trait::async_trait;

use super::{PrioritySuggester, PrioritySuggestion, SuggestionError, SuggestionInput};
use crate::domain::request::Priority;

/// Materials whose absence halts structural work.
pub const CRITICAL_TERMS: &[&str] = &["cement", "concrete", "rebar", "steel", "reinforcement"];
pub const STRUCTURAL_TERMS: &[&str] = &["brick", "timber", "wood", "insulation", "beam", "column"];

const URGENT_QUANTITY: f64 = 100.0;
const LARGE_QUANTITY: f64 = 500.0;
const MEDIUM_QUANTITY: f64 = 100.0;

#[derive(Clone, Debug, Default)]
pub struct RuleBasedPrioritySuggester;

impl RuleBasedPrioritySuggester {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, material_name: &str, quantity: f64) -> PrioritySuggestion {
        let name = material_name.to_lowercase();
        let contains_any = |terms: &[&str]| terms.iter().any(|term| name.contains(term));

        let (priority, explanation) = if contains_any(CRITICAL_TERMS) {
            if quantity > URGENT_QUANTITY {
                (
                    Priority::Urgent,
                    "Critical structural material in a large quantity; delays would block construction progress.",
                )
            } else {
                (
                    Priority::High,
                    "Critical structural material that other trades depend on, so it should be procured promptly.",
                )
            }
        } else if contains_any(STRUCTURAL_TERMS) {
            (
                Priority::High,
                "Structural building material that is typically on the critical path of the schedule.",
            )
        } else if quantity > LARGE_QUANTITY {
            (Priority::High, "Large quantity that needs advance procurement planning.")
        } else if quantity > MEDIUM_QUANTITY {
            (Priority::Medium, "Moderate quantity of a standard material; plan procurement ahead.")
        } else {
            (Priority::Low, "Standard material in a small quantity that can follow normal procurement.")
        };

        PrioritySuggestion { priority, explanation: explanation.to_string() }
    }
}

#[async_trait]
impl PrioritySuggester for RuleBasedPrioritySuggester {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn suggest(
        &self,
        input: &SuggestionInput,
    ) -> Result<PrioritySuggestion, SuggestionError> {
        input.validate()?;
        Ok(self.classify(&input.material_name, input.quantity))
    }
}

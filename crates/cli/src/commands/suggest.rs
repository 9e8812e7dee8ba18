use matreq_agent::build_suggester;
use matreq_core::priority::{SuggestionError, SuggestionInput};

use crate::commands::{prepare, CommandResult};

#[derive(Debug, Clone)]
pub struct SuggestArgs {
    pub material_name: String,
    pub quantity: f64,
    pub unit: String,
    pub notes: Option<String>,
}

pub fn run(args: SuggestArgs) -> CommandResult {
    let (config, runtime) = match prepare("suggest") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let mut input = SuggestionInput::new(args.material_name, args.quantity, args.unit);
    if let Some(notes) = args.notes {
        input = input.with_notes(notes);
    }

    let result = runtime.block_on(async {
        let suggester = build_suggester(&config)?;
        suggester.suggest(&input).await.map(|suggestion| (suggester.name(), suggestion))
    });

    match result {
        Ok((suggester, suggestion)) => CommandResult::success(
            "suggest",
            format!("{} ({suggester}): {}", suggestion.priority, suggestion.explanation),
        ),
        Err(error) => {
            CommandResult::failure("suggest", error.class(), error.to_string(), exit_code(&error))
        }
    }
}

fn exit_code(error: &SuggestionError) -> u8 {
    match error {
        SuggestionError::InvalidInput(_) | SuggestionError::Configuration(_) => 2,
        SuggestionError::UpstreamUnavailable(_) => 7,
        SuggestionError::Format(_) => 8,
    }
}

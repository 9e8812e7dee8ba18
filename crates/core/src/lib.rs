pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod i18n;
pub mod priority;

pub use config::{AppConfig, ConfigError, LoadOptions, SuggestionMode};
pub use domain::profile::{Caller, CompanyId, Profile, Session, UserId};
pub use domain::request::{
    EnrichedMaterialRequest, MaterialRequest, MaterialRequestId, MaterialRequestPatch,
    NewMaterialRequest, Priority, Unit,
};
pub use domain::stats::RequestStats;
pub use domain::status::RequestStatus;
pub use errors::{ApplicationError, DomainError, InterfaceError, UserAction};
pub use export::{export_csv, export_filename, ExportError};
pub use i18n::{Locale, Translations};
pub use priority::{
    PrioritySuggester, PrioritySuggestion, RuleBasedPrioritySuggester, SuggestionError,
    SuggestionInput,
};

//! Locale-specific label tables.
//!
//! A [`Translations`] value is selected once (from configuration, a query
//! parameter or an `Accept-Language` header) and handed to whatever renders
//! user-facing text. There is no process-wide current locale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::request::Priority;
use crate::domain::status::RequestStatus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    De,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }

    /// Picks the first supported language from an `Accept-Language` style list,
    /// comparing primary subtags only (`de-AT` selects German).
    pub fn negotiate(accept_language: Option<&str>, fallback: Locale) -> Locale {
        accept_language
            .into_iter()
            .flat_map(|header| header.split(','))
            .filter_map(|entry| entry.split(';').next())
            .find_map(|tag| tag.parse().ok())
            .unwrap_or(fallback)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let primary = value.trim().split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Self::En),
            "de" => Ok(Self::De),
            _ => Err(format!("unsupported locale `{}` (expected en|de)", value.trim())),
        }
    }
}

#[derive(Debug)]
pub struct Translations {
    pub locale: Locale,
    pub status: StatusLabels,
    pub priority: PriorityLabels,
    pub table: TableLabels,
    pub stats: StatsLabels,
    pub errors: ErrorMessages,
}

#[derive(Debug)]
pub struct StatusLabels {
    pub pending: &'static str,
    pub approved: &'static str,
    pub rejected: &'static str,
    pub fulfilled: &'static str,
}

#[derive(Debug)]
pub struct PriorityLabels {
    pub low: &'static str,
    pub medium: &'static str,
    pub high: &'static str,
    pub urgent: &'static str,
}

#[derive(Debug)]
pub struct TableLabels {
    pub material_name: &'static str,
    pub quantity: &'static str,
    pub unit: &'static str,
    pub status: &'static str,
    pub priority: &'static str,
    pub requested_by: &'static str,
    pub requested_at: &'static str,
    pub notes: &'static str,
    pub empty: &'static str,
}

#[derive(Debug)]
pub struct StatsLabels {
    pub total: &'static str,
    pub pending: &'static str,
    pub approved: &'static str,
    pub fulfilled: &'static str,
}

#[derive(Debug)]
pub struct ErrorMessages {
    pub load_failed: &'static str,
    pub create_failed: &'static str,
    pub update_failed: &'static str,
    pub delete_failed: &'static str,
    pub ai_suggestion_failed: &'static str,
    pub session_expired: &'static str,
}

static EN: Translations = Translations {
    locale: Locale::En,
    status: StatusLabels {
        pending: "Pending",
        approved: "Approved",
        rejected: "Rejected",
        fulfilled: "Fulfilled",
    },
    priority: PriorityLabels { low: "Low", medium: "Medium", high: "High", urgent: "Urgent" },
    table: TableLabels {
        material_name: "Material Name",
        quantity: "Quantity",
        unit: "Unit",
        status: "Status",
        priority: "Priority",
        requested_by: "Requested By",
        requested_at: "Requested At",
        notes: "Notes",
        empty: "No requests found",
    },
    stats: StatsLabels {
        total: "Total Requests",
        pending: "Pending",
        approved: "Approved",
        fulfilled: "Fulfilled",
    },
    errors: ErrorMessages {
        load_failed: "Failed to load requests. Please try again.",
        create_failed: "Failed to create request. Please try again.",
        update_failed: "Failed to update request. Please try again.",
        delete_failed: "Failed to delete request. Please try again.",
        ai_suggestion_failed: "Failed to get AI suggestion. Please try again.",
        session_expired: "Your session has expired. Please sign in again.",
    },
};

static DE: Translations = Translations {
    locale: Locale::De,
    status: StatusLabels {
        pending: "Ausstehend",
        approved: "Genehmigt",
        rejected: "Abgelehnt",
        fulfilled: "Erfüllt",
    },
    priority: PriorityLabels {
        low: "Niedrig",
        medium: "Mittel",
        high: "Hoch",
        urgent: "Dringend",
    },
    table: TableLabels {
        material_name: "Materialname",
        quantity: "Menge",
        unit: "Einheit",
        status: "Status",
        priority: "Priorität",
        requested_by: "Angefragt von",
        requested_at: "Angefragt am",
        notes: "Notizen",
        empty: "Keine Anfragen gefunden",
    },
    stats: StatsLabels {
        total: "Gesamte Anfragen",
        pending: "Ausstehend",
        approved: "Genehmigt",
        fulfilled: "Erfüllt",
    },
    errors: ErrorMessages {
        load_failed: "Anfragen konnten nicht geladen werden. Bitte versuchen Sie es erneut.",
        create_failed: "Anfrage konnte nicht erstellt werden. Bitte versuchen Sie es erneut.",
        update_failed: "Anfrage konnte nicht aktualisiert werden. Bitte versuchen Sie es erneut.",
        delete_failed: "Anfrage konnte nicht gelöscht werden. Bitte versuchen Sie es erneut.",
        ai_suggestion_failed:
            "KI-Vorschlag konnte nicht abgerufen werden. Bitte versuchen Sie es erneut.",
        session_expired: "Ihre Sitzung ist abgelaufen. Bitte melden Sie sich erneut an.",
    },
};

impl Translations {
    pub fn for_locale(locale: Locale) -> &'static Translations {
        match locale {
            Locale::En => &EN,
            Locale::De => &DE,
        }
    }

    pub fn status_label(&self, status: RequestStatus) -> &'static str {
        match status {
            RequestStatus::Pending => self.status.pending,
            RequestStatus::Approved => self.status.approved,
            RequestStatus::Rejected => self.status.rejected,
            RequestStatus::Fulfilled => self.status.fulfilled,
        }
    }

    pub fn priority_label(&self, priority: Priority) -> &'static str {
        match priority {
            Priority::Low => self.priority.low,
            Priority::Medium => self.priority.medium,
            Priority::High => self.priority.high,
            Priority::Urgent => self.priority.urgent,
        }
    }
}

//! CSV export of material requests.

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use crate::domain::request::EnrichedMaterialRequest;

pub const CSV_HEADERS: [&str; 8] = [
    "Material Name",
    "Quantity",
    "Unit",
    "Status",
    "Priority",
    "Requested By",
    "Requested At",
    "Notes",
];

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer could not be finalized: {0}")]
    Buffer(String),
}

/// Serializes requests in the given order. Every data cell is quoted with inner
/// quotes doubled; rows are joined with `\n` and there is no trailing newline.
pub fn export_csv(requests: &[EnrichedMaterialRequest]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for enriched in requests {
        let request = &enriched.request;
        let quantity = request.quantity.to_string();
        let requested_at = request.requested_at.format("%Y-%m-%d").to_string();
        writer.write_record([
            request.material_name.as_str(),
            quantity.as_str(),
            request.unit.as_str(),
            request.status.as_str(),
            request.priority.as_str(),
            enriched.requested_by_display.as_str(),
            requested_at.as_str(),
            request.notes.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|error| ExportError::Buffer(error.to_string()))?;
    let rows = String::from_utf8(bytes).map_err(|error| ExportError::Buffer(error.to_string()))?;

    let mut output = CSV_HEADERS.join(",");
    let rows = rows.trim_end_matches('\n');
    if !rows.is_empty() {
        output.push('\n');
        output.push_str(rows);
    }
    Ok(output)
}

/// Download name for an export: the explicit name when given, otherwise
/// `material-requests-YYYY-MM-DD.csv`.
pub fn export_filename(explicit: Option<&str>, today: NaiveDate) -> String {
    match explicit.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => format!("material-requests-{}.csv", today.format("%Y-%m-%d")),
    }
}

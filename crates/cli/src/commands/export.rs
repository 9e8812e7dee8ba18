use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use matreq_core::domain::profile::Caller;
use matreq_core::domain::request::EnrichedMaterialRequest;
use matreq_core::domain::status::RequestStatus;
use matreq_core::export::{export_csv, export_filename};
use matreq_db::repositories::{MaterialRequestRepository, SqlMaterialRequestRepository};

use crate::commands::{open_pool, prepare, CommandResult, StepError};

#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub user: String,
    pub status: Option<String>,
    pub output: Option<PathBuf>,
}

/// Writes the CSV export of everything `args.user`'s company can see. A user
/// without a profile sees nothing and gets a header-only file.
pub fn run(args: ExportArgs) -> CommandResult {
    let filter = match parse_filter(args.status.as_deref()) {
        Ok(filter) => filter,
        Err(message) => return CommandResult::failure("export", "invalid_status", message, 2),
    };

    let (config, runtime) = match prepare("export") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let repository = SqlMaterialRequestRepository::new(pool.clone());
        let rows = repository
            .list(&Caller::new(args.user.clone()), filter)
            .await
            .map_err(|error| ("db_query", error.to_string(), 5u8));
        pool.close().await;
        rows
    });

    let rows = match result {
        Ok(rows) => rows,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("export", error_class, message, exit_code);
        }
    };

    match write_export(&rows, args.output) {
        Ok(path) => CommandResult::success(
            "export",
            format!("exported {} material requests to {}", rows.len(), path.display()),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("export", error_class, message, exit_code)
        }
    }
}

fn parse_filter(raw: Option<&str>) -> Result<Option<RequestStatus>, String> {
    match raw.map(str::trim).filter(|value| !value.is_empty() && *value != "all") {
        None => Ok(None),
        Some(value) => value.parse::<RequestStatus>().map(Some).map_err(|error| error.to_string()),
    }
}

fn write_export(
    rows: &[EnrichedMaterialRequest],
    output: Option<PathBuf>,
) -> Result<PathBuf, StepError> {
    let csv = export_csv(rows).map_err(|error| ("csv_encoding", error.to_string(), 6u8))?;
    let path = output
        .unwrap_or_else(|| PathBuf::from(export_filename(None, Utc::now().date_naive())));
    fs::write(&path, csv).map_err(|error| {
        ("write_failed", format!("could not write `{}`: {error}", path.display()), 7u8)
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use matreq_core::domain::status::RequestStatus;

    use super::parse_filter;

    #[test]
    fn status_filter_accepts_known_values_and_all() {
        assert_eq!(parse_filter(None), Ok(None));
        assert_eq!(parse_filter(Some("all")), Ok(None));
        assert_eq!(parse_filter(Some(" Pending ")), Ok(Some(RequestStatus::Pending)));
        assert!(parse_filter(Some("archived")).is_err());
    }
}

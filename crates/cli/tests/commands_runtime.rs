use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use matreq_cli::commands::export::ExportArgs;
use matreq_cli::commands::suggest::SuggestArgs;
use matreq_cli::commands::{doctor, export, migrate, seed, suggest};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    let dir = TempDir::new().expect("temp dir");
    let url = database_url(dir.path());
    with_env(&[("MATREQ_DATABASE_URL", url.as_str())], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("MATREQ_DATABASE_URL", "postgres://elsewhere/matreq")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("temp dir");
    let url = database_url(dir.path());
    with_env(&[("MATREQ_DATABASE_URL", url.as_str())], || {
        for attempt in 0..2 {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "seed attempt {attempt} should succeed");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.contains("4 profiles, 3 sessions, 5 material requests"));
            assert!(message.contains("demo-token-site-lead"));
        }
    });
}

#[test]
fn doctor_reports_pending_migrations_then_passes_after_seed() {
    let dir = TempDir::new().expect("temp dir");
    let url = database_url(dir.path());
    with_env(&[("MATREQ_DATABASE_URL", url.as_str())], || {
        let before = doctor::run(true);
        assert_eq!(before.exit_code, 1);
        let report = parse_payload(&before.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(check_status(&report, "database_connectivity"), "pass");
        assert_eq!(check_status(&report, "schema_migrations"), "fail");

        assert_eq!(seed::run().exit_code, 0);

        let after = doctor::run(true);
        assert_eq!(after.exit_code, 0);
        let report = parse_payload(&after.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(check_status(&report, "suggestion_readiness"), "pass");
    });
}

#[test]
fn doctor_flags_llm_mode_without_key() {
    let dir = TempDir::new().expect("temp dir");
    let url = database_url(dir.path());
    with_env(
        &[("MATREQ_DATABASE_URL", url.as_str()), ("MATREQ_SUGGESTION_MODE", "llm")],
        || {
            let result = doctor::run(false);
            assert_eq!(result.exit_code, 1);
            assert!(result.output.contains("- [fail] suggestion_readiness"));
        },
    );
}

#[test]
fn export_writes_company_scoped_csv() {
    let dir = TempDir::new().expect("temp dir");
    let all = dir.path().join("all.csv");
    let pending = dir.path().join("pending.csv");

    let url = database_url(dir.path());
    with_env(&[("MATREQ_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = export::run(export_args("user-site-lead", None, &all));
        assert_eq!(result.exit_code, 0, "export failed: {}", result.output);
        assert!(parse_payload(&result.output)["message"]
            .as_str()
            .is_some_and(|message| message.starts_with("exported 4 material requests")));

        let result = export::run(export_args("user-site-lead", Some("pending"), &pending));
        assert_eq!(result.exit_code, 0);
    });

    let rows = read_csv(&all);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0][0], "Portland Cement");
    assert!(rows.iter().all(|row| row[0] != "Steel Rebar"));
    let paint = rows.iter().find(|row| row[0] == "Paint").expect("paint row");
    assert_eq!(paint[5], "buyer@northwind.example");
    assert_eq!(paint[7], "Use the \"matte white\" batch");

    let rows = read_csv(&pending);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][3], "pending");
}

#[test]
fn export_for_user_without_profile_writes_header_only() {
    let dir = TempDir::new().expect("temp dir");
    let output = dir.path().join("nobody.csv");

    let url = database_url(dir.path());
    with_env(&[("MATREQ_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);
        let result = export::run(export_args("user-unknown", None, &output));
        assert_eq!(result.exit_code, 0);
    });

    let written = std::fs::read_to_string(&output).expect("export file");
    assert_eq!(
        written,
        "Material Name,Quantity,Unit,Status,Priority,Requested By,Requested At,Notes"
    );
}

#[test]
fn export_rejects_unknown_status() {
    let dir = TempDir::new().expect("temp dir");
    let output = dir.path().join("never.csv");
    let url = database_url(dir.path());
    with_env(&[("MATREQ_DATABASE_URL", url.as_str())], || {
        let result = export::run(export_args("user-site-lead", Some("archived"), &output));
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_status");
    });
    assert!(!output.exists());
}

#[test]
fn suggest_uses_rule_based_heuristic_by_default() {
    with_env(&[("MATREQ_DATABASE_URL", "sqlite::memory:")], || {
        let result = suggest::run(suggest_args("Portland Cement", 150.0));
        assert_eq!(result.exit_code, 0);

        let message = parse_payload(&result.output)["message"].as_str().map(str::to_string);
        assert!(message.is_some_and(|message| message.starts_with("urgent (rules): ")));
    });
}

#[test]
fn suggest_rejects_invalid_input() {
    with_env(&[("MATREQ_DATABASE_URL", "sqlite::memory:")], || {
        let result = suggest::run(suggest_args("Gravel", 0.0));
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn suggest_in_llm_mode_without_key_is_a_configuration_error() {
    with_env(
        &[("MATREQ_DATABASE_URL", "sqlite::memory:"), ("MATREQ_SUGGESTION_MODE", "llm")],
        || {
            let result = suggest::run(suggest_args("Portland Cement", 150.0));
            assert_eq!(result.exit_code, 2);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "configuration");
        },
    );
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("matreq.db").display())
}

fn export_args(user: &str, status: Option<&str>, output: &Path) -> ExportArgs {
    ExportArgs {
        user: user.to_string(),
        status: status.map(str::to_string),
        output: Some(PathBuf::from(output)),
    }
}

fn suggest_args(material_name: &str, quantity: f64) -> SuggestArgs {
    SuggestArgs {
        material_name: material_name.to_string(),
        quantity,
        unit: "kg".to_string(),
        notes: None,
    }
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).expect("open export");
    reader
        .records()
        .map(|record| record.expect("csv record").iter().map(str::to_string).collect())
        .collect()
}

fn check_status(report: &Value, name: &str) -> String {
    report["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .and_then(|check| check["status"].as_str())
        .unwrap_or_default()
        .to_string()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poison| poison.into_inner());

    let keys = [
        "MATREQ_DATABASE_URL",
        "MATREQ_DATABASE_MAX_CONNECTIONS",
        "MATREQ_DATABASE_TIMEOUT_SECS",
        "MATREQ_LLM_API_KEY",
        "GROQ_API_KEY",
        "MATREQ_LLM_BASE_URL",
        "MATREQ_LLM_MODEL",
        "MATREQ_LLM_TIMEOUT_SECS",
        "MATREQ_LLM_TEMPERATURE",
        "MATREQ_LLM_MAX_TOKENS",
        "MATREQ_SUGGESTION_MODE",
        "MATREQ_SERVER_BIND_ADDRESS",
        "MATREQ_SERVER_PORT",
        "MATREQ_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "MATREQ_REQUESTS_ENFORCE_TRANSITIONS",
        "MATREQ_REQUESTS_DEFAULT_LOCALE",
        "MATREQ_LOGGING_LEVEL",
        "MATREQ_LOGGING_FORMAT",
        "MATREQ_LOG_LEVEL",
        "MATREQ_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use matreq_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = match &config.llm.api_key {
        Some(key) => redact_key(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        Field {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["MATREQ_DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["MATREQ_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["MATREQ_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "suggestion.mode",
            value: config.suggestion.mode.as_str().to_string(),
            env_keys: &["MATREQ_SUGGESTION_MODE"],
        },
        Field {
            key: "llm.api_key",
            value: api_key,
            env_keys: &["MATREQ_LLM_API_KEY", "GROQ_API_KEY"],
        },
        Field {
            key: "llm.base_url",
            value: config.llm.base_url.clone(),
            env_keys: &["MATREQ_LLM_BASE_URL"],
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["MATREQ_LLM_MODEL"],
        },
        Field {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["MATREQ_LLM_TIMEOUT_SECS"],
        },
        Field {
            key: "llm.temperature",
            value: config.llm.temperature.to_string(),
            env_keys: &["MATREQ_LLM_TEMPERATURE"],
        },
        Field {
            key: "llm.max_tokens",
            value: config.llm.max_tokens.to_string(),
            env_keys: &["MATREQ_LLM_MAX_TOKENS"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["MATREQ_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["MATREQ_SERVER_PORT"],
        },
        Field {
            key: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["MATREQ_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key: "requests.enforce_transitions",
            value: config.requests.enforce_transitions.to_string(),
            env_keys: &["MATREQ_REQUESTS_ENFORCE_TRANSITIONS"],
        },
        Field {
            key: "requests.default_locale",
            value: config.requests.default_locale.to_string(),
            env_keys: &["MATREQ_REQUESTS_DEFAULT_LOCALE"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["MATREQ_LOGGING_LEVEL", "MATREQ_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            env_keys: &["MATREQ_LOGGING_FORMAT", "MATREQ_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["matreq.toml", "config/matreq.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps a provider prefix such as `gsk_` so operators can tell keys apart.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once(['_', '-']) {
        Some((prefix, _)) if prefix.len() <= 8 => format!("{prefix}_***"),
        _ => "<redacted>".to_string(),
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use slotbook_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in effective_values(&config) {
        let source = field_source(
            entry.key_path,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key_path, &entry.value, source));
    }

    lines.join("\n")
}

struct EffectiveValue {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

fn field(
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
) -> EffectiveValue {
    EffectiveValue { key_path, env_keys, value }
}

fn effective_values(config: &AppConfig) -> Vec<EffectiveValue> {
    let signing_secret = if config.slack.has_signing_secret() { "<redacted>" } else { "<unset>" };

    vec![
        field("database.url", &["SLOTBOOK_DATABASE_URL"], config.database.url.clone()),
        field(
            "database.max_connections",
            &["SLOTBOOK_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            &["SLOTBOOK_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        field(
            "slack.signing_secret",
            &["SLOTBOOK_SLACK_SIGNING_SECRET"],
            signing_secret.to_string(),
        ),
        field(
            "server.bind_address",
            &["SLOTBOOK_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["SLOTBOOK_SERVER_PORT"], config.server.port.to_string()),
        field(
            "server.health_check_port",
            &["SLOTBOOK_SERVER_HEALTH_CHECK_PORT"],
            config.server.health_check_port.to_string(),
        ),
        field(
            "scheduling.upcoming_weeks",
            &["SLOTBOOK_SCHEDULING_UPCOMING_WEEKS"],
            config.scheduling.upcoming_weeks.to_string(),
        ),
        field(
            "logging.level",
            &["SLOTBOOK_LOGGING_LEVEL", "SLOTBOOK_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["SLOTBOOK_LOGGING_FORMAT", "SLOTBOOK_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

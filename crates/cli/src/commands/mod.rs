pub mod config;
pub mod doctor;
pub mod migrate;
pub mod roster;
pub mod schedule;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use slotbook_core::config::{AppConfig, LoadOptions};
use slotbook_core::errors::ApplicationError;
use slotbook_core::scheduling::SchedulingService;
use slotbook_db::{connect_with_config, SqlChallengeRepository, SqlReviewerRepository};
use tokio::runtime::Runtime;

pub type SqlSchedulingService = SchedulingService<SqlReviewerRepository, SqlChallengeRepository>;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps a scheduling failure onto an error class and exit code.
    pub fn scheduling_failure(command: &str, error: &ApplicationError) -> Self {
        let (error_class, exit_code) = match error {
            ApplicationError::Domain(_) => ("invalid_input", 2),
            ApplicationError::NotFound { .. } => ("not_found", 6),
            ApplicationError::Conflict(_) => ("conflict", 7),
            ApplicationError::Persistence(_) => ("persistence", 5),
            ApplicationError::Integration(_) | ApplicationError::Configuration(_) => {
                ("scheduling", 8)
            }
        };
        Self::failure(command, error_class, error.to_string(), exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

fn current_thread_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}

/// Loads configuration and opens the scheduling service over the configured
/// database. Failures come back as a finished [`CommandResult`].
fn open_scheduling(command: &str) -> Result<(Runtime, SqlSchedulingService), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime = current_thread_runtime().map_err(|error| {
        CommandResult::failure(command, "runtime_init", format!("{error:#}"), 3)
    })?;

    let pool = runtime.block_on(connect_with_config(&config.database)).map_err(|error| {
        CommandResult::failure(command, "db_connectivity", error.to_string(), 4)
    })?;

    let service = SchedulingService::new(
        SqlReviewerRepository::new(pool.clone()),
        SqlChallengeRepository::new(pool),
    );
    Ok((runtime, service))
}

fn to_data(command: &str, value: &impl Serialize) -> Result<Value, CommandResult> {
    serde_json::to_value(value).map_err(|error| {
        CommandResult::failure(command, "serialization", error.to_string(), 9)
    })
}

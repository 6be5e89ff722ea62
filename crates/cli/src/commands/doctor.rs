use slotbook_core::config::{AppConfig, LoadOptions};
use slotbook_db::{connect_with_config, migrations, DbPool};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_signing_secret(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_signing_secret", "database_connectivity", "database_schema"] {
                checks.push(skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn check_signing_secret(config: &AppConfig) -> DoctorCheck {
    match config.slack.require_signing_secret() {
        Ok(_) => DoctorCheck {
            name: "slack_signing_secret",
            status: CheckStatus::Pass,
            details: "signing secret is set; Slack requests can be verified".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "slack_signing_secret",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

/// Connectivity, then whether every embedded migration has been applied.
fn check_database(config: &AppConfig) -> [DoctorCheck; 2] {
    let runtime = match super::current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return [
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("{error:#}"),
                },
                skipped("database_schema", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return [
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    skipped("database_schema", "the database is unreachable"),
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        };
        let schema = check_schema(&pool).await;
        pool.close().await;
        [connectivity, schema]
    })
}

async fn check_schema(pool: &DbPool) -> DoctorCheck {
    match migrations::pending(pool).await {
        Ok(pending) if pending.is_empty() => DoctorCheck {
            name: "database_schema",
            status: CheckStatus::Pass,
            details: "all migrations applied".to_string(),
        },
        Ok(pending) => DoctorCheck {
            name: "database_schema",
            status: CheckStatus::Fail,
            details: format!("pending migrations: {}; run `slotbook migrate`", pending.join(", ")),
        },
        Err(error) => DoctorCheck {
            name: "database_schema",
            status: CheckStatus::Fail,
            details: format!("failed to read migration history: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

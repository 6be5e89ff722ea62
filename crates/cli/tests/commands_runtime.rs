use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use slotbook_cli::commands::{doctor, migrate, roster, schedule};
use slotbook_core::domain::challenge::{ChallengeId, ChallengeSetup, SlotId};
use slotbook_core::domain::reviewer::{ExternalUserId, ReviewerProfile};
use slotbook_core::scheduling::SchedulingService;
use slotbook_db::{connect, migrations, SqlChallengeRepository, SqlReviewerRepository};

const MANAGED_VARS: &[&str] = &[
    "SLOTBOOK_DATABASE_URL",
    "SLOTBOOK_DATABASE_MAX_CONNECTIONS",
    "SLOTBOOK_DATABASE_TIMEOUT_SECS",
    "SLOTBOOK_SLACK_SIGNING_SECRET",
    "SLOTBOOK_SERVER_PORT",
    "SLOTBOOK_SCHEDULING_UPCOMING_WEEKS",
    "SLOTBOOK_LOG_LEVEL",
    "SLOTBOOK_LOG_FORMAT",
    "SLOTBOOK_LOGGING_LEVEL",
    "SLOTBOOK_LOGGING_FORMAT",
];

#[test]
fn migrate_returns_success_with_valid_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());

    with_env(&[("SLOTBOOK_DATABASE_URL", url.as_str())], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("SLOTBOOK_DATABASE_URL", "postgres://localhost/slotbook")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_reports_missing_signing_secret_and_pending_migrations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());

    with_env(&[("SLOTBOOK_DATABASE_URL", url.as_str())], || {
        let report: Value = serde_json::from_str(&doctor::run(true)).expect("doctor json");
        assert_eq!(report["overall_status"], "fail");

        let status_of = |name: &str| {
            report["checks"]
                .as_array()
                .expect("checks")
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .expect("check present")
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("slack_signing_secret"), "fail");
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("database_schema"), "fail");
    });
}

#[test]
fn doctor_passes_once_secret_is_set_and_schema_is_current() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());

    let vars = [
        ("SLOTBOOK_DATABASE_URL", url.as_str()),
        ("SLOTBOOK_SLACK_SIGNING_SECRET", "test-secret"),
    ];

    with_env(&vars, || {
        assert_eq!(migrate::run().exit_code, 0);

        let human = doctor::run(false);
        assert!(human.starts_with("doctor: all readiness checks passed"), "{human}");
        assert!(!human.contains("test-secret"));
    });
}

#[test]
fn roster_lists_available_reviewers_by_day_and_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());
    seed_schedules(&url);

    with_env(&[("SLOTBOOK_DATABASE_URL", url.as_str())], || {
        let result = roster::run("backend", 7, 2024, "");
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "roster");
        let monday = &payload["data"]["days"]["Monday"];
        let reviewers = monday["MondayMorning"]["reviewers"].as_array().expect("reviewers");
        assert_eq!(reviewers.len(), 2);
        assert!(payload["data"]["days"].get("Tuesday").is_none());

        let filtered = parse_payload(&roster::run("backend", 7, 2024, "go").output);
        let reviewers = filtered["data"]["days"]["Monday"]["MondayMorning"]["reviewers"]
            .as_array()
            .expect("reviewers");
        assert_eq!(reviewers.len(), 1);
        assert_eq!(reviewers[0]["reviewer"]["external_user_id"], "U2");
    });
}

#[test]
fn roster_rejects_out_of_range_weeks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());
    seed_schedules(&url);

    with_env(&[("SLOTBOOK_DATABASE_URL", url.as_str())], || {
        let result = roster::run("backend", 53, 2024, "");
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn schedule_reports_resolved_availability_and_exact_week_bookings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());
    seed_schedules(&url);

    with_env(&[("SLOTBOOK_DATABASE_URL", url.as_str())], || {
        let result = schedule::run("U1", 7, 2024);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let data = &parse_payload(&result.output)["data"];
        assert_eq!(data["week_index"], "7-2024");
        assert_eq!(data["booking_cap"], 2);
        assert_eq!(data["available"], serde_json::json!(["MondayMorning"]));
        assert_eq!(data["booked"], serde_json::json!(["MondayMorning"]));

        let general = parse_payload(&schedule::run("U1", 0, 2024).output);
        assert_eq!(general["data"]["week_index"], "General");
        assert_eq!(general["data"]["booked"], serde_json::json!([]));
    });
}

#[test]
fn schedule_reports_unknown_reviewers_as_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(dir.path());
    seed_schedules(&url);

    with_env(&[("SLOTBOOK_DATABASE_URL", url.as_str())], || {
        let result = schedule::run("U404", 7, 2024);
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "not_found");
    });
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("slotbook.db").display())
}

/// Two reviewers on the `backend` challenge: U1 available Monday morning in the
/// General week and booked there in week 7, U2 available Monday morning in week 7.
fn seed_schedules(url: &str) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let pool = connect(url).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let service = SchedulingService::new(
            SqlReviewerRepository::new(pool.clone()),
            SqlChallengeRepository::new(pool.clone()),
        );

        service
            .save_challenge(ChallengeSetup {
                id: ChallengeId("backend".to_string()),
                name: "Backend Challenge".to_string(),
                github_owner: "octocat".to_string(),
                github_org: None,
                template_repo: "backend-template".to_string(),
                repo_name_format: "backend-{candidate}".to_string(),
                created_by_team_id: "T1".to_string(),
                slots: Default::default(),
            })
            .await
            .expect("save challenge");

        for (user, name, technologies) in [("U1", "ada", "rust, python"), ("U2", "grace", "go")] {
            service
                .register_reviewer(
                    name,
                    &ExternalUserId(user.to_string()),
                    ReviewerProfile {
                        github_alias: name.to_string(),
                        technology_list: technologies.to_string(),
                        challenge_id: ChallengeId("backend".to_string()),
                        bookings_per_week: "2".to_string(),
                    },
                )
                .await
                .expect("register reviewer");
        }

        let monday_morning = SlotId::new("MondayMorning");
        let ada = ExternalUserId("U1".to_string());
        let grace = ExternalUserId("U2".to_string());
        service
            .update_availability(&ada, &monday_morning, 0, 2024, true)
            .await
            .expect("ada general availability");
        service.update_booking(&ada, &monday_morning, 7, 2024, true).await.expect("book ada");
        service
            .update_availability(&grace, &monday_morning, 7, 2024, true)
            .await
            .expect("grace week availability");

        pool.close().await;
    });
}

fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test: impl FnOnce()) {
    let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    for key in MANAGED_VARS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test();

    for key in MANAGED_VARS {
        env::remove_var(key);
    }
}

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

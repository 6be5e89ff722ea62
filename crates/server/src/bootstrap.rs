use std::sync::Arc;

use secrecy::ExposeSecret;
use slotbook_core::config::{AppConfig, ConfigError};
use slotbook_core::scheduling::SchedulingService;
use slotbook_db::{connect_with_config, migrations, DbPool};
use slotbook_db::{SqlChallengeRepository, SqlReviewerRepository};
use slotbook_slack::signature::{SignatureError, SignatureVerifier};
use thiserror::Error;
use tracing::info;

pub type SqlSchedulingService = SchedulingService<SqlReviewerRepository, SqlChallengeRepository>;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<SqlSchedulingService>,
    pub verifier: SignatureVerifier,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack signing secret is unusable: {0}")]
    Signing(#[from] SignatureError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

/// Fails before touching the database when Slack requests could not be verified.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let secret = config.slack.require_signing_secret()?;
    let verifier = SignatureVerifier::new(secret.expose_secret().as_bytes())?;

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let service = Arc::new(SchedulingService::new(
        SqlReviewerRepository::new(db_pool.clone()),
        SqlChallengeRepository::new(db_pool.clone()),
    ));

    Ok(Application { config, db_pool, service, verifier })
}

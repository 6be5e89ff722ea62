use std::str::FromStr;
use std::time::Duration;

use slotbook_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_config(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options =
        SqliteConnectOptions::from_str(normalize_url(database_url))?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await
}

/// `:memory:` is accepted by config validation; sqlx wants the `sqlite::memory:` spelling.
fn normalize_url(database_url: &str) -> &str {
    match database_url.trim() {
        ":memory:" => "sqlite::memory:",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use slotbook_core::config::DatabaseConfig;

    use super::{connect_with_config, normalize_url};

    #[test]
    fn bare_memory_url_is_normalized() {
        assert_eq!(normalize_url(":memory:"), "sqlite::memory:");
        assert_eq!(normalize_url("sqlite://slotbook.db"), "sqlite://slotbook.db");
    }

    #[tokio::test]
    async fn connects_from_database_config() {
        let pool = connect_with_config(&DatabaseConfig {
            url: ":memory:".to_string(),
            max_connections: 1,
            timeout_secs: 5,
        })
        .await
        .expect("connect");

        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("query");
        assert_eq!(one, 1);
    }
}

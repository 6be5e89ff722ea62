use sqlx::Row;

use slotbook_core::domain::challenge::ChallengeId;
use slotbook_core::domain::reviewer::{
    ExternalUserId, Reviewer, ReviewerId, WeeklySlots, DEFAULT_BOOKINGS_PER_WEEK,
};
use slotbook_core::scheduling::store::{ReviewerStore, StoreError};

use super::{decode_error, RepositoryError};
use crate::DbPool;

const REVIEWER_COLUMNS: &str = "id, name, github_alias, external_user_id, technology_list,
    challenge_id, bookings_per_week, availability_json, bookings_json, revision";

pub struct SqlReviewerRepository {
    pool: DbPool,
}

impl SqlReviewerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_external_id(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Reviewer>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {REVIEWER_COLUMNS} FROM reviewer WHERE external_user_id = ?"
        ))
        .bind(&external_user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_reviewer(r)?)),
            None => Ok(None),
        }
    }

    pub async fn list_for_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Reviewer>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {REVIEWER_COLUMNS} FROM reviewer WHERE challenge_id = ? ORDER BY name, id"
        ))
        .bind(&challenge_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reviewer).collect::<Result<Vec<_>, _>>()
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviewer")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whole-document replace guarded by the revision the caller read.
    ///
    /// Revision 0 means "not stored yet" and inserts; anything else updates only if
    /// the stored revision still matches.
    pub async fn save(&self, mut reviewer: Reviewer) -> Result<Reviewer, RepositoryError> {
        let availability_json =
            serde_json::to_string(&reviewer.availability).map_err(decode_error)?;
        let bookings_json = serde_json::to_string(&reviewer.bookings).map_err(decode_error)?;
        let expected = to_db_revision(reviewer.revision)?;
        let next = expected + 1;

        let result = if reviewer.revision == 0 {
            sqlx::query(
                "INSERT INTO reviewer (id, name, github_alias, external_user_id, technology_list,
                                       challenge_id, bookings_per_week, availability_json,
                                       bookings_json, revision)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(&reviewer.id.0)
            .bind(&reviewer.name)
            .bind(&reviewer.github_alias)
            .bind(&reviewer.external_user_id.0)
            .bind(&reviewer.technology_list)
            .bind(&reviewer.challenge_id.0)
            .bind(i64::from(reviewer.bookings_per_week))
            .bind(&availability_json)
            .bind(&bookings_json)
            .bind(next)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE reviewer SET
                     name = ?,
                     github_alias = ?,
                     external_user_id = ?,
                     technology_list = ?,
                     challenge_id = ?,
                     bookings_per_week = ?,
                     availability_json = ?,
                     bookings_json = ?,
                     revision = ?,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ? AND revision = ?",
            )
            .bind(&reviewer.name)
            .bind(&reviewer.github_alias)
            .bind(&reviewer.external_user_id.0)
            .bind(&reviewer.technology_list)
            .bind(&reviewer.challenge_id.0)
            .bind(i64::from(reviewer.bookings_per_week))
            .bind(&availability_json)
            .bind(&bookings_json)
            .bind(next)
            .bind(&reviewer.id.0)
            .bind(expected)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT revision FROM reviewer WHERE id = ?")
                    .bind(&reviewer.id.0)
                    .fetch_optional(&self.pool)
                    .await?;
            return Err(RepositoryError::Conflict {
                entity: "reviewer",
                key: reviewer.id.0.clone(),
                expected: reviewer.revision,
                actual: actual.map_or(0, |value| u64::try_from(value).unwrap_or(0)),
            });
        }

        reviewer.revision += 1;
        Ok(reviewer)
    }
}

#[async_trait::async_trait]
impl ReviewerStore for SqlReviewerRepository {
    async fn find_by_external_id(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Reviewer>, StoreError> {
        Ok(SqlReviewerRepository::find_by_external_id(self, external_user_id).await?)
    }

    async fn list_for_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Reviewer>, StoreError> {
        Ok(SqlReviewerRepository::list_for_challenge(self, challenge_id).await?)
    }

    async fn save(&self, reviewer: Reviewer) -> Result<Reviewer, StoreError> {
        Ok(SqlReviewerRepository::save(self, reviewer).await?)
    }
}

fn to_db_revision(revision: u64) -> Result<i64, RepositoryError> {
    i64::try_from(revision)
        .map_err(|_| RepositoryError::Decode(format!("revision {revision} exceeds storage range")))
}

fn row_to_reviewer(row: &sqlx::sqlite::SqliteRow) -> Result<Reviewer, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let github_alias: String = row.try_get("github_alias").map_err(decode_error)?;
    let external_user_id: String = row.try_get("external_user_id").map_err(decode_error)?;
    let technology_list: String = row.try_get("technology_list").map_err(decode_error)?;
    let challenge_id: String = row.try_get("challenge_id").map_err(decode_error)?;
    let bookings_per_week: i64 = row.try_get("bookings_per_week").map_err(decode_error)?;
    let availability_json: String = row.try_get("availability_json").map_err(decode_error)?;
    let bookings_json: String = row.try_get("bookings_json").map_err(decode_error)?;
    let revision: i64 = row.try_get("revision").map_err(decode_error)?;

    let availability: WeeklySlots = serde_json::from_str(&availability_json)
        .map_err(|error| RepositoryError::Decode(format!("reviewer `{id}` availability: {error}")))?;
    let bookings: WeeklySlots = serde_json::from_str(&bookings_json)
        .map_err(|error| RepositoryError::Decode(format!("reviewer `{id}` bookings: {error}")))?;

    Ok(Reviewer {
        id: ReviewerId(id),
        name,
        github_alias,
        external_user_id: ExternalUserId(external_user_id),
        technology_list,
        challenge_id: ChallengeId(challenge_id),
        bookings_per_week: u32::try_from(bookings_per_week)
            .ok()
            .filter(|cap| *cap > 0)
            .unwrap_or(DEFAULT_BOOKINGS_PER_WEEK),
        availability,
        bookings,
        revision: u64::try_from(revision).map_err(decode_error)?,
    })
}

use std::collections::BTreeMap;

use sqlx::Row;

use slotbook_core::domain::challenge::{ChallengeId, ChallengeSetup, Slot, SlotId};
use slotbook_core::scheduling::store::{ChallengeStore, StoreError};

use super::{decode_error, RepositoryError};
use crate::DbPool;

pub struct SqlChallengeRepository {
    pool: DbPool,
}

impl SqlChallengeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        id: &ChallengeId,
    ) -> Result<Option<ChallengeSetup>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, github_owner, github_org, template_repo, repo_name_format,
                    created_by_team_id
             FROM challenge_setup WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let slot_rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT slot_id, ordinal, name, day, start_time, end_time
             FROM challenge_slot WHERE challenge_id = ? ORDER BY ordinal, slot_id",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut slots = BTreeMap::new();
        for slot_row in &slot_rows {
            let slot = row_to_slot(slot_row)?;
            slots.insert(slot.id.clone(), slot);
        }

        Ok(Some(ChallengeSetup {
            id: ChallengeId(row.try_get("id").map_err(decode_error)?),
            name: row.try_get("name").map_err(decode_error)?,
            github_owner: row.try_get("github_owner").map_err(decode_error)?,
            github_org: row.try_get("github_org").map_err(decode_error)?,
            template_repo: row.try_get("template_repo").map_err(decode_error)?,
            repo_name_format: row.try_get("repo_name_format").map_err(decode_error)?,
            created_by_team_id: row.try_get("created_by_team_id").map_err(decode_error)?,
            slots,
        }))
    }

    /// Upserts the setup and replaces its slot catalog in one transaction.
    pub async fn save(&self, setup: ChallengeSetup) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO challenge_setup (id, name, github_owner, github_org, template_repo,
                                          repo_name_format, created_by_team_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 github_owner = excluded.github_owner,
                 github_org = excluded.github_org,
                 template_repo = excluded.template_repo,
                 repo_name_format = excluded.repo_name_format,
                 created_by_team_id = excluded.created_by_team_id,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(&setup.id.0)
        .bind(&setup.name)
        .bind(&setup.github_owner)
        .bind(&setup.github_org)
        .bind(&setup.template_repo)
        .bind(&setup.repo_name_format)
        .bind(&setup.created_by_team_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM challenge_slot WHERE challenge_id = ?")
            .bind(&setup.id.0)
            .execute(&mut *tx)
            .await?;

        for slot in setup.slots.values() {
            sqlx::query(
                "INSERT INTO challenge_slot (challenge_id, slot_id, ordinal, name, day,
                                             start_time, end_time)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&setup.id.0)
            .bind(&slot.id.0)
            .bind(i64::from(slot.ordinal))
            .bind(&slot.name)
            .bind(&slot.day)
            .bind(&slot.start_time)
            .bind(&slot.end_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM challenge_setup")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl ChallengeStore for SqlChallengeRepository {
    async fn find_setup(&self, id: &ChallengeId) -> Result<Option<ChallengeSetup>, StoreError> {
        Ok(self.find_by_id(id).await?)
    }

    async fn save_setup(&self, setup: ChallengeSetup) -> Result<(), StoreError> {
        Ok(self.save(setup).await?)
    }
}

fn row_to_slot(row: &sqlx::sqlite::SqliteRow) -> Result<Slot, RepositoryError> {
    let slot_id: String = row.try_get("slot_id").map_err(decode_error)?;
    let ordinal: i64 = row.try_get("ordinal").map_err(decode_error)?;

    Ok(Slot {
        ordinal: u32::try_from(ordinal).map_err(|_| {
            RepositoryError::Decode(format!("slot `{slot_id}` has invalid ordinal {ordinal}"))
        })?,
        id: SlotId(slot_id),
        name: row.try_get("name").map_err(decode_error)?,
        day: row.try_get("day").map_err(decode_error)?,
        start_time: row.try_get("start_time").map_err(decode_error)?,
        end_time: row.try_get("end_time").map_err(decode_error)?,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use slotbook_core::domain::challenge::{ChallengeId, ChallengeSetup, SlotId};
    use slotbook_core::scheduling::store::ChallengeStore;

    use super::SqlChallengeRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_setup(id: &str) -> ChallengeSetup {
        ChallengeSetup {
            id: ChallengeId(id.to_string()),
            name: "Backend Challenge".to_string(),
            github_owner: "octocat".to_string(),
            github_org: Some("acme".to_string()),
            template_repo: "backend-template".to_string(),
            repo_name_format: "backend-{candidate}".to_string(),
            created_by_team_id: "T1".to_string(),
            slots: ChallengeSetup::default_slots(),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_slot_catalog() {
        let repo = SqlChallengeRepository::new(setup().await);
        let challenge = sample_setup("ch-1");

        repo.save(challenge.clone()).await.expect("save");
        let found = repo.find_by_id(&ChallengeId("ch-1".to_string())).await.expect("find");

        assert_eq!(found, Some(challenge));
        assert_eq!(repo.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn missing_challenge_is_none() {
        let repo = SqlChallengeRepository::new(setup().await);
        let found = repo.find_setup(&ChallengeId("nope".to_string())).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn saving_again_replaces_catalog() {
        let repo = SqlChallengeRepository::new(setup().await);
        repo.save(sample_setup("ch-1")).await.expect("save");

        let mut updated = sample_setup("ch-1");
        updated.github_org = None;
        updated.slots.retain(|id, _| id.as_str().starts_with("Friday"));
        repo.save_setup(updated).await.expect("update");

        let found = repo
            .find_by_id(&ChallengeId("ch-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.github_org, None);
        assert_eq!(
            found.slots.keys().collect::<Vec<_>>(),
            vec![&SlotId::new("FridayAfternoon"), &SlotId::new("FridayMorning")]
        );

        let mut empty = sample_setup("ch-2");
        empty.slots = BTreeMap::new();
        repo.save(empty).await.expect("save without slots");
        let found = repo.find_by_id(&ChallengeId("ch-2".to_string())).await.expect("find");
        assert!(found.expect("should exist").slots.is_empty());
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::challenge::{ChallengeId, ChallengeSetup};
use crate::domain::reviewer::{ExternalUserId, Reviewer, ReviewerId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} `{key}` was not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{entity} `{key}` revision conflict (expected {expected}, found {actual})")]
    Conflict { entity: &'static str, key: String, expected: u64, actual: u64 },
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("store decode failure: {0}")]
    Decode(String),
}

/// Persistence port for reviewer documents.
///
/// `save` replaces the whole document and is a compare-and-swap on
/// [`Reviewer::revision`]: it succeeds only if the stored revision still equals
/// the one the caller read (0 for a document that does not exist yet) and
/// returns the stored copy with the revision advanced.
#[async_trait]
pub trait ReviewerStore: Send + Sync {
    async fn find_by_external_id(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Reviewer>, StoreError>;

    async fn list_for_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Reviewer>, StoreError>;

    async fn save(&self, reviewer: Reviewer) -> Result<Reviewer, StoreError>;
}

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn find_setup(&self, id: &ChallengeId) -> Result<Option<ChallengeSetup>, StoreError>;

    async fn save_setup(&self, setup: ChallengeSetup) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryReviewerStore {
    reviewers: RwLock<HashMap<ReviewerId, Reviewer>>,
}

#[async_trait]
impl ReviewerStore for InMemoryReviewerStore {
    async fn find_by_external_id(
        &self,
        external_user_id: &ExternalUserId,
    ) -> Result<Option<Reviewer>, StoreError> {
        let reviewers = self.reviewers.read().await;
        Ok(reviewers
            .values()
            .find(|reviewer| &reviewer.external_user_id == external_user_id)
            .cloned())
    }

    async fn list_for_challenge(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Reviewer>, StoreError> {
        let reviewers = self.reviewers.read().await;
        let mut roster = reviewers
            .values()
            .filter(|reviewer| &reviewer.challenge_id == challenge_id)
            .cloned()
            .collect::<Vec<_>>();
        roster.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(roster)
    }

    async fn save(&self, mut reviewer: Reviewer) -> Result<Reviewer, StoreError> {
        let mut reviewers = self.reviewers.write().await;
        let stored_revision = reviewers.get(&reviewer.id).map_or(0, |stored| stored.revision);
        if stored_revision != reviewer.revision {
            return Err(StoreError::Conflict {
                entity: "reviewer",
                key: reviewer.id.0.clone(),
                expected: reviewer.revision,
                actual: stored_revision,
            });
        }

        reviewer.revision += 1;
        reviewers.insert(reviewer.id.clone(), reviewer.clone());
        Ok(reviewer)
    }
}

#[derive(Default)]
pub struct InMemoryChallengeStore {
    setups: RwLock<HashMap<ChallengeId, ChallengeSetup>>,
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn find_setup(&self, id: &ChallengeId) -> Result<Option<ChallengeSetup>, StoreError> {
        let setups = self.setups.read().await;
        Ok(setups.get(id).cloned())
    }

    async fn save_setup(&self, setup: ChallengeSetup) -> Result<(), StoreError> {
        let mut setups = self.setups.write().await;
        setups.insert(setup.id.clone(), setup);
        Ok(())
    }
}

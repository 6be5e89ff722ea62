use thiserror::Error;

use slotbook_core::scheduling::store::StoreError;

pub mod challenge;
pub mod reviewer;

pub use challenge::SqlChallengeRepository;
pub use reviewer::SqlReviewerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{key}` revision conflict (expected {expected}, found {actual})")]
    Conflict { entity: &'static str, key: String, expected: u64, actual: u64 },
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Backend(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
            RepositoryError::Conflict { entity, key, expected, actual } => {
                Self::Conflict { entity, key, expected, actual }
            }
        }
    }
}

fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

#[cfg(test)]
mod tests {
    use slotbook_core::scheduling::store::StoreError;

    use super::RepositoryError;

    #[test]
    fn repository_errors_map_onto_store_errors() {
        assert_eq!(
            StoreError::from(RepositoryError::Decode("bad json".to_string())),
            StoreError::Decode("bad json".to_string())
        );
        assert!(matches!(
            StoreError::from(RepositoryError::Database(sqlx::Error::PoolTimedOut)),
            StoreError::Backend(_)
        ));
        assert_eq!(
            StoreError::from(RepositoryError::Conflict {
                entity: "reviewer",
                key: "r-1".to_string(),
                expected: 2,
                actual: 3,
            }),
            StoreError::Conflict { entity: "reviewer", key: "r-1".to_string(), expected: 2, actual: 3 }
        );
    }
}

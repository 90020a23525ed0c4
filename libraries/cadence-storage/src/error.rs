/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A stored value does not map onto a domain value
    #[error("Corrupt {column} value: {value}")]
    Corrupt { column: String, value: String },

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a corrupt value error
    pub fn corrupt(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Corrupt {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl From<StorageError> for cadence_core::CadenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::not_found(entity, id),
            other => Self::storage(other.to_string()),
        }
    }
}

/// Convert an `i64` column to an unsigned value, rejecting negatives
pub(crate) fn unsigned<T: TryFrom<i64>>(column: &str, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| StorageError::corrupt(column, value.to_string()))
}

/// Convert an unsigned value for binding into an `INTEGER` column
pub(crate) fn signed<T: TryInto<i64> + Copy + ToString>(column: &str, value: T) -> Result<i64> {
    value
        .try_into()
        .map_err(|_| StorageError::corrupt(column, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_entity() {
        let err: cadence_core::CadenceError = StorageError::not_found("Track", "t1").into();
        assert_eq!(err.to_string(), "Track not found: t1");
    }

    #[test]
    fn negative_columns_are_corrupt() {
        assert!(unsigned::<u64>("bookmark_ms", -1).is_err());
        assert_eq!(unsigned::<u32>("position", 7).unwrap(), 7);
        assert_eq!(signed("duration_ms", 42u64).unwrap(), 42);
    }
}

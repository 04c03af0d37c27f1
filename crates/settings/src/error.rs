//! Settings store error types.

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

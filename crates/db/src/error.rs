use bedtime_core::types::DbId;

/// All errors that can be returned by a [`StoryStore`](crate::store::StoryStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with the given id exists.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// A backend error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

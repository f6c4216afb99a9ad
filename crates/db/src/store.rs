//! The persistence seam used by the story pipeline and the API.
//!
//! [`StoryStore`] is the handle the pipeline mutates records through. The
//! Postgres implementation delegates to the repositories; the in-memory
//! implementation in [`crate::memory`] has identical merge semantics.

use async_trait::async_trait;
use bedtime_core::types::DbId;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::story::{CreateStory, Story, StoryPatch, StoryQuery};
use crate::models::user::User;
use crate::repositories::{StoryRepo, UserRepo};

/// Storage for stories and the users that own them.
///
/// Implementations must be `Send + Sync + 'static` to live in axum state and
/// cross task boundaries.
#[async_trait]
pub trait StoryStore: Send + Sync + 'static {
    /// Insert a new story in the `created` state at attempt 1.
    async fn create(&self, input: &CreateStory) -> Result<Story, StoreError>;

    /// Read a story by id.
    async fn find_by_id(&self, id: DbId) -> Result<Option<Story>, StoreError>;

    /// Read every story whose id is in `ids`, in unspecified order.
    async fn find_by_ids(&self, ids: &[DbId]) -> Result<Vec<Story>, StoreError>;

    /// Merge `patch` into the story and return the updated record.
    ///
    /// Returns `Err(StoreError::NotFound)` if the story does not exist.
    async fn update(&self, id: DbId, patch: &StoryPatch) -> Result<Story, StoreError>;

    /// List stories matching `query`.
    async fn list(&self, query: &StoryQuery) -> Result<Vec<Story>, StoreError>;

    /// Find a user by email address.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// [`StoryStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn create(&self, input: &CreateStory) -> Result<Story, StoreError> {
        Ok(StoryRepo::create(&self.pool, input).await?)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Story>, StoreError> {
        Ok(StoryRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> Result<Vec<Story>, StoreError> {
        Ok(StoryRepo::find_by_ids(&self.pool, ids).await?)
    }

    async fn update(&self, id: DbId, patch: &StoryPatch) -> Result<Story, StoreError> {
        StoryRepo::update(&self.pool, id, patch)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "Story",
                id,
            })
    }

    async fn list(&self, query: &StoryQuery) -> Result<Vec<Story>, StoreError> {
        Ok(StoryRepo::list(&self.pool, query).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

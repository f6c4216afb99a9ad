//! Repository for the `stories` table.
//!
//! State columns are written as `StoryState` ids from `bedtime_core::story`.
//! No magic numbers: every state literal goes through the enum.

use bedtime_core::story::StoryState;
use bedtime_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::story::{CreateStory, Story, StoryPatch, StoryQuery};

/// Column list for `stories` queries.
const COLUMNS: &str = "\
    id, user_id, parent_story_id, prompt, state_id, attempt, \
    title, summary, text, image_prompt, image, audio, duration, \
    completed_at, is_public, is_daily_story, created_at, updated_at";

/// Maximum page size for story listing.
const MAX_LIMIT: i64 = 100;

/// Provides CRUD operations for stories.
pub struct StoryRepo;

impl StoryRepo {
    /// Insert a new story in the `created` state, returning the row.
    pub async fn create(pool: &PgPool, input: &CreateStory) -> Result<Story, sqlx::Error> {
        let query = format!(
            "INSERT INTO stories (user_id, parent_story_id, prompt, state_id, is_public, is_daily_story)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(input.user_id)
            .bind(input.parent_story_id)
            .bind(&input.prompt)
            .bind(StoryState::Created.id())
            .bind(input.is_public)
            .bind(input.is_daily_story)
            .fetch_one(pool)
            .await
    }

    /// Find a story by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1");
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch every story whose id is in `ids`. Order is unspecified and
    /// missing ids are simply absent from the result.
    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Story>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = ANY($1)");
        sqlx::query_as::<_, Story>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update. Only `Some` fields in `patch` are written.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        patch: &StoryPatch,
    ) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET
                state_id = COALESCE($2, state_id),
                attempt = COALESCE($3, attempt),
                title = COALESCE($4, title),
                summary = COALESCE($5, summary),
                text = COALESCE($6, text),
                image_prompt = COALESCE($7, image_prompt),
                image = COALESCE($8, image),
                audio = COALESCE($9, audio),
                duration = COALESCE($10, duration),
                completed_at = COALESCE($11, completed_at),
                is_public = COALESCE($12, is_public)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(patch.state.map(StoryState::id))
            .bind(patch.attempt)
            .bind(&patch.title)
            .bind(&patch.summary)
            .bind(&patch.text)
            .bind(&patch.image_prompt)
            .bind(patch.image.clone().map(Json))
            .bind(&patch.audio)
            .bind(patch.duration)
            .bind(patch.completed_at)
            .bind(patch.is_public)
            .fetch_optional(pool)
            .await
    }

    /// List stories matching `filter`, ordered by creation time.
    ///
    /// The limit is capped at 100 rows.
    pub async fn list(pool: &PgPool, filter: &StoryQuery) -> Result<Vec<Story>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM stories WHERE TRUE"));

        if !filter.states.is_empty() {
            let ids: Vec<i16> = filter.states.iter().map(|s| s.id()).collect();
            builder.push(" AND state_id = ANY(").push_bind(ids).push(")");
        }
        if let Some(is_public) = filter.is_public {
            builder.push(" AND is_public = ").push_bind(is_public);
        }
        if let Some(is_daily_story) = filter.is_daily_story {
            builder.push(" AND is_daily_story = ").push_bind(is_daily_story);
        }
        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }

        builder.push(if filter.newest_first {
            " ORDER BY created_at DESC, id DESC"
        } else {
            " ORDER BY created_at ASC, id ASC"
        });

        let limit = filter.limit.unwrap_or(MAX_LIMIT).clamp(1, MAX_LIMIT);
        builder.push(" LIMIT ").push_bind(limit);
        if let Some(offset) = filter.offset {
            builder.push(" OFFSET ").push_bind(offset.max(0));
        }

        builder.build_query_as::<Story>().fetch_all(pool).await
    }
}

//! Handlers for stories.
//!
//! Endpoints:
//! - POST   /stories
//! - GET    /stories
//! - GET    /stories/{id}
//! - GET    /stories/{id}/related
//! - PUT    /stories/{id}/duration

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bedtime_core::error::CoreError;
use bedtime_core::media::format_duration;
use bedtime_core::story::{validate_duration, validate_prompt, StoryState};
use bedtime_core::types::DbId;
use bedtime_db::models::story::{CreateStory, Story, StoryPatch, StoryQuery};
use bedtime_db::StoryStore;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{DataResponse, DurationResponse, RelatedStoriesResponse, StoryView};
use crate::state::AppState;

/// Body of `POST /stories`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoryRequest {
    pub prompt: String,
    pub user_id: Option<DbId>,
    pub parent_story_id: Option<DbId>,
    #[serde(default)]
    pub is_public: bool,
}

/// Body of `PUT /stories/{id}/duration`.
#[derive(Debug, Deserialize)]
pub struct UpdateDurationRequest {
    pub duration: f64,
}

/// Pagination for the public feed (`?limit=&offset=`).
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Load a story or fail with 404.
async fn load_story(store: &dyn StoryStore, id: DbId) -> AppResult<Story> {
    store.find_by_id(id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Story",
            id,
        })
    })
}

/// POST /api/v1/stories
///
/// Create a story and start generating it in the background. Returns 201
/// with the story in its initial state.
pub async fn create_story(
    State(state): State<AppState>,
    Json(body): Json<CreateStoryRequest>,
) -> AppResult<impl IntoResponse> {
    validate_prompt(&body.prompt)?;

    if let Some(parent_id) = body.parent_story_id {
        if state.store.find_by_id(parent_id).await?.is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "parent story {parent_id} does not exist"
            ))));
        }
    }

    let story = state
        .store
        .create(&CreateStory {
            user_id: body.user_id,
            prompt: body.prompt,
            parent_story_id: body.parent_story_id,
            is_public: body.is_public,
            is_daily_story: false,
        })
        .await?;

    tracing::info!(
        story_id = story.id,
        parent_story_id = ?story.parent_story_id,
        "Story created",
    );
    state.pipeline.spawn_after_create(story.id);

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: StoryView::new(story, &state.config),
        }),
    ))
}

/// GET /api/v1/stories
///
/// Public feed: ready, public stories, newest first.
pub async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let stories = state
        .store
        .list(&StoryQuery {
            states: vec![StoryState::Ready],
            is_public: Some(true),
            newest_first: true,
            limit: params.limit,
            offset: params.offset,
            ..Default::default()
        })
        .await?;

    let views: Vec<StoryView> = stories
        .into_iter()
        .map(|s| StoryView::new(s, &state.config))
        .collect();
    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/stories/{id}
pub async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let story = load_story(state.store.as_ref(), id).await?;
    Ok(Json(DataResponse {
        data: StoryView::new(story, &state.config),
    }))
}

/// GET /api/v1/stories/{id}/related
///
/// The story plus up to five similar stories in rank order. Slots whose
/// story could not be loaded are `null`.
pub async fn related_stories(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let story = load_story(state.store.as_ref(), id).await?;
    let related = state.similarity.find_similar(&story).await?;

    Ok(Json(RelatedStoriesResponse {
        story: StoryView::new(story, &state.config),
        related_stories: related
            .into_iter()
            .map(|slot| slot.map(|s| StoryView::new(s, &state.config)))
            .collect(),
    }))
}

/// PUT /api/v1/stories/{id}/duration
///
/// Record the playback duration reported by a client. Only `duration` is
/// written.
pub async fn update_duration(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateDurationRequest>,
) -> AppResult<impl IntoResponse> {
    validate_duration(body.duration)?;

    let story = state
        .store
        .update(id, &StoryPatch::duration(body.duration))
        .await?;
    state.pipeline.spawn_after_update(story.id);

    let duration = story.duration.unwrap_or(body.duration);
    Ok(Json(DataResponse {
        data: DurationResponse {
            id: story.id,
            duration,
            duration_label: format_duration(duration),
        },
    }))
}

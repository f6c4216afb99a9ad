//! Response envelopes and story views.
//!
//! Most endpoints wrap their payload in `{ "data": ... }`. Stories are
//! rendered through [`StoryView`], which exposes the state by name and turns
//! the stored audio path into a public URL.

use bedtime_core::media::format_duration;
use bedtime_core::story::{StoredImage, StoryState};
use bedtime_core::types::{DbId, Timestamp};
use bedtime_db::models::story::Story;
use serde::Serialize;

use crate::config::ServerConfig;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// A story as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub parent_story_id: Option<DbId>,
    pub prompt: String,
    pub state: Option<StoryState>,
    pub attempt: i32,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text: Option<String>,
    pub image_prompt: Option<String>,
    pub image: Option<StoredImage>,
    /// Public URL of the narration.
    pub audio: Option<String>,
    pub duration: Option<f64>,
    /// `duration` as `m:ss`.
    pub duration_label: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub is_public: bool,
    pub is_daily_story: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StoryView {
    pub fn new(story: Story, config: &ServerConfig) -> Self {
        let state = story.state();
        let image = story.image().cloned();
        Self {
            id: story.id,
            user_id: story.user_id,
            parent_story_id: story.parent_story_id,
            prompt: story.prompt,
            state,
            attempt: story.attempt,
            title: story.title,
            summary: story.summary,
            text: story.text,
            image_prompt: story.image_prompt,
            image,
            audio: story.audio.map(|path| config.public_file_url(&path)),
            duration: story.duration,
            duration_label: story.duration.map(format_duration),
            completed_at: story.completed_at,
            is_public: story.is_public,
            is_daily_story: story.is_daily_story,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

/// Body of `GET /stories/{id}/related`.
///
/// `related_stories` keeps one slot per ranked match; a match whose story
/// could not be loaded serializes as `null`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedStoriesResponse {
    pub story: StoryView,
    pub related_stories: Vec<Option<StoryView>>,
}

/// Body of `PUT /stories/{id}/duration`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationResponse {
    pub id: DbId,
    pub duration: f64,
    pub duration_label: String,
}

/// Body of `POST /admin/embeddings/reindex`.
#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub indexed: usize,
}

//! Story entity model and DTOs.

use bedtime_core::story::{StoredImage, StoryState, FIRST_ATTEMPT};
use bedtime_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Story {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub parent_story_id: Option<DbId>,
    pub prompt: String,
    pub state_id: i16,
    pub attempt: i32,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text: Option<String>,
    pub image_prompt: Option<String>,
    pub image: Option<Json<StoredImage>>,
    pub audio: Option<String>,
    pub duration: Option<f64>,
    pub completed_at: Option<Timestamp>,
    pub is_public: bool,
    pub is_daily_story: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Story {
    /// Build an unsaved row in its initial state. Stores assign `id`.
    pub fn new(id: DbId, input: &CreateStory, now: Timestamp) -> Self {
        Self {
            id,
            user_id: input.user_id,
            parent_story_id: input.parent_story_id,
            prompt: input.prompt.clone(),
            state_id: StoryState::Created.id(),
            attempt: FIRST_ATTEMPT,
            title: None,
            summary: None,
            text: None,
            image_prompt: None,
            image: None,
            audio: None,
            duration: None,
            completed_at: None,
            is_public: input.is_public,
            is_daily_story: input.is_daily_story,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lifecycle state, or `None` if `state_id` is not a known state.
    pub fn state(&self) -> Option<StoryState> {
        StoryState::from_id(self.state_id)
    }

    /// The stored cover image, if generated.
    pub fn image(&self) -> Option<&StoredImage> {
        self.image.as_ref().map(|json| &json.0)
    }
}

/// DTO for creating a new story. New stories always start `created` at
/// attempt 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStory {
    pub user_id: Option<DbId>,
    pub prompt: String,
    pub parent_story_id: Option<DbId>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_daily_story: bool,
}

/// Partial update of a story. Only `Some` fields are written; every other
/// column keeps its current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryPatch {
    pub state: Option<StoryState>,
    pub attempt: Option<i32>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text: Option<String>,
    pub image_prompt: Option<String>,
    pub image: Option<StoredImage>,
    pub audio: Option<String>,
    pub duration: Option<f64>,
    pub completed_at: Option<Timestamp>,
    pub is_public: Option<bool>,
}

impl StoryPatch {
    /// A patch that only moves the story to `state`.
    pub fn state(state: StoryState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// A patch that only sets the attempt counter.
    pub fn attempt(attempt: i32) -> Self {
        Self {
            attempt: Some(attempt),
            ..Self::default()
        }
    }

    /// A patch that only records playback duration.
    pub fn duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Whether applying this patch sets the story text.
    pub fn sets_text(&self) -> bool {
        self.text.is_some()
    }

    /// Apply the patch in place, stamping `updated_at` with `now`.
    ///
    /// Mirrors the `COALESCE` semantics of the SQL update so in-memory and
    /// Postgres stores behave the same.
    pub fn apply_to(&self, story: &mut Story, now: Timestamp) {
        if let Some(state) = self.state {
            story.state_id = state.id();
        }
        if let Some(attempt) = self.attempt {
            story.attempt = attempt;
        }
        if let Some(title) = &self.title {
            story.title = Some(title.clone());
        }
        if let Some(summary) = &self.summary {
            story.summary = Some(summary.clone());
        }
        if let Some(text) = &self.text {
            story.text = Some(text.clone());
        }
        if let Some(image_prompt) = &self.image_prompt {
            story.image_prompt = Some(image_prompt.clone());
        }
        if let Some(image) = &self.image {
            story.image = Some(Json(image.clone()));
        }
        if let Some(audio) = &self.audio {
            story.audio = Some(audio.clone());
        }
        if let Some(duration) = self.duration {
            story.duration = Some(duration);
        }
        if let Some(completed_at) = self.completed_at {
            story.completed_at = Some(completed_at);
        }
        if let Some(is_public) = self.is_public {
            story.is_public = is_public;
        }
        story.updated_at = now;
    }
}

/// Filters for listing stories. Empty/`None` filters match everything.
#[derive(Debug, Clone, Default)]
pub struct StoryQuery {
    /// Restrict to these states.
    pub states: Vec<StoryState>,
    pub is_public: Option<bool>,
    pub is_daily_story: Option<bool>,
    pub user_id: Option<DbId>,
    /// Order by `created_at` descending instead of ascending.
    pub newest_first: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl StoryQuery {
    /// Whether `story` passes every filter (ignores ordering and paging).
    pub fn matches(&self, story: &Story) -> bool {
        (self.states.is_empty() || self.states.iter().any(|s| s.id() == story.state_id))
            && self.is_public.map_or(true, |v| story.is_public == v)
            && self.is_daily_story.map_or(true, |v| story.is_daily_story == v)
            && self.user_id.map_or(true, |v| story.user_id == Some(v))
    }
}

//! The story generation state machine.
//!
//! Each hook runs an explicit loop under the story's lock: read the
//! persisted record, run the step for its state, write one patch, repeat
//! until the story is `ready` or `failed`. Every step derives its input from
//! the record it just read.

use std::sync::Arc;

use bedtime_ai::{AudioGenerator, GenerationError, ImageGenerator, StoryRequest, TextGenerator};
use bedtime_core::story::{decide_retry, RetryDecision, StoryState};
use bedtime_core::types::DbId;
use bedtime_db::models::story::{Story, StoryPatch};
use bedtime_db::StoryStore;
use chrono::Utc;
use tokio_util::task::TaskTracker;

use crate::context;
use crate::error::PipelineError;
use crate::locks::StoryLocks;
use crate::similarity::SimilarityService;

/// The content generators a pipeline calls.
#[derive(Clone)]
pub struct Generators {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub audio: Arc<dyn AudioGenerator>,
}

pub struct StoryPipeline {
    store: Arc<dyn StoryStore>,
    generators: Generators,
    similarity: Option<Arc<SimilarityService>>,
    locks: StoryLocks,
    tasks: TaskTracker,
}

/// Patch persisted after a failed stage.
fn retry_patch(story: &Story, state: StoryState, error: &PipelineError) -> StoryPatch {
    match decide_retry(story.attempt) {
        RetryDecision::GiveUp => {
            tracing::error!(
                story_id = story.id,
                state = %state,
                error = %error,
                "Error processing story, giving up",
            );
            StoryPatch::state(StoryState::Failed)
        }
        RetryDecision::Retry { next_attempt } => {
            tracing::warn!(
                story_id = story.id,
                state = %state,
                attempt = story.attempt,
                error = %error,
                "Error processing story, retrying",
            );
            StoryPatch::attempt(next_attempt)
        }
    }
}

impl StoryPipeline {
    pub fn new(store: Arc<dyn StoryStore>, generators: Generators) -> Self {
        Self {
            store,
            generators,
            similarity: None,
            locks: StoryLocks::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Upsert an embedding whenever a step sets story text.
    pub fn with_similarity(mut self, similarity: Arc<SimilarityService>) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// Hook for a newly created story: move it out of `created`, then drive
    /// it to a terminal state.
    pub async fn after_create(&self, id: DbId) -> Result<StoryState, PipelineError> {
        let _guard = self.locks.acquire(id).await;

        let story = self.load(id).await?;
        let state = Self::state_of(&story)?;
        if state == StoryState::Created {
            if let Some(next) = state.next() {
                self.store.update(id, &StoryPatch::state(next)).await?;
            }
        }

        self.drive_locked(id).await
    }

    /// Hook for a changed story. Terminal stories are left untouched.
    pub async fn after_update(&self, id: DbId) -> Result<StoryState, PipelineError> {
        let _guard = self.locks.acquire(id).await;
        self.drive_locked(id).await
    }

    /// Run [`after_create`](Self::after_create) on a tracked background task.
    pub fn spawn_after_create(self: &Arc<Self>, id: DbId) {
        let pipeline = Arc::clone(self);
        self.tasks.spawn(async move {
            if let Err(e) = pipeline.after_create(id).await {
                tracing::error!(story_id = id, error = %e, "Story pipeline aborted");
            }
        });
    }

    /// Run [`after_update`](Self::after_update) on a tracked background task.
    pub fn spawn_after_update(self: &Arc<Self>, id: DbId) {
        let pipeline = Arc::clone(self);
        self.tasks.spawn(async move {
            if let Err(e) = pipeline.after_update(id).await {
                tracing::error!(story_id = id, error = %e, "Story pipeline aborted");
            }
        });
    }

    /// Stop accepting background work and wait for running drivers.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    // ---- private helpers ----

    async fn load(&self, id: DbId) -> Result<Story, PipelineError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| bedtime_db::StoreError::NotFound { entity: "Story", id }.into())
    }

    fn state_of(story: &Story) -> Result<StoryState, PipelineError> {
        story.state().ok_or(PipelineError::UnknownState {
            id: story.id,
            state_id: story.state_id,
        })
    }

    async fn drive_locked(&self, id: DbId) -> Result<StoryState, PipelineError> {
        loop {
            let story = self.load(id).await?;
            let state = Self::state_of(&story)?;
            if state.is_terminal() {
                return Ok(state);
            }

            let patch = self.step(&story, state).await;
            let updated = self.store.update(id, &patch).await?;
            tracing::debug!(
                story_id = id,
                from = %state,
                to = %updated.state().map_or("unknown", StoryState::as_str),
                attempt = updated.attempt,
                "Story step persisted",
            );

            if patch.sets_text() {
                self.index(&updated).await;
            }
        }
    }

    /// Compute the single patch for one step from `story` in `state`.
    ///
    /// Any failure inside a stage becomes a retry patch.
    async fn step(&self, story: &Story, state: StoryState) -> StoryPatch {
        let outcome = match state {
            StoryState::GeneratingStory => self.generate_story(story).await,
            StoryState::GeneratingMedia => {
                self.generate_media(story).await.map_err(PipelineError::from)
            }
            other => {
                return other
                    .next()
                    .map_or_else(StoryPatch::default, StoryPatch::state);
            }
        };
        outcome.unwrap_or_else(|e| retry_patch(story, state, &e))
    }

    /// Remix chain lookups are part of the stage, so a store failure there
    /// is retried like a generation failure.
    async fn generate_story(&self, story: &Story) -> Result<StoryPatch, PipelineError> {
        let remix = context::resolve(self.store.as_ref(), story).await?;
        let request = StoryRequest {
            story_id: story.id,
            prompt: story.prompt.clone(),
            context: remix.context,
            seed: remix.seed,
            user: story.user_id.map(|id| id.to_string()),
        };

        let generated = self.generators.text.generate_story(&request).await?;
        Ok(StoryPatch {
            state: StoryState::GeneratingStory.next(),
            title: Some(generated.title),
            summary: Some(generated.summary),
            text: Some(generated.story),
            image_prompt: Some(generated.image_prompt),
            ..StoryPatch::default()
        })
    }

    /// Both calls always run to completion; the stage succeeds only if both
    /// do.
    async fn generate_media(&self, story: &Story) -> Result<StoryPatch, GenerationError> {
        let (image, audio) = futures::future::join(
            self.generators
                .image
                .generate_image(story.id, story.image_prompt.as_deref()),
            self.generators
                .audio
                .generate_audio(story.id, story.text.as_deref()),
        )
        .await;

        Ok(StoryPatch {
            state: StoryState::GeneratingMedia.next(),
            image: Some(image?),
            audio: Some(audio?),
            completed_at: Some(Utc::now()),
            ..StoryPatch::default()
        })
    }

    async fn index(&self, story: &Story) {
        let Some(similarity) = &self.similarity else {
            return;
        };
        if let Err(e) = similarity.index_story(story).await {
            tracing::warn!(story_id = story.id, error = %e, "Failed to index story embedding");
        }
    }
}

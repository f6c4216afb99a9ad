//! Collaborator traits for story content generation.
//!
//! Each trait has one job. Implementations must fail with a
//! [`GenerationError`] rather than return placeholder content.

use async_trait::async_trait;
use bedtime_core::story::StoredImage;
use bedtime_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// A previous story used as a few-shot example when remixing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryContext {
    pub prompt: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub image_prompt: Option<String>,
    pub text: Option<String>,
}

/// Input for one text generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryRequest {
    pub story_id: DbId,
    pub prompt: String,
    /// The parent story when this story is a remix.
    pub context: Option<StoryContext>,
    /// Determinism seed; equal for every story in a remix chain.
    pub seed: i64,
    /// Opaque end-user identifier forwarded to the provider.
    pub user: Option<String>,
}

/// The structured reply of the text generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedStory {
    pub title: String,
    pub story: String,
    pub summary: String,
    pub image_prompt: String,
}

/// Writes the story text, title, summary, and cover image prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_story(&self, request: &StoryRequest)
        -> Result<GeneratedStory, GenerationError>;
}

/// Renders and stores a cover image for an image prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Fails with [`GenerationError::MissingInput`] when `image_prompt` is `None`.
    async fn generate_image(
        &self,
        story_id: DbId,
        image_prompt: Option<&str>,
    ) -> Result<StoredImage, GenerationError>;
}

/// Synthesizes and stores a narration, returning its storage path.
#[async_trait]
pub trait AudioGenerator: Send + Sync {
    /// Fails with [`GenerationError::MissingInput`] when `text` is `None`.
    async fn generate_audio(
        &self,
        story_id: DbId,
        text: Option<&str>,
    ) -> Result<String, GenerationError>;
}

/// Computes a semantic embedding for story text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError>;
}

//! Shared harness for API integration tests.
//!
//! Builds the production router over an in-memory store, an in-memory vector
//! index, and stub generators, so no database or provider is needed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use bedtime_ai::{
    AudioGenerator, Embedder, GeneratedStory, GenerationError, ImageGenerator, MemoryVectorIndex,
    StoryRequest, TextGenerator,
};
use bedtime_core::story::{StoredImage, StoryState};
use bedtime_core::types::DbId;
use bedtime_db::models::story::{CreateStory, Story};
use bedtime_db::MemoryStoryStore;
use bedtime_pipeline::{Generators, SimilarityService, StoryPipeline};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use bedtime_api::config::ServerConfig;
use bedtime_api::router::build_app_router;
use bedtime_api::state::AppState;

pub const NAMESPACE: &str = "bedtime-ai-dev";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        app_env: "test".to_string(),
        public_file_base_url: "/files".to_string(),
        daily_story_user_email: None,
    }
}

// ---------------------------------------------------------------------------
// Stub collaborators
// ---------------------------------------------------------------------------

pub struct StubGenerator;

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate_story(&self, request: &StoryRequest) -> Result<GeneratedStory, GenerationError> {
        Ok(GeneratedStory {
            title: "The Quiet Harbor".to_string(),
            story: format!("A story about {}.", request.prompt),
            summary: "Boats settle in for the night.".to_string(),
            image_prompt: "boats under the moon".to_string(),
        })
    }
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate_image(
        &self,
        story_id: DbId,
        image_prompt: Option<&str>,
    ) -> Result<StoredImage, GenerationError> {
        image_prompt.ok_or(GenerationError::MissingInput("image_prompt"))?;
        Ok(StoredImage {
            path: format!("covers/{story_id}.png"),
            width: 1792,
            height: 1024,
            format: "png".to_string(),
        })
    }
}

#[async_trait]
impl AudioGenerator for StubGenerator {
    async fn generate_audio(
        &self,
        story_id: DbId,
        text: Option<&str>,
    ) -> Result<String, GenerationError> {
        text.ok_or(GenerationError::MissingInput("text"))?;
        Ok(format!("{story_id}.mp3"))
    }
}

/// Embeds known texts to fixed vectors; anything else to a constant.
#[derive(Default)]
pub struct TableEmbedder {
    pub vectors: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
    }
}

// ---------------------------------------------------------------------------
// Test app
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStoryStore>,
    pub index: Arc<MemoryVectorIndex>,
    pub pipeline: Arc<StoryPipeline>,
    pub similarity: Arc<SimilarityService>,
}

/// Build the full application with the production middleware stack.
pub fn build_test_app(embedder: TableEmbedder) -> TestApp {
    let store = Arc::new(MemoryStoryStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let generator = Arc::new(StubGenerator);

    let similarity = Arc::new(SimilarityService::new(
        store.clone(),
        Arc::new(embedder),
        index.clone(),
        NAMESPACE,
    ));
    let pipeline = Arc::new(
        StoryPipeline::new(
            store.clone(),
            Generators {
                text: generator.clone(),
                image: generator.clone(),
                audio: generator,
            },
        )
        .with_similarity(similarity.clone()),
    );

    let config = test_config();
    let state = AppState {
        store: store.clone(),
        pipeline: pipeline.clone(),
        similarity: similarity.clone(),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        index,
        pipeline,
        similarity,
    }
}

/// A ready story with `text`, created `minutes_ago` minutes ago.
pub fn ready_story(id: DbId, text: &str, is_public: bool, minutes_ago: i64) -> Story {
    let mut story = Story::new(
        id,
        &CreateStory {
            prompt: format!("prompt {id}"),
            is_public,
            ..Default::default()
        },
        Utc::now() - Duration::minutes(minutes_ago),
    );
    story.state_id = StoryState::Ready.id();
    story.title = Some(format!("Story {id}"));
    story.text = Some(text.to_string());
    story.audio = Some(format!("{id}.mp3"));
    story.completed_at = Some(story.created_at);
    story
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    app.router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn send_json(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_empty(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(response.status(), status, "unexpected status");
}

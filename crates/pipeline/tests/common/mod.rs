//! Scripted collaborators and fixtures for pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bedtime_ai::{
    AudioGenerator, Embedder, GeneratedStory, GenerationError, ImageGenerator, StoryRequest,
    TextGenerator,
};
use bedtime_core::story::StoredImage;
use bedtime_core::types::DbId;
use bedtime_db::models::story::{CreateStory, Story, StoryPatch, StoryQuery};
use bedtime_db::models::user::User;
use bedtime_db::{MemoryStoryStore, StoreError, StoryStore};
use bedtime_pipeline::{Generators, StoryPipeline};

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// What a scripted collaborator does on one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// Transport-style failure.
    Fail,
    /// A reply that arrived but did not match the expected shape.
    Malformed,
}

/// A queue of outcomes; calls beyond the script succeed.
#[derive(Default)]
pub struct Script {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
}

impl Script {
    pub fn new(outcomes: &[Outcome]) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Ok)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn failure(outcome: Outcome) -> GenerationError {
    match outcome {
        Outcome::Malformed => GenerationError::MalformedOutput("expected an object".to_string()),
        _ => GenerationError::Api {
            status: 503,
            body: "upstream unavailable".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Fake generators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeText {
    pub script: Script,
    pub requests: Mutex<Vec<StoryRequest>>,
}

impl FakeText {
    pub fn scripted(outcomes: &[Outcome]) -> Self {
        Self {
            script: Script::new(outcomes),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<StoryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate_story(&self, request: &StoryRequest) -> Result<GeneratedStory, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script.next() {
            Outcome::Ok => Ok(GeneratedStory {
                title: format!("Title for {}", request.prompt),
                story: format!("Once upon a time, {}.", request.prompt),
                summary: "A gentle tale.".to_string(),
                image_prompt: format!("a drawing of {}", request.prompt),
            }),
            other => Err(failure(other)),
        }
    }
}

#[derive(Default)]
pub struct FakeImage {
    pub script: Script,
}

impl FakeImage {
    pub fn scripted(outcomes: &[Outcome]) -> Self {
        Self {
            script: Script::new(outcomes),
        }
    }
}

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn generate_image(
        &self,
        story_id: DbId,
        image_prompt: Option<&str>,
    ) -> Result<StoredImage, GenerationError> {
        let outcome = self.script.next();
        image_prompt.ok_or(GenerationError::MissingInput("image_prompt"))?;
        match outcome {
            Outcome::Ok => Ok(StoredImage {
                path: format!("covers/{story_id}.png"),
                width: 1792,
                height: 1024,
                format: "png".to_string(),
            }),
            other => Err(failure(other)),
        }
    }
}

#[derive(Default)]
pub struct FakeAudio {
    pub script: Script,
}

impl FakeAudio {
    pub fn scripted(outcomes: &[Outcome]) -> Self {
        Self {
            script: Script::new(outcomes),
        }
    }
}

#[async_trait]
impl AudioGenerator for FakeAudio {
    async fn generate_audio(
        &self,
        story_id: DbId,
        text: Option<&str>,
    ) -> Result<String, GenerationError> {
        let outcome = self.script.next();
        text.ok_or(GenerationError::MissingInput("text"))?;
        match outcome {
            Outcome::Ok => Ok(format!("{story_id}.mp3")),
            other => Err(failure(other)),
        }
    }
}

/// Maps known texts to fixed vectors; unknown texts embed to a constant.
#[derive(Default)]
pub struct FakeEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn with(pairs: &[(&str, [f32; 3])]) -> Self {
        Self {
            vectors: Mutex::new(
                pairs
                    .iter()
                    .map(|(text, v)| (text.to_string(), v.to_vec()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerationError::EmptyResponse("embeddings"));
        }
        Ok(self
            .vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![1.0, 1.0, 1.0]))
    }
}

// ---------------------------------------------------------------------------
// Flaky store
// ---------------------------------------------------------------------------

/// Wraps a memory store; reads of `failing_id` time out for the first
/// `failures` calls.
pub struct FlakyStore {
    pub inner: Arc<MemoryStoryStore>,
    failing_id: DbId,
    failures: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStoryStore>, failing_id: DbId, failures: usize) -> Self {
        Self {
            inner,
            failing_id,
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl StoryStore for FlakyStore {
    async fn create(&self, input: &CreateStory) -> Result<Story, StoreError> {
        self.inner.create(input).await
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Story>, StoreError> {
        if id == self.failing_id
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> Result<Vec<Story>, StoreError> {
        self.inner.find_by_ids(ids).await
    }

    async fn update(&self, id: DbId, patch: &StoryPatch) -> Result<Story, StoreError> {
        self.inner.update(id, patch).await
    }

    async fn list(&self, query: &StoryQuery) -> Result<Vec<Story>, StoreError> {
        self.inner.list(query).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_email(email).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryStoryStore>,
    pub text: Arc<FakeText>,
    pub image: Arc<FakeImage>,
    pub audio: Arc<FakeAudio>,
    pub pipeline: Arc<StoryPipeline>,
}

impl Harness {
    pub fn new(text: FakeText, image: FakeImage, audio: FakeAudio) -> Self {
        Self::build(text, image, audio, |pipeline| pipeline)
    }

    pub fn build(
        text: FakeText,
        image: FakeImage,
        audio: FakeAudio,
        configure: impl FnOnce(StoryPipeline) -> StoryPipeline,
    ) -> Self {
        Self::with_store(Arc::new(MemoryStoryStore::new()), text, image, audio, configure)
    }

    pub fn with_store(
        store: Arc<MemoryStoryStore>,
        text: FakeText,
        image: FakeImage,
        audio: FakeAudio,
        configure: impl FnOnce(StoryPipeline) -> StoryPipeline,
    ) -> Self {
        let text = Arc::new(text);
        let image = Arc::new(image);
        let audio = Arc::new(audio);
        let generators = Generators {
            text: text.clone(),
            image: image.clone(),
            audio: audio.clone(),
        };
        let pipeline = Arc::new(configure(StoryPipeline::new(store.clone(), generators)));
        Self {
            store,
            text,
            image,
            audio,
            pipeline,
        }
    }

    pub fn happy() -> Self {
        Self::new(FakeText::default(), FakeImage::default(), FakeAudio::default())
    }
}

//! OpenAI REST client implementing the story collaborators.
//!
//! One client covers chat completions (story text), image generation,
//! speech synthesis, and embeddings. Generated media is persisted through an
//! [`AssetWriter`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bedtime_core::similarity::EMBEDDING_DIMENSIONS;
use bedtime_core::story::StoredImage;
use bedtime_core::types::DbId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::assets::AssetWriter;
use crate::error::GenerationError;
use crate::generation::{
    AudioGenerator, Embedder, GeneratedStory, ImageGenerator, StoryRequest, TextGenerator,
};
use crate::prompts::story_messages;
use crate::structured::{decode_story, story_schema};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const STORY_MODEL: &str = "gpt-4o";
const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1792x1024";
const SPEECH_MODEL: &str = "tts-1";
const SPEECH_VOICE: &str = "nova";
const EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Prefix keeping cover art in a consistent illustrated style.
const IMAGE_STYLE: &str = "In a vibrant, colorful, cinematic illustration style: ";

/// Story, image, and speech calls routinely take tens of seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Connection settings for the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// HTTP client for the OpenAI API.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
    assets: Arc<dyn AssetWriter>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageGeneration {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingList {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

fn chat_body(request: &StoryRequest) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": STORY_MODEL,
        "messages": story_messages(request),
        "seed": request.seed,
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": "story",
                "strict": true,
                "schema": story_schema(),
            },
        },
    });
    if let Some(user) = &request.user {
        body["user"] = serde_json::Value::String(user.clone());
    }
    body
}

fn image_body(image_prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "model": IMAGE_MODEL,
        "prompt": format!("{IMAGE_STYLE}{image_prompt}"),
        "size": IMAGE_SIZE,
        "n": 1,
    })
}

fn speech_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "model": SPEECH_MODEL,
        "voice": SPEECH_VOICE,
        "input": text,
    })
}

fn embedding_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "model": EMBEDDING_MODEL,
        "input": text,
        "dimensions": EMBEDDING_DIMENSIONS,
    })
}

/// Storage path for a story's narration.
pub fn audio_file_name(story_id: DbId) -> String {
    format!("{story_id}.mp3")
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig, assets: Arc<dyn AssetWriter>) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, config, assets))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        config: OpenAiConfig,
        assets: Arc<dyn AssetWriter>,
    ) -> Self {
        Self {
            client,
            config,
            assets,
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(format!("{}{path}", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;
        Self::ensure_success(response).await
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GenerationError> {
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_story(&self, request: &StoryRequest) -> Result<GeneratedStory, GenerationError> {
        let response = self.post("/chat/completions", &chat_body(request)).await?;
        let completion: ChatCompletion = Self::parse_response(response).await?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse("chat completion"))?
            .message;
        if let Some(refusal) = reply.refusal {
            return Err(GenerationError::MalformedOutput(format!("model refused: {refusal}")));
        }
        decode_story(reply.content.as_deref())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(
        &self,
        story_id: DbId,
        image_prompt: Option<&str>,
    ) -> Result<StoredImage, GenerationError> {
        let image_prompt = image_prompt.ok_or(GenerationError::MissingInput("image_prompt"))?;

        let response = self.post("/images/generations", &image_body(image_prompt)).await?;
        let generation: ImageGeneration = Self::parse_response(response).await?;
        let url = generation
            .data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or(GenerationError::EmptyResponse("image generation"))?;

        let download = Self::ensure_success(self.client.get(&url).send().await?).await?;
        let bytes = download.bytes().await?;
        if bytes.is_empty() {
            return Err(GenerationError::EmptyResponse("image download"));
        }

        let name = format!("covers/{story_id}-{}", uuid::Uuid::new_v4());
        let stored = self.assets.write_image(&name, &bytes).await?;
        tracing::info!(story_id, path = %stored.path, "Cover image stored");
        Ok(stored)
    }
}

#[async_trait]
impl AudioGenerator for OpenAiClient {
    async fn generate_audio(
        &self,
        story_id: DbId,
        text: Option<&str>,
    ) -> Result<String, GenerationError> {
        let text = text.ok_or(GenerationError::MissingInput("text"))?;

        let response = self.post("/audio/speech", &speech_body(text)).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(GenerationError::EmptyResponse("speech"));
        }

        let path = self.assets.write_file(&audio_file_name(story_id), &bytes).await?;
        tracing::info!(story_id, path = %path, "Narration stored");
        Ok(path)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        let response = self.post("/embeddings", &embedding_body(text)).await?;
        let list: EmbeddingList = Self::parse_response(response).await?;
        list.data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(GenerationError::EmptyResponse("embeddings"))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::assets::LocalAssetWriter;
    use crate::generation::StoryContext;

    fn client() -> OpenAiClient {
        OpenAiClient::new(
            OpenAiConfig {
                api_key: "test-key".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
            },
            Arc::new(LocalAssetWriter::new(std::env::temp_dir())),
        )
        .unwrap()
    }

    fn request() -> StoryRequest {
        StoryRequest {
            story_id: 3,
            prompt: "a fox who counts stars".to_string(),
            context: None,
            seed: 1_700_000_000_000,
            user: Some("42".to_string()),
        }
    }

    #[test]
    fn chat_body_carries_seed_schema_and_user() {
        let body = chat_body(&request());
        assert_eq!(body["model"], STORY_MODEL);
        assert_eq!(body["seed"], 1_700_000_000_000_i64);
        assert_eq!(body["user"], "42");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn chat_body_without_user_omits_field() {
        let mut req = request();
        req.user = None;
        req.context = Some(StoryContext {
            prompt: "a fox".to_string(),
            title: None,
            summary: None,
            image_prompt: None,
            text: None,
        });
        let body = chat_body(&req);
        assert!(body.get("user").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn image_body_prefixes_style() {
        let body = image_body("a fox on a hill");
        assert_eq!(body["size"], IMAGE_SIZE);
        assert!(body["prompt"].as_str().unwrap().ends_with("a fox on a hill"));
    }

    #[test]
    fn embedding_body_requests_fixed_dimensions() {
        assert_eq!(embedding_body("x")["dimensions"], EMBEDDING_DIMENSIONS);
        assert_eq!(speech_body("x")["voice"], SPEECH_VOICE);
    }

    #[test]
    fn audio_is_named_after_story() {
        assert_eq!(audio_file_name(12), "12.mp3");
    }

    #[tokio::test]
    async fn image_without_prompt_fails_before_any_request() {
        let result = client().generate_image(1, None).await;
        assert_matches!(result, Err(GenerationError::MissingInput("image_prompt")));
    }

    #[tokio::test]
    async fn audio_without_text_fails_before_any_request() {
        let result = client().generate_audio(1, None).await;
        assert_matches!(result, Err(GenerationError::MissingInput("text")));
    }
}

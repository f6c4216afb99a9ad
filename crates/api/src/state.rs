use std::sync::Arc;

use bedtime_db::StoryStore;
use bedtime_pipeline::{SimilarityService, StoryPipeline};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Story and user storage.
    pub store: Arc<dyn StoryStore>,
    /// Drives stories through generation.
    pub pipeline: Arc<StoryPipeline>,
    /// Embedding upsert and related-story lookup.
    pub similarity: Arc<SimilarityService>,
    pub config: Arc<ServerConfig>,
}

//! Story embeddings and nearest-neighbour lookup.

use std::sync::Arc;

use bedtime_ai::{
    Embedder, GenerationError, VectorIndex, VectorMatch, VectorMetadata, VectorRecord,
    VisibilityFilter,
};
use bedtime_core::similarity::{exclude_self, is_neighbour, place_by_rank, SIMILAR_STORIES_TOP_K};
use bedtime_db::models::story::Story;
use bedtime_db::StoryStore;

use crate::error::PipelineError;

/// Embeds story text into a vector index and answers "more like this".
pub struct SimilarityService {
    store: Arc<dyn StoryStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
}

fn metadata(story: &Story) -> VectorMetadata {
    VectorMetadata {
        is_public: story.is_public,
        user_id: story.user_id,
    }
}

impl SimilarityService {
    pub fn new(
        store: Arc<dyn StoryStore>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn record_for(&self, story: &Story) -> Result<VectorRecord, PipelineError> {
        let text = story
            .text
            .as_deref()
            .ok_or(GenerationError::MissingInput("text"))?;
        let values = self.embedder.embed(text).await?;
        Ok(VectorRecord::for_story(story.id, values, metadata(story)))
    }

    /// Compute and upsert the embedding of one story.
    ///
    /// Fails with `MissingInput` when the story has no text yet.
    pub async fn index_story(&self, story: &Story) -> Result<(), PipelineError> {
        let record = self.record_for(story).await?;
        self.index.upsert(&self.namespace, vec![record]).await?;
        tracing::debug!(story_id = story.id, namespace = %self.namespace, "Story embedding upserted");
        Ok(())
    }

    /// Embed every story that has text and upsert them together.
    ///
    /// Returns the number of stories indexed; stories without text are
    /// skipped.
    pub async fn index_stories(&self, stories: &[Story]) -> Result<usize, PipelineError> {
        let mut records = Vec::with_capacity(stories.len());
        for story in stories.iter().filter(|s| s.text.is_some()) {
            records.push(self.record_for(story).await?);
        }
        let count = records.len();
        if count > 0 {
            self.index.upsert(&self.namespace, records).await?;
        }
        tracing::info!(count, skipped = stories.len() - count, namespace = %self.namespace, "Story embeddings upserted");
        Ok(count)
    }

    /// Up to [`SIMILAR_STORIES_TOP_K`] stories similar to `story`, best
    /// first, visible to the story's owner.
    ///
    /// Matches scoring below `MIN_SIMILARITY_SCORE` are dropped. A match
    /// whose record no longer exists leaves `None` in its slot. A story
    /// without text has no neighbours.
    pub async fn find_similar(&self, story: &Story) -> Result<Vec<Option<Story>>, PipelineError> {
        let Some(text) = story.text.as_deref() else {
            return Ok(Vec::new());
        };

        let vector = self.embedder.embed(text).await?;
        let filter = VisibilityFilter {
            owner_id: story.user_id,
        };
        let matches = self
            .index
            .query(&self.namespace, &vector, &filter, SIMILAR_STORIES_TOP_K)
            .await?;

        let ranked = matches
            .iter()
            .filter(|m| is_neighbour(m.score))
            .filter_map(VectorMatch::story_id);
        let ids = exclude_self(ranked, story.id);
        let records = self.store.find_by_ids(&ids).await?;
        Ok(place_by_rank(&ids, records, |s| s.id))
    }
}

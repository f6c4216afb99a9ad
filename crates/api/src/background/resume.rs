//! Resume stories left mid-generation by a previous process.

use std::sync::Arc;

use bedtime_core::story::StoryState;
use bedtime_db::models::story::StoryQuery;
use bedtime_db::{StoreError, StoryStore};
use bedtime_pipeline::StoryPipeline;

/// Stories picked up per listing call.
const PAGE_SIZE: i64 = 100;

/// Spawn a driver for every story in a non-terminal state.
///
/// Returns the number of stories resumed.
pub async fn resume_pending(
    store: &dyn StoryStore,
    pipeline: &Arc<StoryPipeline>,
) -> Result<usize, StoreError> {
    // Collect every page before spawning; drivers move stories out of the
    // filtered set and would shift the offsets.
    let mut pending = Vec::new();
    loop {
        let page = store
            .list(&StoryQuery {
                states: vec![
                    StoryState::Created,
                    StoryState::GeneratingStory,
                    StoryState::GeneratingMedia,
                ],
                limit: Some(PAGE_SIZE),
                offset: Some(pending.len() as i64),
                ..Default::default()
            })
            .await?;
        let last_page = (page.len() as i64) < PAGE_SIZE;
        pending.extend(page);
        if last_page {
            break;
        }
    }

    for story in &pending {
        tracing::info!(
            story_id = story.id,
            state_id = story.state_id,
            attempt = story.attempt,
            "Resuming story",
        );
        pipeline.spawn_after_update(story.id);
    }

    if !pending.is_empty() {
        tracing::info!(resumed = pending.len(), "Resumed unfinished stories");
    }
    Ok(pending.len())
}

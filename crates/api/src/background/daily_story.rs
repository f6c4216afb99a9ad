//! Daily public story, created every day at 21:15 UTC.
//!
//! The prompt carries the text of the most recent daily stories so the new
//! one avoids repeating their characters and themes.

use std::sync::Arc;

use bedtime_core::schedule::{daily_story_prompt, until_next_daily_run, DAILY_STORY_HISTORY};
use bedtime_db::models::story::{CreateStory, Story, StoryQuery};
use bedtime_db::{StoreError, StoryStore};
use bedtime_pipeline::StoryPipeline;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// Create today's daily story for the user with `owner_email`.
///
/// Returns `Ok(None)` when the user does not exist.
pub async fn create_daily_story(
    store: &dyn StoryStore,
    pipeline: &Arc<StoryPipeline>,
    owner_email: &str,
) -> Result<Option<Story>, StoreError> {
    let Some(owner) = store.find_user_by_email(owner_email).await? else {
        tracing::warn!(email = %owner_email, "Daily story owner not found, skipping");
        return Ok(None);
    };

    let recent = store
        .list(&StoryQuery {
            is_daily_story: Some(true),
            is_public: Some(true),
            newest_first: true,
            limit: Some(DAILY_STORY_HISTORY),
            ..Default::default()
        })
        .await?;
    let history: Vec<String> = recent.into_iter().filter_map(|s| s.text).collect();

    let story = store
        .create(&CreateStory {
            user_id: Some(owner.id),
            prompt: daily_story_prompt(&history),
            parent_story_id: None,
            is_public: true,
            is_daily_story: true,
        })
        .await?;

    tracing::info!(story_id = story.id, history = history.len(), "Daily story created");
    pipeline.spawn_after_create(story.id);
    Ok(Some(story))
}

/// Sleep until each daily run and create the story. Runs until `cancel` is
/// triggered.
pub async fn run(
    store: Arc<dyn StoryStore>,
    pipeline: Arc<StoryPipeline>,
    owner_email: String,
    cancel: CancellationToken,
) {
    tracing::info!(email = %owner_email, "Daily story job started");

    loop {
        let wait = until_next_daily_run(Utc::now());
        tracing::debug!(wait_secs = wait.as_secs(), "Waiting for next daily story");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Daily story job stopping");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = create_daily_story(store.as_ref(), &pipeline, &owner_email).await {
                    tracing::error!(error = %e, "Daily story creation failed");
                }
            }
        }
    }
}

//! Remix ancestry: few-shot context and the determinism seed.

use std::collections::HashSet;

use bedtime_ai::StoryContext;
use bedtime_core::story::seed_from_timestamp;
use bedtime_db::models::story::Story;
use bedtime_db::{StoreError, StoryStore};

/// Inputs derived from a story's remix chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RemixContext {
    /// Creation time (epoch ms) of the earliest resolvable ancestor.
    pub seed: i64,
    /// The immediate parent, replayed as a prior exchange.
    pub context: Option<StoryContext>,
}

fn context_of(parent: &Story) -> StoryContext {
    StoryContext {
        prompt: parent.prompt.clone(),
        title: parent.title.clone(),
        summary: parent.summary.clone(),
        image_prompt: parent.image_prompt.clone(),
        text: parent.text.clone(),
    }
}

/// Resolve the remix context for `story`.
///
/// Walks `parent_story_id` links to the earliest ancestor that still exists.
/// A missing immediate parent yields no context and the story's own seed.
/// Cycles stop the walk at the last unvisited ancestor.
pub async fn resolve(store: &dyn StoryStore, story: &Story) -> Result<RemixContext, StoreError> {
    let Some(parent_id) = story.parent_story_id else {
        return Ok(RemixContext {
            seed: seed_from_timestamp(story.created_at),
            context: None,
        });
    };

    let Some(parent) = store.find_by_id(parent_id).await? else {
        tracing::warn!(story_id = story.id, parent_story_id = parent_id, "Remix parent not found");
        return Ok(RemixContext {
            seed: seed_from_timestamp(story.created_at),
            context: None,
        });
    };

    let context = context_of(&parent);
    let mut visited = HashSet::from([story.id, parent.id]);
    let mut root = parent;
    while let Some(ancestor_id) = root.parent_story_id {
        if !visited.insert(ancestor_id) {
            tracing::warn!(story_id = story.id, ancestor_id, "Remix chain contains a cycle");
            break;
        }
        match store.find_by_id(ancestor_id).await? {
            Some(ancestor) => root = ancestor,
            None => break,
        }
    }

    Ok(RemixContext {
        seed: seed_from_timestamp(root.created_at),
        context: Some(context),
    })
}

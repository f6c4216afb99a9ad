//! In-memory [`StoryStore`] with the same merge semantics as Postgres.
//!
//! Every successful `update` is also appended to a patch log so callers can
//! assert exactly which writes happened (and that none happened).

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bedtime_core::types::DbId;
use chrono::Utc;

use crate::error::StoreError;
use crate::models::story::{CreateStory, Story, StoryPatch, StoryQuery};
use crate::models::user::{CreateUser, User};
use crate::store::StoryStore;

/// Mirrors the listing cap in `StoryRepo::list`.
const MAX_LIMIT: i64 = 100;

#[derive(Default)]
struct Inner {
    stories: BTreeMap<DbId, Story>,
    users: BTreeMap<DbId, User>,
    patches: Vec<(DbId, StoryPatch)>,
    next_story_id: DbId,
    next_user_id: DbId,
}

/// A process-local story store.
#[derive(Default)]
pub struct MemoryStoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a fully-formed story, replacing any story with the same id.
    ///
    /// Lets callers seed records with arbitrary state, timestamps, or
    /// content without going through the lifecycle.
    pub fn insert_story(&self, story: Story) {
        let mut inner = self.lock();
        inner.next_story_id = inner.next_story_id.max(story.id);
        inner.stories.insert(story.id, story);
    }

    /// Insert a new user and return it.
    pub fn insert_user(&self, input: &CreateUser) -> User {
        let mut inner = self.lock();
        inner.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_user_id,
            email: input.email.clone(),
            display_name: input.display_name.clone(),
            is_admin: input.is_admin,
            is_banned: false,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        user
    }

    /// Snapshot of a story by id.
    pub fn story(&self, id: DbId) -> Option<Story> {
        self.lock().stories.get(&id).cloned()
    }

    /// Every patch applied to story `id`, oldest first.
    pub fn patches_for(&self, id: DbId) -> Vec<StoryPatch> {
        self.lock()
            .patches
            .iter()
            .filter(|(story_id, _)| *story_id == id)
            .map(|(_, patch)| patch.clone())
            .collect()
    }

    /// Total number of successful updates across all stories.
    pub fn update_count(&self) -> usize {
        self.lock().patches.len()
    }
}

#[async_trait]
impl StoryStore for MemoryStoryStore {
    async fn create(&self, input: &CreateStory) -> Result<Story, StoreError> {
        let mut inner = self.lock();
        inner.next_story_id += 1;
        let story = Story::new(inner.next_story_id, input, Utc::now());
        inner.stories.insert(story.id, story.clone());
        Ok(story)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Story>, StoreError> {
        Ok(self.story(id))
    }

    async fn find_by_ids(&self, ids: &[DbId]) -> Result<Vec<Story>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .stories
            .values()
            .filter(|story| ids.contains(&story.id))
            .cloned()
            .collect())
    }

    async fn update(&self, id: DbId, patch: &StoryPatch) -> Result<Story, StoreError> {
        let mut inner = self.lock();
        let story = inner.stories.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "Story",
            id,
        })?;
        patch.apply_to(story, Utc::now());
        let updated = story.clone();
        inner.patches.push((id, patch.clone()));
        Ok(updated)
    }

    async fn list(&self, query: &StoryQuery) -> Result<Vec<Story>, StoreError> {
        let inner = self.lock();
        let mut stories: Vec<Story> = inner
            .stories
            .values()
            .filter(|story| query.matches(story))
            .cloned()
            .collect();

        stories.sort_by_key(|s| (s.created_at, s.id));
        if query.newest_first {
            stories.reverse();
        }

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.unwrap_or(MAX_LIMIT).clamp(1, MAX_LIMIT) as usize;
        Ok(stories.into_iter().skip(offset).take(limit).collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

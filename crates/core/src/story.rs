//! Story lifecycle state machine, retry policy, and remix seed derivation.
//!
//! This module lives in `core` (zero internal deps) so the pipeline driver,
//! the repository layer, and the API can all share one definition of the
//! lifecycle. The `StoryState` discriminants match the seeded rows in the
//! `story_states` lookup table.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Attempt number a freshly created story starts at.
pub const FIRST_ATTEMPT: i32 = 1;

/// Attempt ceiling shared by both generation stages. The error raised on
/// this attempt marks the story as failed.
pub const MAX_ATTEMPTS: i32 = 3;

/// Maximum accepted prompt length in characters.
pub const MAX_PROMPT_LENGTH: usize = 4000;

// ---------------------------------------------------------------------------
// StoryState
// ---------------------------------------------------------------------------

/// Lifecycle state of a story.
///
/// Serialized as the snake_case name (`"generating_story"`), stored as the
/// SMALLINT id.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    Created = 1,
    GeneratingStory = 2,
    GeneratingMedia = 3,
    Ready = 4,
    Failed = 5,
}

impl StoryState {
    /// Every state, in lifecycle order.
    pub const ALL: [StoryState; 5] = [
        Self::Created,
        Self::GeneratingStory,
        Self::GeneratingMedia,
        Self::Ready,
        Self::Failed,
    ];

    /// Resolve a database state ID to the corresponding variant.
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Created),
            2 => Some(Self::GeneratingStory),
            3 => Some(Self::GeneratingMedia),
            4 => Some(Self::Ready),
            5 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Return the database state ID.
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Name matching the `name` column in `story_states`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::GeneratingStory => "generating_story",
            Self::GeneratingMedia => "generating_media",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// `ready` and `failed` are the only terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// The state a successful step advances to.
    ///
    /// | current            | next               |
    /// |--------------------|--------------------|
    /// | `created`          | `generating_story` |
    /// | `generating_story` | `generating_media` |
    /// | `generating_media` | `ready`            |
    /// | `ready` / `failed` | none (terminal)    |
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::GeneratingStory),
            Self::GeneratingStory => Some(Self::GeneratingMedia),
            Self::GeneratingMedia => Some(Self::Ready),
            Self::Ready | Self::Failed => None,
        }
    }
}

impl std::fmt::Display for StoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoryState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown story state '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// What to persist after a generation stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep the state and bump the attempt counter to `next_attempt`.
    Retry { next_attempt: i32 },
    /// The ceiling was reached; mark the story as failed.
    GiveUp,
}

/// Decide how to react to a failure on `attempt`.
///
/// The counter is shared across stages, so a story that failed once while
/// generating text and once while generating media gives up on its third
/// error regardless of which stage raised it.
pub fn decide_retry(attempt: i32) -> RetryDecision {
    if attempt >= MAX_ATTEMPTS {
        RetryDecision::GiveUp
    } else {
        RetryDecision::Retry {
            next_attempt: attempt + 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Remix seed
// ---------------------------------------------------------------------------

/// Determinism seed for text generation: the creation time of the story
/// that anchors a remix chain, in epoch milliseconds.
pub fn seed_from_timestamp(created_at: Timestamp) -> i64 {
    created_at.timestamp_millis()
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// A cover image written to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// Storage-relative path of the image file.
    pub path: String,
    pub width: u32,
    pub height: u32,
    /// Lowercase format name, e.g. `"png"`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a user-supplied prompt: non-blank and at most
/// [`MAX_PROMPT_LENGTH`] characters.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be empty".to_string()));
    }
    let len = prompt.chars().count();
    if len > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "prompt must be at most {MAX_PROMPT_LENGTH} characters, got {len}"
        )));
    }
    Ok(())
}

/// Validate a reported playback duration in seconds.
pub fn validate_duration(duration: f64) -> Result<(), CoreError> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(CoreError::Validation(format!(
            "duration must be a non-negative number of seconds, got {duration}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Decoding of the model's structured story reply.
//!
//! Kept separate from transport so a reply that arrives intact but does not
//! match the schema surfaces as [`GenerationError::MalformedOutput`].

use crate::error::GenerationError;
use crate::generation::GeneratedStory;

/// JSON schema sent as the `response_format` of story requests.
pub fn story_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "story": { "type": "string" },
            "summary": { "type": "string" },
            "image_prompt": { "type": "string" }
        },
        "required": ["title", "story", "summary", "image_prompt"],
        "additionalProperties": false
    })
}

/// Decode a raw message body into a [`GeneratedStory`].
///
/// Fails when the content is absent, is not JSON of the expected shape, or
/// has a blank `story` or `title`.
pub fn decode_story(content: Option<&str>) -> Result<GeneratedStory, GenerationError> {
    let raw = content
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(GenerationError::EmptyResponse("chat completion"))?;

    let story: GeneratedStory = serde_json::from_str(raw)
        .map_err(|e| GenerationError::MalformedOutput(format!("{e}: {raw}")))?;

    if story.story.trim().is_empty() {
        return Err(GenerationError::MalformedOutput(
            "story text is blank".to_string(),
        ));
    }
    if story.title.trim().is_empty() {
        return Err(GenerationError::MalformedOutput("title is blank".to_string()));
    }

    Ok(story)
}

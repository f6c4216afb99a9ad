//! Chat message assembly for story generation.

use serde::Serialize;

use crate::generation::{StoryContext, StoryRequest};

/// Instructions sent as the system message of every story request.
pub const STORYTELLER_INSTRUCTIONS: &str = "\
You write calm, uplifting bedtime stories for parents to read to their \
children. For each topic, reply with a story of 500 to 750 words that has a \
relatable main character and is suitable for all ages, written in the \
language of the topic when possible. Also reply with a title under 100 \
characters without surrounding punctuation, a one or two sentence summary \
that does not give away the ending, and a prompt for a simple, child-friendly \
cartoon cover illustration of the story.";

/// Assistant turn that opens every conversation.
pub const OPENING_QUESTION: &str = "What is the topic of tonight's bedtime story?";

/// One chat completion message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// The assistant reply a parent story would have produced, in the same
/// JSON shape the model is asked to return.
fn context_reply(context: &StoryContext) -> String {
    serde_json::json!({
        "title": context.title,
        "summary": context.summary,
        "image_prompt": context.image_prompt,
        "story": context.text,
    })
    .to_string()
}

/// Build the full message list for a story request.
///
/// A remix replays the parent's prompt and reply as a prior exchange before
/// the new prompt.
pub fn story_messages(request: &StoryRequest) -> Vec<ChatMessage> {
    let mut messages = vec![
        ChatMessage::system(STORYTELLER_INSTRUCTIONS),
        ChatMessage::assistant(OPENING_QUESTION),
    ];
    if let Some(context) = &request.context {
        messages.push(ChatMessage::user(context.prompt.clone()));
        messages.push(ChatMessage::assistant(context_reply(context)));
    }
    messages.push(ChatMessage::user(request.prompt.clone()));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(context: Option<StoryContext>) -> StoryRequest {
        StoryRequest {
            story_id: 7,
            prompt: "a whale who sings lullabies".to_string(),
            context,
            seed: 1,
            user: None,
        }
    }

    #[test]
    fn plain_request_has_three_messages() {
        let messages = story_messages(&request(None));
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "assistant", "user"]);
        assert_eq!(messages[2].content, "a whale who sings lullabies");
    }

    #[test]
    fn remix_replays_parent_exchange() {
        let context = StoryContext {
            prompt: "a whale".to_string(),
            title: Some("Deep Song".to_string()),
            summary: Some("A whale sings.".to_string()),
            image_prompt: Some("a smiling whale".to_string()),
            text: Some("Once upon a tide...".to_string()),
        };
        let messages = story_messages(&request(Some(context)));
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "assistant", "user", "assistant", "user"]);
        assert_eq!(messages[2].content, "a whale");

        let reply: serde_json::Value = serde_json::from_str(&messages[3].content).unwrap();
        assert_eq!(reply["title"], "Deep Song");
        assert_eq!(reply["story"], "Once upon a tide...");
        assert_eq!(messages[4].content, "a whale who sings lullabies");
    }
}

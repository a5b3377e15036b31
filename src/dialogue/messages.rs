use crate::error::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};

/// Closing-tag artifact some assistants append to their last text item
pub const CLOSE_TAG: &str = "<close></close>";

/// Separator placed between consecutive text items of one reply
pub const SEGMENT_SEPARATOR: &str = ". ";

/// Response to a session-creation call
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Message sent within a dialogue session
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    pub input: MessageInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageInput {
    pub text: String,
}

impl MessageRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            input: MessageInput { text: text.into() },
        }
    }
}

/// Structured reply to a message
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub output: Option<MessageOutput>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessageOutput {
    #[serde(default)]
    pub generic: Option<Vec<GenericItem>>,
}

/// One response item (`text`, `option`, `pause`, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericItem {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl GenericItem {
    pub fn text_item(text: impl Into<String>) -> Self {
        Self {
            response_type: Some("text".to_string()),
            text: Some(text.into()),
        }
    }
}

impl MessageResponse {
    /// Build a response holding the given items
    pub fn with_items(items: Vec<GenericItem>) -> Self {
        Self {
            output: Some(MessageOutput {
                generic: Some(items),
            }),
        }
    }

    /// Join every text item into the single string to speak
    ///
    /// No text items yields an empty string. A missing `output.generic`
    /// array is a malformed response.
    pub fn reply_text(&self) -> AgentResult<String> {
        let items = self
            .output
            .as_ref()
            .and_then(|output| output.generic.as_ref())
            .ok_or_else(|| {
                AgentError::MalformedResponse("response has no output.generic array".to_string())
            })?;

        let segments: Vec<&str> = items
            .iter()
            .filter(|item| item.response_type.as_deref() == Some("text"))
            .filter_map(|item| item.text.as_deref())
            .collect();

        Ok(segments
            .join(SEGMENT_SEPARATOR)
            .replace(CLOSE_TAG, "")
            .trim()
            .to_string())
    }
}

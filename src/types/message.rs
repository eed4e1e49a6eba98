//! Chat messages, discriminated on `role`

use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use super::content::Content;
use super::tool::ToolCall;
use crate::error::ClientError;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SystemMessage {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserMessage {
    #[serde(default)]
    pub content: Option<Content>,
}

/// A model answer, or a streamed delta of one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<Content>,
    /// Marks the message as a prefix the model must continue from.
    #[serde(default)]
    pub prefix: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantMessage {
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_prefix(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }

    /// Text of the message, empty when there is none.
    pub fn text(&self) -> String {
        self.content.as_ref().map(Content::text).unwrap_or_default()
    }

    /// Decode the message text as JSON.
    ///
    /// Only meaningful when the request asked for a JSON object or a JSON
    /// schema response format.
    pub fn output<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let text = self.text();
        if text.is_empty() {
            return Err(ClientError::InvalidContent(
                "unmarshalling impossible, the message content is empty".to_string(),
            ));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolMessage {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tool_call_id: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Serialize for SystemMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SystemMessage", 2)?;
        state.serialize_field("role", &Role::System)?;
        state.serialize_field("content", &self.content)?;
        state.end()
    }
}

impl Serialize for UserMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UserMessage", 2)?;
        state.serialize_field("role", &Role::User)?;
        state.serialize_field("content", &self.content)?;
        state.end()
    }
}

impl Serialize for AssistantMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AssistantMessage", 4)?;
        state.serialize_field("role", &Role::Assistant)?;
        state.serialize_field("content", &self.content)?;
        if self.prefix {
            state.serialize_field("prefix", &true)?;
        } else {
            state.skip_field("prefix")?;
        }
        if self.tool_calls.is_empty() {
            state.skip_field("tool_calls")?;
        } else {
            state.serialize_field("tool_calls", &self.tool_calls)?;
        }
        state.end()
    }
}

impl Serialize for ToolMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ToolMessage", 4)?;
        state.serialize_field("role", &Role::Tool)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("tool_call_id", &self.tool_call_id)?;
        state.end()
    }
}

/// Any message of a conversation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System(SystemMessage),
    User(UserMessage),
    Assistant(AssistantMessage),
    Tool(ToolMessage),
}

impl Serialize for ChatMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::System(m) => m.serialize(serializer),
            Self::User(m) => m.serialize(serializer),
            Self::Assistant(m) => m.serialize(serializer),
            Self::Tool(m) => m.serialize(serializer),
        }
    }
}

impl ChatMessage {
    pub fn system(content: impl Into<Content>) -> Self {
        Self::System(SystemMessage {
            content: Some(content.into()),
        })
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::User(UserMessage {
            content: Some(content.into()),
        })
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::Assistant(AssistantMessage::new(content))
    }

    /// The answer to a tool call.
    pub fn tool(
        name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<Content>,
    ) -> Self {
        Self::Tool(ToolMessage {
            content: Some(content.into()),
            name: name.into(),
            tool_call_id: tool_call_id.into(),
        })
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System(_) => Role::System,
            Self::User(_) => Role::User,
            Self::Assistant(_) => Role::Assistant,
            Self::Tool(_) => Role::Tool,
        }
    }

    pub fn content(&self) -> Option<&Content> {
        match self {
            Self::System(m) => m.content.as_ref(),
            Self::User(m) => m.content.as_ref(),
            Self::Assistant(m) => m.content.as_ref(),
            Self::Tool(m) => m.content.as_ref(),
        }
    }
}

impl From<AssistantMessage> for ChatMessage {
    fn from(message: AssistantMessage) -> Self {
        Self::Assistant(message)
    }
}

impl From<ToolMessage> for ChatMessage {
    fn from(message: ToolMessage) -> Self {
        Self::Tool(message)
    }
}

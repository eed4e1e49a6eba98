//! Message content: a bare string or an ordered list of typed chunks
//!
//! Chunks are discriminated on the `type` field. Decoding dispatches on that
//! field once; every variant then goes through its own derived `Deserialize`.
//! Chunk types this crate does not know about are kept as raw JSON so a
//! message survives a decode/encode cycle unchanged.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Content of a chat message.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

impl Content {
    /// The textual part of the content.
    ///
    /// For chunked content the `text` chunks are concatenated in order; other
    /// chunk kinds contribute nothing.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Chunks(chunks) => chunks
                .iter()
                .filter_map(|chunk| match chunk {
                    ContentChunk::Text(t) => Some(t.text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Chunk view; empty for plain text content.
    pub fn chunks(&self) -> &[ContentChunk] {
        match self {
            Self::Text(_) => &[],
            Self::Chunks(chunks) => chunks,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Chunks(chunks) => chunks.is_empty(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<ContentChunk>> for Content {
    fn from(chunks: Vec<ContentChunk>) -> Self {
        Self::Chunks(chunks)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Chunks(chunks) => chunks.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(items) => items
                .into_iter()
                .map(decode::<ContentChunk, D::Error>)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Chunks),
            other => Err(de::Error::custom(format!(
                "invalid content type: expected string or array, got {}",
                kind_of(&other)
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrlChunk {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUrlChunk {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_name: String,
    pub document_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceChunk {
    #[serde(default)]
    pub reference_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunk {
    pub file_id: String,
}

/// Audio input: a public URL, a base64 payload, or the URL of a file uploaded
/// to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    pub input_audio: String,
}

/// The only chunk kinds allowed inside a thinking chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThinkingPart {
    Text(TextChunk),
    Reference(ReferenceChunk),
}

impl TryFrom<ContentChunk> for ThinkingPart {
    type Error = ClientError;

    fn try_from(chunk: ContentChunk) -> Result<Self, Self::Error> {
        match chunk {
            ContentChunk::Text(text) => Ok(Self::Text(text)),
            ContentChunk::Reference(reference) => Ok(Self::Reference(reference)),
            other => Err(ClientError::InvalidContent(format!(
                "only text and reference content can be added to a thinking content, got '{}'",
                other.chunk_type()
            ))),
        }
    }
}

/// Reasoning trace emitted by reasoning models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkChunk {
    #[serde(default = "closed_by_default")]
    pub closed: bool,
    #[serde(default)]
    pub thinking: Vec<ThinkingPart>,
}

fn closed_by_default() -> bool {
    true
}

impl ThinkChunk {
    pub fn new(thinking: impl IntoIterator<Item = ThinkingPart>) -> Self {
        Self {
            closed: true,
            thinking: thinking.into_iter().collect(),
        }
    }

    /// Build from general chunks, rejecting anything but text and references.
    pub fn from_chunks(
        chunks: impl IntoIterator<Item = ContentChunk>,
    ) -> Result<Self, ClientError> {
        let thinking = chunks
            .into_iter()
            .map(ThinkingPart::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(thinking))
    }
}

/// One element of chunked content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentChunk {
    Text(TextChunk),
    ImageUrl(ImageUrlChunk),
    DocumentUrl(DocumentUrlChunk),
    Reference(ReferenceChunk),
    File(FileChunk),
    Thinking(ThinkChunk),
    Audio(AudioChunk),
    /// A chunk whose `type` is not modelled here, kept verbatim.
    Unknown(Value),
}

impl ContentChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextChunk { text: text.into() })
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl(ImageUrlChunk {
            image_url: url.into(),
        })
    }

    pub fn document_url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::DocumentUrl(DocumentUrlChunk {
            document_name: name.into(),
            document_url: url.into(),
        })
    }

    pub fn reference(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::Reference(ReferenceChunk {
            reference_ids: ids.into_iter().collect(),
        })
    }

    pub fn file(file_id: impl Into<String>) -> Self {
        Self::File(FileChunk {
            file_id: file_id.into(),
        })
    }

    pub fn audio(input_audio: impl Into<String>) -> Self {
        Self::Audio(AudioChunk {
            input_audio: input_audio.into(),
        })
    }

    pub fn thinking(chunk: ThinkChunk) -> Self {
        Self::Thinking(chunk)
    }

    /// The wire discriminator of this chunk.
    pub fn chunk_type(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::ImageUrl(_) => "image_url",
            Self::DocumentUrl(_) => "document_url",
            Self::Reference(_) => "reference",
            Self::File(_) => "file",
            Self::Thinking(_) => "thinking",
            Self::Audio(_) => "input_audio",
            Self::Unknown(raw) => raw.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }
}

/// Borrowed, internally tagged view used for encoding known chunks.
#[derive(Serialize)]
#[serde(tag = "type")]
enum TaggedChunk<'a> {
    #[serde(rename = "text")]
    Text(&'a TextChunk),
    #[serde(rename = "image_url")]
    ImageUrl(&'a ImageUrlChunk),
    #[serde(rename = "document_url")]
    DocumentUrl(&'a DocumentUrlChunk),
    #[serde(rename = "reference")]
    Reference(&'a ReferenceChunk),
    #[serde(rename = "file")]
    File(&'a FileChunk),
    #[serde(rename = "thinking")]
    Thinking(&'a ThinkChunk),
    #[serde(rename = "input_audio")]
    Audio(&'a AudioChunk),
}

impl Serialize for ContentChunk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = match self {
            Self::Text(c) => TaggedChunk::Text(c),
            Self::ImageUrl(c) => TaggedChunk::ImageUrl(c),
            Self::DocumentUrl(c) => TaggedChunk::DocumentUrl(c),
            Self::Reference(c) => TaggedChunk::Reference(c),
            Self::File(c) => TaggedChunk::File(c),
            Self::Thinking(c) => TaggedChunk::Thinking(c),
            Self::Audio(c) => TaggedChunk::Audio(c),
            Self::Unknown(raw) => return raw.serialize(serializer),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentChunk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Err(de::Error::missing_field("type"));
        };

        Ok(match kind.as_str() {
            "text" => Self::Text(decode(value)?),
            "image_url" => Self::ImageUrl(decode(value)?),
            "document_url" => Self::DocumentUrl(decode(value)?),
            "reference" => Self::Reference(decode(value)?),
            "file" => Self::File(decode(value)?),
            "thinking" => Self::Thinking(decode(value)?),
            "input_audio" => Self::Audio(decode(value)?),
            _ => Self::Unknown(value),
        })
    }
}

fn decode<T: DeserializeOwned, E: de::Error>(value: Value) -> Result<T, E> {
    serde_json::from_value(value).map_err(E::custom)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Model catalogue types

use serde::{Deserialize, Serialize};

/// What a model can do. Also used as a filter by `search_models`, where a
/// `true` field means "required".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCapabilities {
    pub audio: bool,
    pub classification: bool,
    pub completion_chat: bool,
    pub completion_fim: bool,
    pub fine_tuning: bool,
    pub function_calling: bool,
    pub moderation: bool,
    pub ocr: bool,
    pub vision: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseModelCard {
    pub id: String,
    pub object: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub model_type: Option<String>,
    pub description: Option<String>,
    pub max_context_length: Option<u64>,
    pub owned_by: Option<String>,
    pub deprecation: Option<String>,
    pub default_model_temperature: Option<f64>,
    pub created: Option<i64>,
    pub aliases: Vec<String>,
    pub capabilities: ModelCapabilities,
}

impl BaseModelCard {
    /// True when the model has every capability set in `required`.
    pub fn matches(&self, required: &ModelCapabilities) -> bool {
        let have = &self.capabilities;
        (!required.completion_chat || have.completion_chat)
            && (!required.function_calling || have.function_calling)
            && (!required.vision || have.vision)
            && (!required.audio || have.audio)
            && (!required.classification || have.classification)
            && (!required.completion_fim || have.completion_fim)
            && (!required.fine_tuning || have.fine_tuning)
            && (!required.moderation || have.moderation)
            && (!required.ocr || have.ocr)
    }

    pub fn has_no_capabilities(&self) -> bool {
        self.capabilities == ModelCapabilities::default()
    }

    pub fn is_embedding(&self) -> bool {
        self.id.contains("embed")
    }
}

/// Body of `GET /v1/models`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub data: Vec<BaseModelCard>,
}

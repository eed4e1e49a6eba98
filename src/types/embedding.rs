//! Embedding types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::usage::UsageInfo;

pub type EmbeddingVector = Vec<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    Float,
    Base64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDtype {
    Float,
    Int8,
    Uint8,
    Binary,
    Ubinary,
}

/// Body of `POST /v1/embeddings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
    /// Only supported by some models; others answer with a 400.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dimension: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dtype: Option<OutputDtype>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<EncodingFormat>,
}

impl EmbeddingRequest {
    pub fn new(model: impl Into<String>, input: Vec<String>) -> Self {
        Self {
            model: model.into(),
            input,
            output_dimension: None,
            output_dtype: None,
            encoding_format: None,
        }
    }

    pub fn with_output_dimension(mut self, dimension: u32) -> Self {
        self.output_dimension = Some(dimension);
        self
    }

    pub fn with_output_dtype(mut self, dtype: OutputDtype) -> Self {
        self.output_dtype = Some(dtype);
        self
    }

    pub fn with_encoding_format(mut self, format: EncodingFormat) -> Self {
        self.encoding_format = Some(format);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub object: String,
    pub embedding: EmbeddingVector,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: UsageInfo,
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
    #[serde(skip)]
    pub latency: Duration,
}

impl EmbeddingResponse {
    /// Vectors in input order.
    pub fn embeddings(&self) -> Vec<EmbeddingVector> {
        self.data.iter().map(|d| d.embedding.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let request = EmbeddingRequest::new("mistral-embed", vec!["a".into(), "b".into()])
            .with_output_dtype(OutputDtype::Int8)
            .with_encoding_format(EncodingFormat::Float);

        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({
                "model": "mistral-embed",
                "input": ["a", "b"],
                "output_dtype": "int8",
                "encoding_format": "float"
            })
        );
    }

    #[test]
    fn embeddings_follow_data_order() {
        let response: EmbeddingResponse = serde_json::from_value(json!({
            "id": "e1",
            "object": "list",
            "model": "mistral-embed",
            "usage": {"prompt_tokens": 4, "completion_tokens": 0, "total_tokens": 4},
            "data": [
                {"object": "embedding", "embedding": [0.1, 0.2], "index": 0},
                {"object": "embedding", "embedding": [0.3, 0.4], "index": 1}
            ]
        }))
        .unwrap();

        assert_eq!(response.embeddings(), vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }
}

//! Tool calling and function definition types

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Tool definition for function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool type, always "function" today
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: Function,
}

impl Tool {
    /// Create a new function tool
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: PropertyDefinition,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: Function {
                name: name.into(),
                description: description.into(),
                strict: false,
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strict: bool,
    #[serde(default)]
    pub parameters: PropertyDefinition,
}

/// The subset of JSON schema used to describe tool parameters and structured
/// output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub additional_properties: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertyDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PropertyDefinition {
    /// Build from a loosely typed JSON schema.
    ///
    /// Unknown keys are ignored. A nested property given as a scalar instead of
    /// an object is read as its type name, so `{"age": "integer"}` works.
    pub fn from_value(schema: &Value) -> Self {
        let Some(obj) = schema.as_object() else {
            return Self::default();
        };

        let str_field = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let properties = obj
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, raw)| {
                        let def = if raw.is_object() {
                            Self::from_value(raw)
                        } else {
                            Self::of_type(scalar_name(raw))
                        };
                        (name.clone(), def)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            additional_properties: obj
                .get("additionalProperties")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            description: str_field("description"),
            property_type: str_field("type"),
            properties,
            required: obj
                .get("required")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|n| n.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            items: obj
                .get("items")
                .filter(|items| items.is_object())
                .map(|items| Box::new(Self::from_value(items))),
            default: obj.get("default").cloned(),
        }
    }

    pub fn of_type(property_type: impl Into<String>) -> Self {
        Self {
            property_type: property_type.into(),
            ..Self::default()
        }
    }

    /// An `object` schema with the given properties.
    pub fn object(properties: impl IntoIterator<Item = (String, PropertyDefinition)>) -> Self {
        Self {
            property_type: "object".to_string(),
            properties: properties.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_required(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required = names.into_iter().map(Into::into).collect();
        self
    }
}

fn scalar_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// How the model may use the provided tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    /// The model decides whether to call a tool.
    Auto,
    /// The model must call at least one tool.
    Any,
    /// The model must not call any tool.
    None,
    /// Same as `Any`.
    Required,
}

impl FromStr for ToolChoiceMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            other => Err(ClientError::InvalidRequest(format!(
                "invalid tool choice type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionName {
    pub name: String,
}

/// Forces a call to one specific function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionChoice {
    #[serde(rename = "type")]
    pub choice_type: String,
    pub function: FunctionName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Function(FunctionChoice),
}

impl ToolChoice {
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(FunctionChoice {
            choice_type: "function".to_string(),
            function: FunctionName { name: name.into() },
        })
    }
}

impl From<ToolChoiceMode> for ToolChoice {
    fn from(mode: ToolChoiceMode) -> Self {
        Self::Mode(mode)
    }
}

/// A tool call decided by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub index: u32,
    pub function: FunctionCall,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
}

fn function_type() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Build a call; arguments that are not a JSON object are wrapped as
    /// `{"input": <args>}`.
    pub fn new(id: impl Into<String>, index: u32, name: impl Into<String>, args: Value) -> Self {
        let arguments = match args {
            Value::Object(map) => JsonMap(map),
            other => {
                let mut map = Map::new();
                map.insert("input".to_string(), other);
                JsonMap(map)
            }
        };

        Self {
            id: id.into(),
            index,
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
            call_type: function_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: JsonMap,
}

/// A JSON object that may arrive either inline or encoded inside a string.
///
/// Function arguments come back as `"{\"city\":\"Paris\"}"` from some models
/// and as `{"city":"Paris"}` from others; both decode to the same map, and
/// `null` decodes to an empty one. Always encodes as an inline object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JsonMap(pub Map<String, Value>);

impl JsonMap {
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for JsonMap {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for JsonMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for JsonMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<'de> Deserialize<'de> for JsonMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
                Ok(Value::Object(map)) => Ok(Self(map)),
                Ok(Value::Null) => Ok(Self::default()),
                Ok(_) => Err(de::Error::custom(
                    "expected a JSON object encoded in the string",
                )),
                Err(err) => Err(de::Error::custom(err)),
            },
            _ => Err(de::Error::custom(
                "expected a JSON object or a string containing one",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arguments_decode_from_object_or_string() {
        let inline: FunctionCall =
            serde_json::from_value(json!({"name": "weather", "arguments": {"city": "Paris"}}))
                .unwrap();
        let encoded: FunctionCall = serde_json::from_value(
            json!({"name": "weather", "arguments": "{\"city\": \"Paris\"}"}),
        )
        .unwrap();
        let null: FunctionCall =
            serde_json::from_value(json!({"name": "weather", "arguments": null})).unwrap();

        assert_eq!(inline, encoded);
        assert_eq!(inline.arguments.get("city"), Some(&json!("Paris")));
        assert!(null.arguments.is_empty());
    }

    #[test]
    fn arguments_reject_non_object_strings() {
        let err = serde_json::from_value::<JsonMap>(json!("[1, 2]")).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn tool_call_wraps_scalar_arguments() {
        let call = ToolCall::new("call_1", 0, "echo", json!("hello"));
        assert_eq!(call.function.arguments.get("input"), Some(&json!("hello")));
        assert_eq!(call.call_type, "function");

        let call = ToolCall::new("call_2", 1, "sum", json!({"a": 1, "b": 2}));
        assert_eq!(call.function.arguments.len(), 2);
    }

    #[test]
    fn tool_choice_wire_format() {
        assert_eq!(
            serde_json::to_value(ToolChoice::from(ToolChoiceMode::Any)).unwrap(),
            json!("any")
        );
        assert_eq!(
            serde_json::to_value(ToolChoice::function("get_weather")).unwrap(),
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
        assert_eq!("REQUIRED".parse::<ToolChoiceMode>().unwrap(), ToolChoiceMode::Required);
        assert!("sometimes".parse::<ToolChoiceMode>().is_err());
    }

    #[test]
    fn property_definition_from_loose_schema() {
        let def = PropertyDefinition::from_value(&json!({
            "type": "object",
            "description": "A user object",
            "properties": {
                "name": {"type": "string", "description": "The user's name"},
                "age": {"type": "integer", "default": 18},
                "nickname": "string"
            },
            "required": ["name"]
        }));

        assert_eq!(def.property_type, "object");
        assert_eq!(def.properties["age"].default, Some(json!(18)));
        assert_eq!(def.properties["nickname"].property_type, "string");
        assert_eq!(def.required, vec!["name".to_string()]);

        let encoded = serde_json::to_value(Tool::function("create_user", "Create a user", def))
            .unwrap();
        assert_eq!(encoded["type"], "function");
        assert!(encoded["function"].get("strict").is_none());
        assert_eq!(
            encoded["function"]["parameters"]["properties"]["name"]["description"],
            "The user's name"
        );
    }
}

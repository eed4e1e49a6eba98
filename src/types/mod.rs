//! Request, response and message types for the La Plateforme API

pub mod chat;
pub mod chunk;
pub mod content;
pub mod embedding;
pub mod message;
pub mod models;
pub mod tool;
pub mod usage;

pub use chat::*;
pub use chunk::*;
pub use content::*;
pub use embedding::*;
pub use message::*;
pub use models::{BaseModelCard, ModelCapabilities};
pub use tool::*;
pub use usage::*;

//! Model listing capability trait

use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{BaseModelCard, ModelCapabilities};

#[async_trait]
pub trait ModelListingCapability: Send + Sync {
    async fn list_models(&self) -> Result<Vec<BaseModelCard>, ClientError>;

    /// Fails with [`ClientError::ModelNotFound`] when the id is unknown.
    async fn get_model(&self, model_id: &str) -> Result<BaseModelCard, ClientError>;

    /// Models having every capability set in `required`.
    async fn search_models(
        &self,
        required: &ModelCapabilities,
    ) -> Result<Vec<BaseModelCard>, ClientError> {
        let models = self.list_models().await?;
        Ok(models
            .into_iter()
            .filter(|model| model.matches(required))
            .collect())
    }

    async fn is_model_available(&self, model_id: &str) -> Result<bool, ClientError> {
        match self.get_model(model_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

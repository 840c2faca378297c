/// HTTP client abstraction for inference servers.
use crate::error::AppError;
use crate::models::{InferenceRequest, ModelSchema};
use std::time::Duration;

/// Operations the load generator needs from an inference server.
#[async_trait::async_trait]
pub trait InferenceClient: Send + Sync {
    /// Fetch the input schema of `model`.
    ///
    /// # Errors
    ///
    /// * `AppError::Http` if no response was received
    /// * `AppError::Status` if the server did not answer 200
    /// * `AppError::Json` if the body is not a model config
    async fn model_schema(&self, model: &str) -> Result<ModelSchema, AppError>;

    /// Submit one inference request for `model`.
    ///
    /// Resolves once the full response body has been read. The response
    /// content itself is not interpreted.
    async fn infer(&self, model: &str, request: &InferenceRequest) -> Result<(), AppError>;
}

/// One-shot schema fetch through `client`.
pub async fn fetch_schema<C>(client: &C, model: &str) -> Result<ModelSchema, AppError>
where
    C: InferenceClient + ?Sized,
{
    let schema = client.model_schema(model).await?;
    tracing::info!(
        model,
        max_batch_size = schema.max_batch_size,
        inputs = schema.inputs.len(),
        "fetched model schema"
    );
    Ok(schema)
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the server, or a base URL with scheme.
    pub authority: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Additional headers
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            ..Self::default()
        }
    }

    /// Base URL derived from the authority, without a trailing slash.
    pub fn base_url(&self) -> String {
        let authority = self.authority.trim_end_matches('/');
        if authority.contains("://") {
            authority.to_string()
        } else {
            format!("http://{}", authority)
        }
    }

    /// `GET` target for the model's config.
    pub fn config_url(&self, model: &str) -> String {
        format!("{}/v2/models/{}/config", self.base_url(), model)
    }

    /// `POST` target for inference.
    pub fn infer_url(&self, model: &str) -> String {
        format!("{}/v2/models/{}/infer", self.base_url(), model)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authority: "localhost:8000".to_string(),
            timeout: Duration::from_secs(60),
            headers: Vec::new(),
        }
    }
}

/// KServe v2 / Triton HTTP client.
use crate::error::AppError;
use crate::http::client::{ClientConfig, InferenceClient};
use crate::models::{InferenceRequest, ModelSchema};
use reqwest::{Client, RequestBuilder, Response, StatusCode};

/// Client for the Triton HTTP endpoint.
pub struct TritonClient {
    client: Client,
    config: ClientConfig,
}

impl TritonClient {
    /// Create a new Triton client.
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn with_headers(&self, mut req: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }
        req
    }

    /// Send the request and read the whole body, rejecting anything but 200.
    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, AppError> {
        let response = self
            .with_headers(req)
            .send()
            .await
            .map_err(|e| AppError::Http(format!("Request failed: {}", e)))?;

        read_ok_body(response).await
    }
}

async fn read_ok_body(response: Response) -> Result<Vec<u8>, AppError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| AppError::Http(format!("Failed to read response body: {}", e)))?;

    if status != StatusCode::OK {
        return Err(AppError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    Ok(body.to_vec())
}

fn require_model(model: &str) -> Result<(), AppError> {
    if model.trim().is_empty() {
        return Err(AppError::Config("Model name cannot be empty".to_string()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl InferenceClient for TritonClient {
    async fn model_schema(&self, model: &str) -> Result<ModelSchema, AppError> {
        require_model(model)?;

        let url = self.config.config_url(model);
        tracing::debug!(%url, "fetching model config");
        let body = self.send(self.client.get(&url)).await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn infer(&self, model: &str, request: &InferenceRequest) -> Result<(), AppError> {
        require_model(model)?;

        let url = self.config.infer_url(model);
        self.send(self.client.post(&url).json(request)).await?;
        Ok(())
    }
}

use crate::{
    config::ClientConfig,
    error::{PromptImgError, Result},
    generation::traits::{GenerationService, ServiceResponse},
    models::GenerateRequest,
};
use async_trait::async_trait;
use reqwest::Client;

#[derive(Clone)]
pub struct HttpGenerationService {
    client: Client,
    endpoint: String,
}

impl HttpGenerationService {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PromptImgError::Config(format!("Failed to build HTTP client: {}", e)))?;

        log::debug!("Generation endpoint: {}", endpoint);

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn submit(&self, request: &GenerateRequest) -> Result<ServiceResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        log::debug!(
            "Generation endpoint answered {} with {} bytes",
            status,
            body.len()
        );

        Ok(ServiceResponse { status, body })
    }
}

use crate::{error::Result, models::GenerateRequest};
use async_trait::async_trait;

/// Raw answer from the generation endpoint. Interpreting status and body is
/// left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ServiceResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Sends one generation request. Errors only on transport failure; any
    /// HTTP status comes back as a `ServiceResponse`.
    async fn submit(&self, request: &GenerateRequest) -> Result<ServiceResponse>;
}

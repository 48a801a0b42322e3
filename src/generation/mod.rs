pub mod http_client;
pub mod traits;

pub use http_client::HttpGenerationService;
pub use traits::{GenerationService, ServiceResponse};

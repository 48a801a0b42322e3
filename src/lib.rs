//! Prompt-to-image client.
//!
//! [`ImageGenerator`] holds one session's prompt, image, loading flag and
//! error, and turns each `generate_image` call into a single POST to the
//! generation endpoint:
//!
//! ```no_run
//! use promptimg::{ClientConfig, ImageGenerator, Outcome};
//!
//! #[tokio::main]
//! async fn main() -> promptimg::Result<()> {
//!     let generator = ImageGenerator::from_config(&ClientConfig::from_env())?;
//!     generator.set_prompt("A lighthouse on a cliff at dusk");
//!     if let Outcome::Generated(Some(image)) = generator.generate_image().await {
//!         println!("{}", image);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod logger;
pub mod models;

pub use config::{ClientConfig, OverlapPolicy};
pub use controller::{ImageGenerator, FAILED_TO_GENERATE, SOMETHING_WENT_WRONG};
pub use error::{PromptImgError, Result};
pub use generation::{GenerationService, HttpGenerationService, ServiceResponse};
pub use models::*;

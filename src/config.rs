use crate::error::{PromptImgError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_ENDPOINT_PATH: &str = "/api/generate";

/// What `generate_image` does when called while an exchange is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Return `Outcome::Busy` without touching state.
    #[default]
    Reject,
    /// Start another exchange; completions land in whatever order they arrive.
    Allow,
}

impl OverlapPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "reject" => Some(OverlapPolicy::Reject),
            "allow" => Some(OverlapPolicy::Allow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub endpoint_path: String,
    /// Transport-level timeout. The controller itself never times out.
    pub timeout: Option<Duration>,
    pub overlap: OverlapPolicy,
    pub save_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            timeout: None,
            overlap: OverlapPolicy::default(),
            save_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = env::var("PROMPTIMG_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(path) = env::var("PROMPTIMG_ENDPOINT_PATH") {
            config.endpoint_path = path;
        }
        config.timeout = env::var("PROMPTIMG_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        if let Ok(value) = env::var("PROMPTIMG_OVERLAP") {
            match OverlapPolicy::parse(&value) {
                Some(policy) => config.overlap = policy,
                None => log::warn!(
                    "Ignoring unknown PROMPTIMG_OVERLAP value '{}', using reject",
                    value
                ),
            }
        }
        config.save_dir = env::var("PROMPTIMG_SAVE_DIR").ok().map(PathBuf::from);

        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Full URL of the generation endpoint.
    pub fn endpoint_url(&self) -> Result<String> {
        let base = self.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(PromptImgError::Config("base URL is empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(PromptImgError::Config(format!(
                "base URL must be http(s): {}",
                base
            )));
        }

        let path = self.endpoint_path.trim();
        if path.is_empty() {
            return Err(PromptImgError::Config("endpoint path is empty".into()));
        }

        if path.starts_with('/') {
            Ok(format!("{}{}", base, path))
        } else {
            Ok(format!("{}/{}", base, path))
        }
    }
}

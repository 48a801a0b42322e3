use super::image::ImageRef;
use serde::Serialize;

/// The four fields a prompt-to-image view renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub prompt: String,
    pub image: Option<ImageRef>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Whether the generate trigger should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.loading && self.has_prompt()
    }

    pub fn status(&self) -> ViewStatus {
        if self.loading {
            ViewStatus::Loading
        } else if let Some(message) = &self.error {
            ViewStatus::Failed(message.clone())
        } else if let Some(image) = &self.image {
            ViewStatus::Ready(image.clone())
        } else {
            ViewStatus::Idle
        }
    }
}

/// Which of the view's states is showing. A stale image behind an error
/// still lives in `SessionState::image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Idle,
    Loading,
    Failed(String),
    Ready(ImageRef),
}

/// How a single `generate_image` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Blank prompt; nothing was sent.
    Skipped,
    /// Another exchange was in flight and overlap is rejected.
    Busy,
    /// The service answered 2xx. `None` when the body carried no `imageUrl`.
    Generated(Option<ImageRef>),
    /// The attempt failed; the message is what `error` now holds.
    Failed(String),
}

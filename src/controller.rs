use crate::{
    config::{ClientConfig, OverlapPolicy},
    error::{PromptImgError, Result},
    generation::{GenerationService, HttpGenerationService, ServiceResponse},
    logger,
    models::{
        ErrorBody, GenerateRequest, GeneratedBody, ImageRef, Outcome, SessionState, ViewStatus,
    },
};
use std::sync::Arc;
use tokio::sync::watch;

/// Shown when the service fails without saying why.
pub const FAILED_TO_GENERATE: &str = "Failed to generate image";
/// Shown when a failure carries no message at all.
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";

/// Owns one session's state and turns each prompt submission into a single
/// exchange with the generation service.
pub struct ImageGenerator {
    service: Arc<dyn GenerationService>,
    state: watch::Sender<SessionState>,
    overlap: OverlapPolicy,
}

enum Start {
    Skipped,
    Busy,
    Started(String),
}

/// Clears `loading` however the attempt ends, including when the future is dropped.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.loading = false);
    }
}

impl ImageGenerator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            service,
            state,
            overlap: OverlapPolicy::default(),
        }
    }

    /// Builds a generator talking HTTP to the endpoint named in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let service = HttpGenerationService::new(config)?;
        Ok(Self::new(Arc::new(service)).with_overlap(config.overlap))
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.state.send_if_modified(|state| {
            if state.prompt == prompt {
                return false;
            }
            state.prompt = prompt;
            true
        });
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn can_submit(&self) -> bool {
        self.state.borrow().can_submit()
    }

    pub fn status(&self) -> ViewStatus {
        self.state.borrow().status()
    }

    /// Submits the current prompt and records the result in session state.
    ///
    /// Never fails: every error ends up in `SessionState::error` and in the
    /// returned `Outcome::Failed`.
    pub async fn generate_image(&self) -> Outcome {
        let prompt = match self.begin_attempt() {
            Start::Skipped => return Outcome::Skipped,
            Start::Busy => {
                log::debug!("Generation already in flight, ignoring trigger");
                return Outcome::Busy;
            }
            Start::Started(prompt) => prompt,
        };

        let _loading = LoadingGuard { state: &self.state };
        let _timer = logger::timer("generate_image");

        log::debug!("Submitting prompt ({} chars)", prompt.chars().count());

        match self.exchange(&GenerateRequest::new(prompt)).await {
            Ok(image) => {
                match &image {
                    Some(image) => log::info!("Image generated: {}", preview(image.as_str())),
                    None => log::warn!("Generation succeeded but no imageUrl was returned"),
                }
                self.state.send_modify(|state| state.image = image.clone());
                Outcome::Generated(image)
            }
            Err(err) => {
                let message = failure_message(&err);
                match err.status() {
                    Some(status) => log::warn!("Generation rejected ({}): {}", status, message),
                    None => log::warn!("Generation failed: {}", message),
                }
                self.state
                    .send_modify(|state| state.error = Some(message.clone()));
                Outcome::Failed(message)
            }
        }
    }

    /// Flips into loading and clears the previous error, unless the attempt
    /// should not start at all.
    fn begin_attempt(&self) -> Start {
        let mut start = Start::Skipped;
        let overlap = self.overlap;

        self.state.send_if_modified(|state| {
            if !state.has_prompt() {
                return false;
            }
            if state.loading && overlap == OverlapPolicy::Reject {
                start = Start::Busy;
                return false;
            }
            state.loading = true;
            state.error = None;
            start = Start::Started(state.prompt.clone());
            true
        });

        start
    }

    async fn exchange(&self, request: &GenerateRequest) -> Result<Option<ImageRef>> {
        let response = self.service.submit(request).await?;
        interpret_response(response)
    }
}

fn interpret_response(response: ServiceResponse) -> Result<Option<ImageRef>> {
    if !response.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&response.body)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| FAILED_TO_GENERATE.to_string());

        return Err(PromptImgError::Service {
            status: response.status,
            message,
        });
    }

    let body: GeneratedBody = serde_json::from_slice(&response.body)?;
    Ok(body.image_url.map(ImageRef::from))
}

fn failure_message(err: &PromptImgError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        SOMETHING_WENT_WRONG.to_string()
    } else {
        message
    }
}

// data: URLs can run to megabytes
fn preview(reference: &str) -> String {
    const MAX: usize = 80;
    if reference.chars().count() <= MAX {
        reference.to_string()
    } else {
        let head: String = reference.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Replays canned answers in order and records what it was sent.
    struct ScriptedService {
        replies: Mutex<VecDeque<Result<ServiceResponse>>>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedService {
        fn new(replies: Vec<Result<ServiceResponse>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GenerateRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        async fn submit(&self, request: &GenerateRequest) -> Result<ServiceResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply left")
        }
    }

    /// Holds every request until a permit is released.
    struct GatedService {
        gate: Semaphore,
    }

    #[async_trait]
    impl GenerationService for GatedService {
        async fn submit(&self, _request: &GenerateRequest) -> Result<ServiceResponse> {
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            Ok(ServiceResponse::new(200, r#"{"imageUrl":"https://cdn.example.com/slow.png"}"#))
        }
    }

    fn ok_image(url: &str) -> Result<ServiceResponse> {
        Ok(ServiceResponse::new(
            200,
            serde_json::json!({ "imageUrl": url }).to_string(),
        ))
    }

    fn generator(service: Arc<ScriptedService>, prompt: &str) -> ImageGenerator {
        let generator = ImageGenerator::new(service);
        generator.set_prompt(prompt);
        generator
    }

    #[tokio::test]
    async fn test_blank_prompt_is_a_no_op() {
        for prompt in ["", "   ", "\n\t"] {
            let service = ScriptedService::new(vec![]);
            let generator = generator(service.clone(), prompt);
            let before = generator.snapshot();

            assert_eq!(generator.generate_image().await, Outcome::Skipped);
            assert!(service.requests().is_empty());
            assert_eq!(generator.snapshot(), before);
        }
    }

    #[tokio::test]
    async fn test_success_sets_image() {
        let service = ScriptedService::new(vec![ok_image("https://cdn.example.com/x.png")]);
        let generator = generator(service.clone(), "a red fox in snow");

        let outcome = generator.generate_image().await;

        let expected = ImageRef::from("https://cdn.example.com/x.png");
        assert_eq!(outcome, Outcome::Generated(Some(expected.clone())));

        let state = generator.snapshot();
        assert_eq!(state.image, Some(expected.clone()));
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(generator.status(), ViewStatus::Ready(expected));
        assert_eq!(
            service.requests(),
            vec![GenerateRequest::new("a red fox in snow")]
        );
    }

    #[tokio::test]
    async fn test_service_error_keeps_previous_image() {
        let service = ScriptedService::new(vec![
            ok_image("https://cdn.example.com/first.png"),
            Ok(ServiceResponse::new(400, r#"{"error":"bad prompt"}"#)),
        ]);
        let generator = generator(service, "first");
        generator.generate_image().await;

        generator.set_prompt("second");
        let outcome = generator.generate_image().await;

        assert_eq!(outcome, Outcome::Failed("bad prompt".into()));
        let state = generator.snapshot();
        assert_eq!(state.error.as_deref(), Some("bad prompt"));
        assert!(!state.loading);
        assert_eq!(
            state.image,
            Some(ImageRef::from("https://cdn.example.com/first.png"))
        );
        assert_eq!(generator.status(), ViewStatus::Failed("bad prompt".into()));
    }

    #[tokio::test]
    async fn test_service_error_without_message_uses_fallback() {
        let service = ScriptedService::new(vec![
            Ok(ServiceResponse::new(500, "")),
            Ok(ServiceResponse::new(502, "<html>Bad Gateway</html>")),
            Ok(ServiceResponse::new(422, r#"{"error":""}"#)),
            Ok(ServiceResponse::new(404, r#"{"detail":"missing"}"#)),
        ]);
        let generator = generator(service, "anything");

        for _ in 0..4 {
            generator.generate_image().await;
            let state = generator.snapshot();
            assert_eq!(state.error.as_deref(), Some(FAILED_TO_GENERATE));
            assert!(!state.loading);
        }
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_message() {
        let err = PromptImgError::Request("connection refused".into());
        let expected = err.to_string();
        let service = ScriptedService::new(vec![Err(err)]);
        let generator = generator(service, "a castle");

        let outcome = generator.generate_image().await;

        assert_eq!(outcome, Outcome::Failed(expected.clone()));
        let state = generator.snapshot();
        assert_eq!(state.error, Some(expected));
        assert!(!state.loading);
        assert_eq!(state.image, None);
    }

    #[tokio::test]
    async fn test_empty_failure_message_uses_generic_fallback() {
        let service = ScriptedService::new(vec![Err(PromptImgError::Request(String::new()))]);
        let generator = generator(service, "a castle");

        generator.generate_image().await;

        assert_eq!(
            generator.snapshot().error.as_deref(),
            Some(SOMETHING_WENT_WRONG)
        );
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_a_failure() {
        let service = ScriptedService::new(vec![Ok(ServiceResponse::new(200, "not json"))]);
        let generator = generator(service, "a castle");

        let outcome = generator.generate_image().await;

        let state = generator.snapshot();
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert!(state
            .error
            .as_deref()
            .unwrap()
            .starts_with("Serialization error"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_success_ignores_unrelated_error_field() {
        let service = ScriptedService::new(vec![Ok(ServiceResponse::new(
            200,
            r#"{"imageUrl":"https://cdn.example.com/1.png","error":false}"#,
        ))]);
        let generator = generator(service, "a castle");

        let outcome = generator.generate_image().await;

        let expected = ImageRef::from("https://cdn.example.com/1.png");
        assert_eq!(outcome, Outcome::Generated(Some(expected.clone())));
        let state = generator.snapshot();
        assert_eq!(state.image, Some(expected));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_service_error_ignores_unrelated_image_field() {
        let service = ScriptedService::new(vec![Ok(ServiceResponse::new(
            400,
            r#"{"error":"bad prompt","imageUrl":0}"#,
        ))]);
        let generator = generator(service, "a castle");

        let outcome = generator.generate_image().await;

        assert_eq!(outcome, Outcome::Failed("bad prompt".into()));
        assert_eq!(generator.snapshot().error.as_deref(), Some("bad prompt"));
    }

    #[tokio::test]
    async fn test_success_without_image_url_clears_image() {
        let service = ScriptedService::new(vec![
            ok_image("https://cdn.example.com/first.png"),
            Ok(ServiceResponse::new(200, "{}")),
        ]);
        let generator = generator(service, "a castle");

        generator.generate_image().await;
        let outcome = generator.generate_image().await;

        assert_eq!(outcome, Outcome::Generated(None));
        assert_eq!(generator.snapshot().image, None);
        assert_eq!(generator.status(), ViewStatus::Idle);
    }

    #[tokio::test]
    async fn test_sequential_attempts_converge() {
        let once = ScriptedService::new(vec![ok_image("https://cdn.example.com/x.png")]);
        let single = generator(once, "same prompt");
        single.generate_image().await;

        let twice = ScriptedService::new(vec![
            ok_image("https://cdn.example.com/x.png"),
            ok_image("https://cdn.example.com/x.png"),
        ]);
        let repeated = generator(twice, "same prompt");
        repeated.generate_image().await;
        repeated.generate_image().await;

        assert_eq!(single.snapshot(), repeated.snapshot());
    }

    #[tokio::test]
    async fn test_new_attempt_clears_error_at_start() {
        let service = Arc::new(GatedService {
            gate: Semaphore::new(0),
        });
        let generator = Arc::new(ImageGenerator::new(service.clone()));
        generator.set_prompt("retry me");
        generator
            .state
            .send_modify(|state| state.error = Some("earlier failure".into()));

        let mut rx = generator.subscribe();
        let task = tokio::spawn({
            let generator = generator.clone();
            async move { generator.generate_image().await }
        });

        let in_flight = rx.wait_for(|state| state.loading).await.unwrap().clone();
        assert_eq!(in_flight.error, None);
        assert!(!generator.can_submit());

        service.gate.add_permits(1);
        task.await.unwrap();
        assert!(generator.can_submit());
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_rejected() {
        let service = Arc::new(GatedService {
            gate: Semaphore::new(0),
        });
        let generator = Arc::new(ImageGenerator::new(service.clone()));
        generator.set_prompt("slow one");

        let mut rx = generator.subscribe();
        let first = tokio::spawn({
            let generator = generator.clone();
            async move { generator.generate_image().await }
        });
        rx.wait_for(|state| state.loading).await.unwrap();

        assert_eq!(generator.generate_image().await, Outcome::Busy);
        assert_eq!(generator.status(), ViewStatus::Loading);

        service.gate.add_permits(1);
        let outcome = first.await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Generated(Some(ImageRef::from("https://cdn.example.com/slow.png")))
        );
        assert!(!generator.snapshot().loading);
    }

    #[tokio::test]
    async fn test_overlapping_trigger_races_when_allowed() {
        let service = Arc::new(GatedService {
            gate: Semaphore::new(0),
        });
        let generator = Arc::new(
            ImageGenerator::new(service.clone()).with_overlap(OverlapPolicy::Allow),
        );
        generator.set_prompt("racing");

        let mut rx = generator.subscribe();
        let first = tokio::spawn({
            let generator = generator.clone();
            async move { generator.generate_image().await }
        });
        rx.wait_for(|state| state.loading).await.unwrap();

        let second = tokio::spawn({
            let generator = generator.clone();
            async move { generator.generate_image().await }
        });

        service.gate.add_permits(2);
        assert!(matches!(first.await.unwrap(), Outcome::Generated(Some(_))));
        assert!(matches!(second.await.unwrap(), Outcome::Generated(Some(_))));
        assert!(!generator.snapshot().loading);
    }

    #[tokio::test]
    async fn test_dropped_attempt_resets_loading() {
        let service = Arc::new(GatedService {
            gate: Semaphore::new(0),
        });
        let generator = ImageGenerator::new(service);
        generator.set_prompt("never answered");

        let result =
            tokio::time::timeout(Duration::from_millis(20), generator.generate_image()).await;

        assert!(result.is_err());
        let state = generator.snapshot();
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert!(generator.can_submit());
    }

    #[test]
    fn test_preview_truncates_long_references() {
        let short = "https://cdn.example.com/x.png";
        assert_eq!(preview(short), short);

        let long = format!("data:image/png;base64,{}", "A".repeat(500));
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), 83);
    }
}

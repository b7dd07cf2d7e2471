use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;

use super::aspect::Dimensions;
use super::outcome::{GenerationOutcome, GenerationResponse, PlaceholderReason};
use super::request::{GenerationPlan, GenerationRequest};
use crate::config::ProviderConfig;
use crate::providers::{ImageProvider, default_chain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("generation cancelled before a provider succeeded")]
pub struct Cancelled;

/// Runs provider adapters strictly in order and stops at the first image.
/// Attempts are sequential so paid providers are never billed twice for one
/// request.
pub struct ImageOrchestrator {
    providers: Vec<Arc<dyn ImageProvider>>,
    placeholder_base_url: String,
}

impl ImageOrchestrator {
    pub fn new(providers: Vec<Arc<dyn ImageProvider>>, placeholder_base_url: impl Into<String>) -> Self {
        Self {
            providers,
            placeholder_base_url: placeholder_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(default_chain(config), config.placeholder_base_url.clone())
    }

    pub fn providers(&self) -> &[Arc<dyn ImageProvider>] {
        &self.providers
    }

    pub fn placeholder_url(&self, dimensions: Dimensions, freshness: i64) -> String {
        format!(
            "{}/{}/{}?random={freshness}",
            self.placeholder_base_url, dimensions.width, dimensions.height
        )
    }

    /// Always yields a response for a valid request; a placeholder stands in
    /// when no provider produced an image.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResponse {
        self.respond(request, None).await
    }

    /// Like [`generate`](Self::generate) but stops between attempts once
    /// `cancel` reads `true`, answering with a placeholder.
    pub async fn generate_until(
        &self,
        request: &GenerationRequest,
        cancel: &watch::Receiver<bool>,
    ) -> GenerationResponse {
        self.respond(request, Some(cancel)).await
    }

    async fn respond(
        &self,
        request: &GenerationRequest,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> GenerationResponse {
        let plan = request.plan();
        let outcome = self
            .run(&plan, cancel)
            .await
            .unwrap_or_else(|Cancelled| self.placeholder(&plan, PlaceholderReason::Cancelled));
        GenerationResponse::new(request, &outcome)
    }

    pub async fn run(
        &self,
        plan: &GenerationPlan,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<GenerationOutcome, Cancelled> {
        tracing::info!(
            prompt = %plan.enhanced_prompt,
            width = plan.dimensions.width,
            height = plan.dimensions.height,
            "starting generation"
        );

        let mut attempted = Vec::new();
        for provider in &self.providers {
            if cancel.is_some_and(|signal| *signal.borrow()) {
                tracing::info!(attempted = ?attempted, "generation cancelled");
                return Err(Cancelled);
            }
            if !provider.is_configured() {
                tracing::debug!(provider = provider.label(), "skipping unconfigured provider");
                continue;
            }
            attempted.push(provider.label().to_string());
            if let Some(result) = provider.attempt(plan).await {
                tracing::info!(provider = provider.label(), "provider produced an image");
                return Ok(GenerationOutcome::Real(result));
            }
        }

        let reason = if attempted.is_empty() {
            PlaceholderReason::NoProviderConfigured
        } else {
            PlaceholderReason::AllProvidersFailed { attempted }
        };
        tracing::warn!(reason = %reason, "falling back to placeholder image");
        Ok(self.placeholder(plan, reason))
    }

    fn placeholder(&self, plan: &GenerationPlan, reason: PlaceholderReason) -> GenerationOutcome {
        GenerationOutcome::Placeholder {
            image_url: self.placeholder_url(plan.dimensions, Utc::now().timestamp_millis()),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::generation::ProviderResult;

    struct Scripted {
        label: &'static str,
        configured: bool,
        result: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(label: &'static str, configured: bool, result: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                label,
                configured,
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageProvider for Scripted {
        fn label(&self) -> &str {
            self.label
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn attempt(&self, _plan: &GenerationPlan) -> Option<ProviderResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.map(|url| ProviderResult::new(url, self.label))
        }
    }

    fn chain(providers: &[&Arc<Scripted>]) -> Vec<Arc<dyn ImageProvider>> {
        providers
            .iter()
            .map(|provider| Arc::clone(provider) as Arc<dyn ImageProvider>)
            .collect()
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("a quiet harbor", None, Some("16:9")).unwrap()
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let first = Scripted::new("first", true, None);
        let second = Scripted::new("second", true, Some("https://x/second.png"));
        let third = Scripted::new("third", true, Some("https://x/third.png"));
        let orchestrator = ImageOrchestrator::new(
            chain(&[&first, &second, &third]),
            "https://picsum.photos",
        );

        let response = orchestrator.generate(&request()).await;
        assert_eq!(response.provider, "second");
        assert_eq!(response.image_url, "https://x/second.png");
        assert!(!response.is_placeholder);
        assert_eq!((first.calls(), second.calls(), third.calls()), (1, 1, 0));
    }

    #[tokio::test]
    async fn unconfigured_providers_are_skipped() {
        let paid = Scripted::new("paid", false, Some("https://x/paid.png"));
        let free = Scripted::new("free", true, Some("https://x/free.png"));
        let orchestrator = ImageOrchestrator::new(chain(&[&paid, &free]), "https://p");

        let response = orchestrator.generate(&request()).await;
        assert_eq!(response.provider, "free");
        assert_eq!(paid.calls(), 0);
    }

    #[tokio::test]
    async fn empty_chain_yields_placeholder() {
        let orchestrator = ImageOrchestrator::new(Vec::new(), "https://picsum.photos/");
        let response = orchestrator.generate(&request()).await;
        assert!(response.success);
        assert!(response.is_placeholder);
        assert_eq!(response.provider, "Placeholder");
        assert!(response.image_url.starts_with("https://picsum.photos/768/432?random="));
        assert_eq!(
            response.note.as_deref(),
            Some("No AI image service is configured. Using placeholder image.")
        );
    }

    #[tokio::test]
    async fn exhausted_chain_names_attempted_providers() {
        let orchestrator = ImageOrchestrator::new(
            chain(&[&Scripted::new("a", true, None), &Scripted::new("b", true, None)]),
            "https://picsum.photos",
        );
        let response = orchestrator.generate(&request()).await;
        assert!(response.is_placeholder);
        assert!(response.note.unwrap().contains("(a, b)"));
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_attempt() {
        let first = Scripted::new("first", true, None);
        let orchestrator = ImageOrchestrator::new(chain(&[&first]), "https://p");
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let plan = request().plan();
        assert_eq!(orchestrator.run(&plan, Some(&rx)).await.unwrap_err(), Cancelled);

        let response = orchestrator.generate_until(&request(), &rx).await;
        assert!(response.success);
        assert!(response.is_placeholder);
        assert_eq!(
            response.note.as_deref(),
            Some("Generation was cancelled. Using placeholder image.")
        );
        assert_eq!(first.calls(), 0);
    }

    #[tokio::test]
    async fn responses_get_fresh_ids() {
        let orchestrator = ImageOrchestrator::new(
            chain(&[&Scripted::new("only", true, Some("https://x/only.png"))]),
            "https://p",
        );
        let a = orchestrator.generate(&request()).await;
        let b = orchestrator.generate(&request()).await;
        assert_ne!(a.id, b.id);
        assert_eq!(a.image_url, b.image_url);
    }
}

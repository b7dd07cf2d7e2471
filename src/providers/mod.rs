pub mod fal;
pub mod huggingface;
pub mod lightx;
pub mod pollinations;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, header::CONTENT_TYPE};

use crate::{
    config::ProviderConfig,
    generation::{GenerationPlan, ProviderResult},
    image_processing::{encode_data_url, resolve_image_mime},
    logging::excerpt,
};

pub use fal::FalProvider;
pub use huggingface::HuggingFaceProvider;
pub use lightx::LightxProvider;
pub use pollinations::PollinationsProvider;

pub(crate) const LOG_EXCERPT_CHARS: usize = 200;
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (compatible; ImageCascade/0.1)";

/// One external image-generation API behind the normalized result type.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provenance label reported to the caller.
    fn label(&self) -> &str;

    /// `false` when required configuration (an API key) is absent.
    fn is_configured(&self) -> bool;

    /// Tries to produce an image. Every failure is logged and becomes `None`.
    async fn attempt(&self, plan: &GenerationPlan) -> Option<ProviderResult>;
}

pub fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default HTTP client");
            Client::new()
        })
}

/// Providers in priority order: fast paid, secondary paid, free best-effort,
/// free last resort.
pub fn default_chain(config: &ProviderConfig) -> Vec<Arc<dyn ImageProvider>> {
    let client = build_http_client(config.timeout);
    let mut chain: Vec<Arc<dyn ImageProvider>> = vec![
        Arc::new(FalProvider::new(
            client.clone(),
            config.fal_base_url.clone(),
            config.fal_key.clone(),
        )),
        Arc::new(LightxProvider::new(
            client.clone(),
            config.lightx_api_base_url.clone(),
            config.lightx_site_base_url.clone(),
            config.lightx_key.clone(),
        )),
    ];
    if config.pollinations_enabled {
        chain.push(Arc::new(PollinationsProvider::new(
            client.clone(),
            config.pollinations_base_url.clone(),
        )));
    }
    if config.huggingface_enabled {
        chain.push(Arc::new(HuggingFaceProvider::new(
            client,
            config.huggingface_base_url.clone(),
            config.huggingface_token.clone(),
        )));
    }
    chain
}

/// Reads the body of a failed response for logging.
pub(crate) async fn log_http_failure(provider: &str, endpoint: &str, response: Response) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    tracing::warn!(
        provider,
        endpoint,
        status = status.as_u16(),
        body = %excerpt(&text, LOG_EXCERPT_CHARS),
        "provider returned an error status"
    );
}

/// Turns a raw image response into a data URL. Providers that answer with
/// bytes cannot be re-fetched later, so the payload is embedded.
pub(crate) async fn read_binary_image(
    provider: &str,
    endpoint: &str,
    response: Response,
) -> Option<String> {
    if !response.status().is_success() {
        log_http_failure(provider, endpoint, response).await;
        return None;
    }
    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(provider, endpoint, error = %err, "failed to read image body");
            return None;
        }
    };
    if bytes.is_empty() {
        tracing::warn!(provider, endpoint, "provider returned an empty image body");
        return None;
    }
    match resolve_image_mime(declared.as_deref(), &bytes) {
        Some(mime) => Some(encode_data_url(&mime, &bytes)),
        None => {
            tracing::warn!(
                provider,
                endpoint,
                content_type = declared.as_deref().unwrap_or("<none>"),
                body = %excerpt(&String::from_utf8_lossy(&bytes), LOG_EXCERPT_CHARS),
                "provider response is not an image"
            );
            None
        }
    }
}

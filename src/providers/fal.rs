use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ImageProvider, LOG_EXCERPT_CHARS, log_http_failure};
use crate::{
    generation::{GenerationPlan, ProviderResult},
    logging::excerpt,
};

pub const FAL_LABEL: &str = "Fal AI";
const FAL_MODEL_PATH: &str = "/fal-ai/flux/schnell";

#[derive(Debug, Serialize)]
struct FalRequest<'a> {
    prompt: &'a str,
    image_size: &'static str,
    num_inference_steps: u32,
    guidance_scale: f32,
    num_images: u32,
    enable_safety_checker: bool,
}

#[derive(Debug, Deserialize)]
struct FalResponse {
    #[serde(default)]
    images: Vec<FalImage>,
}

#[derive(Debug, Deserialize)]
struct FalImage {
    url: Option<String>,
}

/// Fast paid provider (FLUX schnell). Takes a qualitative size class.
pub struct FalProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FalProvider {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{FAL_MODEL_PATH}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ImageProvider for FalProvider {
    fn label(&self) -> &str {
        FAL_LABEL
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn attempt(&self, plan: &GenerationPlan) -> Option<ProviderResult> {
        let api_key = self.api_key.as_deref()?;
        let endpoint = self.endpoint();
        let body = FalRequest {
            prompt: &plan.enhanced_prompt,
            image_size: plan.size_class().as_str(),
            num_inference_steps: 4,
            guidance_scale: 3.5,
            num_images: 1,
            enable_safety_checker: true,
        };

        tracing::info!(provider = FAL_LABEL, endpoint = %endpoint, "attempting generation");
        let response = match self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Key {api_key}"))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(provider = FAL_LABEL, endpoint = %endpoint, error = %err, "request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            log_http_failure(FAL_LABEL, &endpoint, response).await;
            return None;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(provider = FAL_LABEL, error = %err, "failed to read response body");
                return None;
            }
        };
        let payload: FalResponse = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    provider = FAL_LABEL,
                    error = %err,
                    body = %excerpt(&text, LOG_EXCERPT_CHARS),
                    "unparsable response"
                );
                return None;
            }
        };

        let image_url = payload
            .images
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .filter(|url| !url.trim().is_empty());
        match image_url {
            Some(url) => Some(ProviderResult::new(url, FAL_LABEL)),
            None => {
                tracing::warn!(provider = FAL_LABEL, "response contained no image");
                None
            }
        }
    }
}

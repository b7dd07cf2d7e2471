use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use url::Url;

use super::{ImageProvider, read_binary_image};
use crate::generation::{GenerationPlan, ProviderResult};

pub const POLLINATIONS_LABEL: &str = "Pollinations AI (Free)";
pub const POLLINATIONS_NOTE: &str = "Generated using free Pollinations AI service";

/// Free best-effort provider. Answers a GET with the image bytes themselves.
pub struct PollinationsProvider {
    client: Client,
    base_url: String,
}

impl PollinationsProvider {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn request_url(&self, plan: &GenerationPlan, seed: i64) -> Option<Url> {
        let mut url = Url::parse(&self.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push("prompt")
            .push(&plan.enhanced_prompt);
        url.query_pairs_mut()
            .append_pair("width", &plan.dimensions.width.to_string())
            .append_pair("height", &plan.dimensions.height.to_string())
            .append_pair("seed", &seed.to_string())
            .append_pair("model", "flux");
        Some(url)
    }
}

#[async_trait]
impl ImageProvider for PollinationsProvider {
    fn label(&self) -> &str {
        POLLINATIONS_LABEL
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn attempt(&self, plan: &GenerationPlan) -> Option<ProviderResult> {
        let Some(url) = self.request_url(plan, Utc::now().timestamp_millis()) else {
            tracing::warn!(provider = POLLINATIONS_LABEL, base_url = %self.base_url, "invalid base URL");
            return None;
        };
        let endpoint = format!("{}{}", url.origin().ascii_serialization(), url.path());
        tracing::info!(provider = POLLINATIONS_LABEL, endpoint = %endpoint, "attempting generation");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(provider = POLLINATIONS_LABEL, error = %err, "request failed");
                return None;
            }
        };
        let data_url = read_binary_image(POLLINATIONS_LABEL, &endpoint, response).await?;
        Some(ProviderResult::new(data_url, POLLINATIONS_LABEL).with_note(POLLINATIONS_NOTE))
    }
}

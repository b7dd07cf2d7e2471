use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{ImageProvider, read_binary_image};
use crate::generation::{GenerationPlan, ProviderResult};

pub const HUGGINGFACE_LABEL: &str = "Hugging Face (Free)";
pub const HUGGINGFACE_NOTE: &str = "Generated using free Hugging Face API";
const HUGGINGFACE_MODEL_PATH: &str = "/models/stabilityai/stable-diffusion-2-1";

/// Last-resort free provider. The token is optional; anonymous calls are
/// heavily rate limited but still attempted.
pub struct HuggingFaceProvider {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HuggingFaceProvider {
    pub fn new(client: Client, base_url: String, token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    fn label(&self) -> &str {
        HUGGINGFACE_LABEL
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn attempt(&self, plan: &GenerationPlan) -> Option<ProviderResult> {
        let endpoint = format!("{}{HUGGINGFACE_MODEL_PATH}", self.base_url.trim_end_matches('/'));
        tracing::info!(provider = HUGGINGFACE_LABEL, endpoint = %endpoint, "attempting generation");

        let mut request = self.client.post(&endpoint).json(&json!({
            "inputs": plan.enhanced_prompt,
            "parameters": {
                "num_inference_steps": 20,
                "guidance_scale": 7.5,
            },
        }));
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(provider = HUGGINGFACE_LABEL, endpoint = %endpoint, error = %err, "request failed");
                return None;
            }
        };
        let data_url = read_binary_image(HUGGINGFACE_LABEL, &endpoint, response).await?;
        Some(ProviderResult::new(data_url, HUGGINGFACE_LABEL).with_note(HUGGINGFACE_NOTE))
    }
}

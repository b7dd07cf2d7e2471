use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{ImageProvider, LOG_EXCERPT_CHARS, log_http_failure};
use crate::{
    generation::{GenerationPlan, ProviderResult, Style, extract::extract_image_url_from_text},
    logging::excerpt,
};

pub const LIGHTX_LABEL: &str = "LightX AI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `X-API-Key: <key>`
    ApiKeyHeader,
    /// `Authorization: Key <key>`
    KeyPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// Explicit pixel sizes with diffusion parameters.
    Pixels,
    /// `text` + `WxH` size + style name.
    TextSize,
    /// Size class with a fixed SDXL model.
    SizeClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    Api,
    Site,
}

/// One known LightX endpoint variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointVariant {
    pub host: Host,
    pub path: &'static str,
    pub auth: AuthScheme,
    pub body: BodyShape,
}

/// Tried in this order; the first variant that yields an image wins.
pub const ENDPOINT_VARIANTS: &[EndpointVariant] = &[
    EndpointVariant {
        host: Host::Api,
        path: "/api/v1/text-to-image",
        auth: AuthScheme::Bearer,
        body: BodyShape::Pixels,
    },
    EndpointVariant {
        host: Host::Site,
        path: "/api/generate",
        auth: AuthScheme::ApiKeyHeader,
        body: BodyShape::TextSize,
    },
    EndpointVariant {
        host: Host::Api,
        path: "/generate",
        auth: AuthScheme::KeyPrefix,
        body: BodyShape::SizeClass,
    },
];

pub fn build_body(shape: BodyShape, plan: &GenerationPlan) -> Value {
    match shape {
        BodyShape::Pixels => json!({
            "prompt": plan.enhanced_prompt,
            "width": plan.dimensions.width,
            "height": plan.dimensions.height,
            "num_inference_steps": 20,
            "guidance_scale": 7.5,
        }),
        BodyShape::TextSize => {
            let style = match plan.style {
                Style::Auto => Style::Realistic,
                other => other,
            };
            json!({
                "text": plan.enhanced_prompt,
                "size": plan.dimensions.size_string(),
                "style": style.as_str(),
            })
        }
        BodyShape::SizeClass => json!({
            "prompt": plan.enhanced_prompt,
            "image_size": plan.size_class().as_str(),
            "model": "stable-diffusion-xl",
        }),
    }
}

/// Secondary paid provider. Its public API has moved between several
/// endpoints, so each known variant is tried in turn.
pub struct LightxProvider {
    client: Client,
    api_base_url: String,
    site_base_url: String,
    api_key: Option<String>,
}

impl LightxProvider {
    pub fn new(
        client: Client,
        api_base_url: String,
        site_base_url: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            api_base_url,
            site_base_url,
            api_key,
        }
    }

    fn endpoint(&self, variant: &EndpointVariant) -> String {
        let base = match variant.host {
            Host::Api => &self.api_base_url,
            Host::Site => &self.site_base_url,
        };
        format!("{}{}", base.trim_end_matches('/'), variant.path)
    }

    async fn attempt_variant(
        &self,
        variant: &EndpointVariant,
        api_key: &str,
        plan: &GenerationPlan,
    ) -> Option<String> {
        let endpoint = self.endpoint(variant);
        tracing::info!(provider = LIGHTX_LABEL, endpoint = %endpoint, "trying endpoint");

        let request = self.client.post(&endpoint).json(&build_body(variant.body, plan));
        let request = match variant.auth {
            AuthScheme::Bearer => request.bearer_auth(api_key),
            AuthScheme::ApiKeyHeader => request.header("X-API-Key", api_key),
            AuthScheme::KeyPrefix => request.header("Authorization", format!("Key {api_key}")),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(provider = LIGHTX_LABEL, endpoint = %endpoint, error = %err, "request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            log_http_failure(LIGHTX_LABEL, &endpoint, response).await;
            return None;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(provider = LIGHTX_LABEL, endpoint = %endpoint, error = %err, "failed to read response body");
                return None;
            }
        };
        let image_url = extract_image_url_from_text(&text);
        if image_url.is_none() {
            tracing::warn!(
                provider = LIGHTX_LABEL,
                endpoint = %endpoint,
                body = %excerpt(&text, LOG_EXCERPT_CHARS),
                "no image reference in response"
            );
        }
        image_url
    }
}

#[async_trait]
impl ImageProvider for LightxProvider {
    fn label(&self) -> &str {
        LIGHTX_LABEL
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn attempt(&self, plan: &GenerationPlan) -> Option<ProviderResult> {
        let api_key = self.api_key.as_deref()?;
        for variant in ENDPOINT_VARIANTS {
            if let Some(url) = self.attempt_variant(variant, api_key, plan).await {
                return Some(ProviderResult::new(url, LIGHTX_LABEL));
            }
        }
        tracing::warn!(provider = LIGHTX_LABEL, "all endpoints failed or returned no image");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationRequest;

    fn plan(style: &str, ratio: &str) -> GenerationPlan {
        GenerationRequest::new("city skyline", Some(style), Some(ratio))
            .unwrap()
            .plan()
    }

    #[test]
    fn pixel_body_carries_dimensions() {
        let body = build_body(BodyShape::Pixels, &plan("auto", "16:9"));
        assert_eq!(body["prompt"], "city skyline");
        assert_eq!(body["width"], 768);
        assert_eq!(body["height"], 432);
    }

    #[test]
    fn text_body_maps_auto_to_realistic() {
        let body = build_body(BodyShape::TextSize, &plan("auto", "9:16"));
        assert_eq!(body["text"], "city skyline");
        assert_eq!(body["size"], "432x768");
        assert_eq!(body["style"], "realistic");

        let body = build_body(BodyShape::TextSize, &plan("anime", "1:1"));
        assert_eq!(body["style"], "anime");
    }

    #[test]
    fn size_class_body() {
        let body = build_body(BodyShape::SizeClass, &plan("auto", "16:9"));
        assert_eq!(body["image_size"], "landscape");
        assert_eq!(body["model"], "stable-diffusion-xl");
    }

    #[test]
    fn variants_are_ordered() {
        let paths: Vec<&str> = ENDPOINT_VARIANTS.iter().map(|v| v.path).collect();
        assert_eq!(paths, ["/api/v1/text-to-image", "/api/generate", "/generate"]);
    }
}

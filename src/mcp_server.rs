use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars::JsonSchema,
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{
    generation::{AspectRatio, GenerationRequest, Style},
    routes::AppState,
    status::StatusReport,
    store::Page,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageRequest {
    #[schemars(description = "What the image should show")]
    pub prompt: String,
    #[schemars(
        description = "One of auto, realistic, digital-art, painting, anime, 3d-render, minimalist. Defaults to auto"
    )]
    pub style: Option<String>,
    #[schemars(description = "One of 1:1, 16:9, 9:16. Defaults to 1:1")]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPublicImagesRequest {
    #[schemars(description = "Maximum number of records, newest first. Defaults to 20")]
    pub limit: Option<usize>,
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| McpError::internal_error(err.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[derive(Clone)]
pub struct ImageCascadeServer {
    tool_router: ToolRouter<Self>,
    state: AppState,
}

impl ImageCascadeServer {
    pub fn new(state: AppState) -> Self {
        Self {
            tool_router: Self::tool_router(),
            state,
        }
    }
}

#[tool_router]
impl ImageCascadeServer {
    #[tool(
        description = "Generate an image from a prompt. Providers are tried in priority order and a placeholder is returned when none succeeds; check isPlaceholder and note. Show the result with ![](imageUrl)"
    )]
    async fn generate_image(
        &self,
        Parameters(request): Parameters<GenerateImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = GenerationRequest::new(
            &request.prompt,
            request.style.as_deref(),
            request.aspect_ratio.as_deref(),
        )
        .map_err(|err| McpError::invalid_params(err.0, None))?;
        let response = self
            .state
            .orchestrator
            .generate_until(&request, &self.state.shutdown)
            .await;
        to_json(&response)
    }

    #[tool(description = "Report which image providers, archive and identity integrations are configured")]
    async fn provider_status(&self) -> Result<CallToolResult, McpError> {
        to_json(&StatusReport::from_config(&self.state.config))
    }

    #[tool(description = "List recently published images from all users, newest first")]
    async fn list_public_images(
        &self,
        Parameters(request): Parameters<ListPublicImagesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let records = self
            .state
            .records
            .list_public(Page::new(request.limit, None))
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "listing public images failed");
                McpError::internal_error(err.to_string(), None)
            })?;
        to_json(&records)
    }
}

#[tool_handler]
impl ServerHandler for ImageCascadeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Text-to-image generation with provider fallback. Styles: {}. Aspect ratios: {}.",
                Style::allowed_values(),
                AspectRatio::allowed_values()
            )),
            ..Default::default()
        }
    }
}

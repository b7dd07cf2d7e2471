use std::fmt;

use serde::{Deserialize, Serialize};

use super::aspect::AspectRatio;
use super::request::GenerationRequest;
use super::style::Style;

pub const PLACEHOLDER_PROVIDER: &str = "Placeholder";

/// A usable image produced by one provider adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub image_url: String,
    pub provider: String,
    pub note: Option<String>,
}

impl ProviderResult {
    pub fn new(image_url: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            provider: provider.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderReason {
    NoProviderConfigured,
    AllProvidersFailed { attempted: Vec<String> },
    Cancelled,
}

impl fmt::Display for PlaceholderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderReason::NoProviderConfigured => write!(
                f,
                "No AI image service is configured. Using placeholder image."
            ),
            PlaceholderReason::AllProvidersFailed { attempted } => write!(
                f,
                "All AI services are currently unavailable ({}). Using placeholder image.",
                attempted.join(", ")
            ),
            PlaceholderReason::Cancelled => {
                write!(f, "Generation was cancelled. Using placeholder image.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Real(ProviderResult),
    Placeholder {
        image_url: String,
        reason: PlaceholderReason,
    },
}

impl GenerationOutcome {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, GenerationOutcome::Placeholder { .. })
    }

    pub fn image_url(&self) -> &str {
        match self {
            GenerationOutcome::Real(result) => &result.image_url,
            GenerationOutcome::Placeholder { image_url, .. } => image_url,
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            GenerationOutcome::Real(result) => &result.provider,
            GenerationOutcome::Placeholder { .. } => PLACEHOLDER_PROVIDER,
        }
    }

    pub fn note(&self) -> Option<String> {
        match self {
            GenerationOutcome::Real(result) => result.note.clone(),
            GenerationOutcome::Placeholder { reason, .. } => Some(reason.to_string()),
        }
    }
}

/// What the caller receives for a valid request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub id: String,
    pub image_url: String,
    pub prompt: String,
    pub style: Style,
    pub aspect_ratio: AspectRatio,
    pub provider: String,
    pub is_placeholder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl GenerationResponse {
    pub fn new(request: &GenerationRequest, outcome: &GenerationOutcome) -> Self {
        Self {
            success: true,
            id: uuid::Uuid::new_v4().to_string(),
            image_url: outcome.image_url().to_string(),
            prompt: request.prompt.clone(),
            style: request.style,
            aspect_ratio: request.aspect_ratio,
            provider: outcome.provider().to_string(),
            is_placeholder: outcome.is_placeholder(),
            note: outcome.note(),
        }
    }
}

use serde_json::Value;
use thiserror::Error;

use super::aspect::{AspectRatio, Dimensions, SizeClass};
use super::style::{Style, enhance_prompt};

pub const PROMPT_REQUIRED: &str = "Prompt is required and must be a non-empty string";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// A request that passed validation. `prompt` is already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub style: Style,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    pub fn new(
        prompt: &str,
        style: Option<&str>,
        aspect_ratio: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError(PROMPT_REQUIRED.to_string()));
        }
        let style = match style.filter(|value| !value.is_empty()) {
            Some(value) => value.parse::<Style>().map_err(ValidationError)?,
            None => Style::Auto,
        };
        let aspect_ratio = match aspect_ratio.filter(|value| !value.is_empty()) {
            Some(value) => value.parse::<AspectRatio>().map_err(ValidationError)?,
            None => AspectRatio::Square,
        };
        Ok(Self {
            prompt: prompt.to_string(),
            style,
            aspect_ratio,
        })
    }

    /// Validates a loosely typed JSON body. `null` or `""` for style and
    /// aspect ratio select the defaults; any other non-member is rejected.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let prompt = body
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError(PROMPT_REQUIRED.to_string()))?;
        let style = optional_token(body, "style", || {
            format!("Invalid style. Must be one of: {}", Style::allowed_values())
        })?;
        let aspect_ratio = optional_token(body, "aspectRatio", || {
            format!(
                "Invalid aspect ratio. Must be one of: {}",
                AspectRatio::allowed_values()
            )
        })?;
        Self::new(prompt, style, aspect_ratio)
    }

    pub fn plan(&self) -> GenerationPlan {
        GenerationPlan {
            enhanced_prompt: enhance_prompt(&self.prompt, self.style),
            dimensions: self.aspect_ratio.dimensions(),
            style: self.style,
            aspect_ratio: self.aspect_ratio,
        }
    }
}

fn optional_token<'a>(
    body: &'a Value,
    key: &str,
    invalid: impl FnOnce() -> String,
) -> Result<Option<&'a str>, ValidationError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(ValidationError(invalid())),
    }
}

/// Values derived once per request and shared by every provider attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub enhanced_prompt: String,
    pub dimensions: Dimensions,
    pub style: Style,
    pub aspect_ratio: AspectRatio,
}

impl GenerationPlan {
    pub fn size_class(&self) -> SizeClass {
        self.aspect_ratio.size_class()
    }
}

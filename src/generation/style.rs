use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Auto,
    Realistic,
    DigitalArt,
    Painting,
    Anime,
    #[serde(rename = "3d-render")]
    Render3d,
    Minimalist,
}

impl Style {
    pub const ALL: [Style; 7] = [
        Style::Auto,
        Style::Realistic,
        Style::DigitalArt,
        Style::Painting,
        Style::Anime,
        Style::Render3d,
        Style::Minimalist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Auto => "auto",
            Style::Realistic => "realistic",
            Style::DigitalArt => "digital-art",
            Style::Painting => "painting",
            Style::Anime => "anime",
            Style::Render3d => "3d-render",
            Style::Minimalist => "minimalist",
        }
    }

    /// Text appended to the prompt for this style. `Auto` has none.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Style::Auto => None,
            Style::Realistic => Some("photorealistic, high quality, detailed, 8k"),
            Style::DigitalArt => Some("digital art, concept art, artstation trending"),
            Style::Painting => Some("oil painting, artistic, painterly, fine art"),
            Style::Anime => Some("anime style, manga, japanese animation style"),
            Style::Render3d => Some("3D render, CGI, octane render, unreal engine"),
            Style::Minimalist => Some("minimalist, clean, simple design, geometric"),
        }
    }

    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(Style::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == value)
            .ok_or_else(|| format!("Invalid style. Must be one of: {}", Self::allowed_values()))
    }
}

/// Appends the style suffix to an already trimmed prompt.
pub fn enhance_prompt(prompt: &str, style: Style) -> String {
    match style.suffix() {
        Some(suffix) => format!("{prompt}, {suffix}"),
        None => prompt.to_string(),
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// `WIDTHxHEIGHT`, as some providers expect.
    pub fn size_string(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Qualitative size for providers that do not take pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Square,
    Landscape,
    Portrait,
}

impl SizeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Square => "square",
            SizeClass::Landscape => "landscape",
            SizeClass::Portrait => "portrait",
        }
    }
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = match self {
            AspectRatio::Square => (512, 512),
            AspectRatio::Landscape => (768, 432),
            AspectRatio::Portrait => (432, 768),
        };
        Dimensions { width, height }
    }

    pub fn size_class(&self) -> SizeClass {
        match self {
            AspectRatio::Square => SizeClass::Square,
            AspectRatio::Landscape => SizeClass::Landscape,
            AspectRatio::Portrait => SizeClass::Portrait,
        }
    }

    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(AspectRatio::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Absent ratio resolves to the square default.
pub fn resolve_dimensions(ratio: Option<AspectRatio>) -> Dimensions {
    ratio.unwrap_or_default().dimensions()
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == value)
            .ok_or_else(|| {
                format!(
                    "Invalid aspect ratio. Must be one of: {}",
                    Self::allowed_values()
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_table() {
        assert_eq!(AspectRatio::Square.dimensions(), Dimensions { width: 512, height: 512 });
        assert_eq!(AspectRatio::Landscape.dimensions(), Dimensions { width: 768, height: 432 });
        assert_eq!(AspectRatio::Portrait.dimensions(), Dimensions { width: 432, height: 768 });
    }

    #[test]
    fn absent_ratio_defaults_to_square() {
        assert_eq!(resolve_dimensions(None), Dimensions { width: 512, height: 512 });
    }

    #[test]
    fn size_classes() {
        assert_eq!(AspectRatio::Landscape.size_class().as_str(), "landscape");
        assert_eq!(AspectRatio::Portrait.size_class().as_str(), "portrait");
        assert_eq!(AspectRatio::Square.size_class().as_str(), "square");
    }

    #[test]
    fn rejects_unlisted_ratio() {
        let err = "4:3".parse::<AspectRatio>().unwrap_err();
        assert_eq!(err, "Invalid aspect ratio. Must be one of: 1:1, 16:9, 9:16");
    }

    #[test]
    fn size_string_uses_x_separator() {
        assert_eq!(AspectRatio::Landscape.dimensions().size_string(), "768x432");
    }
}

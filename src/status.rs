use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppConfig;

const PREVIEW_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatus {
    pub configured: bool,
    pub key_length: usize,
    pub key_preview: String,
}

impl KeyStatus {
    fn from_key(key: Option<&str>) -> Self {
        match key {
            Some(key) => Self {
                configured: true,
                key_length: key.chars().count(),
                key_preview: key_preview(key),
            },
            None => Self {
                configured: false,
                key_length: 0,
                key_preview: "Not set".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnabledStatus {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfiguredStatus {
    pub configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiStatus {
    pub fal: KeyStatus,
    pub lightx: KeyStatus,
    pub huggingface: KeyStatus,
    pub pollinations: EnabledStatus,
    pub archive: ConfiguredStatus,
    pub identity: ConfiguredStatus,
}

/// Which integrations are usable, without exposing any secret in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub apis: ApiStatus,
    pub recommendations: Vec<String>,
}

impl StatusReport {
    pub fn from_config(config: &AppConfig) -> Self {
        let providers = &config.providers;
        let apis = ApiStatus {
            fal: KeyStatus::from_key(providers.fal_key.as_deref()),
            lightx: KeyStatus::from_key(providers.lightx_key.as_deref()),
            huggingface: KeyStatus::from_key(providers.huggingface_token.as_deref()),
            pollinations: EnabledStatus {
                enabled: providers.pollinations_enabled,
            },
            archive: ConfiguredStatus {
                configured: config.archive.is_configured(),
            },
            identity: ConfiguredStatus {
                configured: config.identity.is_configured(),
            },
        };

        let mut recommendations = Vec::new();
        if !apis.fal.configured && !apis.lightx.configured {
            recommendations.push("Configure at least one API key (FAL_KEY or LIGHTX_API_KEY)".to_string());
        }
        if !apis.fal.configured {
            recommendations.push("Add FAL_KEY for fast image generation with Fal AI".to_string());
        }
        if !apis.lightx.configured {
            recommendations.push("Add LIGHTX_API_KEY to use LightX AI as a secondary provider".to_string());
        }
        if !providers.pollinations_enabled && !providers.huggingface_enabled {
            recommendations.push(
                "Set POLLINATIONS_ENABLED or HUGGINGFACE_ENABLED to keep a free fallback".to_string(),
            );
        }
        if !apis.archive.configured {
            recommendations.push(
                "Add INTERNET_ARCHIVE_ACCESS_KEY and INTERNET_ARCHIVE_SECRET_KEY to enable archiving"
                    .to_string(),
            );
        }

        Self {
            timestamp: Utc::now(),
            environment: config.environment.clone(),
            apis,
            recommendations,
        }
    }
}

/// At most eight characters, and never more than half the key.
pub fn key_preview(key: &str) -> String {
    let shown = PREVIEW_CHARS.min(key.chars().count() / 2);
    let prefix: String = key.chars().take(shown).collect();
    format!("{prefix}...")
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;

pub const FAL_BASE_URL: &str = "https://fal.run";
pub const LIGHTX_API_BASE_URL: &str = "https://api.lightx.ai";
pub const LIGHTX_SITE_BASE_URL: &str = "https://lightx.ai";
pub const POLLINATIONS_BASE_URL: &str = "https://image.pollinations.ai";
pub const HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const PLACEHOLDER_BASE_URL: &str = "https://picsum.photos";
pub const ARCHIVE_BASE_URL: &str = "https://s3.us.archive.org";
pub const ARCHIVE_DETAILS_BASE_URL: &str = "https://archive.org/details";
pub const ARCHIVE_COLLECTION: &str = "opensource_media";

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env_string(key) {
        Some(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn env_url(key: &str, default: &str) -> String {
    env_string(key)
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Blank secrets count as absent.
fn non_blank(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub fal_key: Option<String>,
    pub lightx_key: Option<String>,
    pub huggingface_token: Option<String>,
    pub pollinations_enabled: bool,
    pub huggingface_enabled: bool,
    pub fal_base_url: String,
    pub lightx_api_base_url: String,
    pub lightx_site_base_url: String,
    pub pollinations_base_url: String,
    pub huggingface_base_url: String,
    pub placeholder_base_url: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            fal_key: None,
            lightx_key: None,
            huggingface_token: None,
            pollinations_enabled: true,
            huggingface_enabled: true,
            fal_base_url: FAL_BASE_URL.to_string(),
            lightx_api_base_url: LIGHTX_API_BASE_URL.to_string(),
            lightx_site_base_url: LIGHTX_SITE_BASE_URL.to_string(),
            pollinations_base_url: POLLINATIONS_BASE_URL.to_string(),
            huggingface_base_url: HUGGINGFACE_BASE_URL.to_string(),
            placeholder_base_url: PLACEHOLDER_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let timeout = env_string("PROVIDER_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS);

        Self {
            fal_key: env_string("FAL_KEY"),
            lightx_key: env_string("LIGHTX_API_KEY"),
            huggingface_token: env_string("HUGGINGFACE_TOKEN"),
            pollinations_enabled: env_flag("POLLINATIONS_ENABLED", true),
            huggingface_enabled: env_flag("HUGGINGFACE_ENABLED", true),
            fal_base_url: env_url("FAL_BASE_URL", FAL_BASE_URL),
            lightx_api_base_url: env_url("LIGHTX_API_BASE_URL", LIGHTX_API_BASE_URL),
            lightx_site_base_url: env_url("LIGHTX_SITE_BASE_URL", LIGHTX_SITE_BASE_URL),
            pollinations_base_url: env_url("POLLINATIONS_BASE_URL", POLLINATIONS_BASE_URL),
            huggingface_base_url: env_url("HUGGINGFACE_BASE_URL", HUGGINGFACE_BASE_URL),
            placeholder_base_url: env_url("PLACEHOLDER_BASE_URL", PLACEHOLDER_BASE_URL),
            timeout: Duration::from_secs(timeout),
        }
    }

    /// No paid keys and no free providers: every request ends on the placeholder.
    pub fn offline() -> Self {
        Self {
            pollinations_enabled: false,
            huggingface_enabled: false,
            ..Self::default()
        }
    }

    pub fn with_fal_key(mut self, key: impl Into<String>) -> Self {
        self.fal_key = non_blank(key);
        self
    }

    pub fn with_lightx_key(mut self, key: impl Into<String>) -> Self {
        self.lightx_key = non_blank(key);
        self
    }

    pub fn with_huggingface_token(mut self, token: impl Into<String>) -> Self {
        self.huggingface_token = non_blank(token);
        self
    }

    pub fn with_free_providers(mut self, pollinations: bool, huggingface: bool) -> Self {
        self.pollinations_enabled = pollinations;
        self.huggingface_enabled = huggingface;
        self
    }

    /// Points every provider and the placeholder service at one base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        self.fal_base_url = base.clone();
        self.lightx_api_base_url = base.clone();
        self.lightx_site_base_url = base.clone();
        self.pollinations_base_url = base.clone();
        self.huggingface_base_url = base.clone();
        self.placeholder_base_url = base;
        self
    }

    pub fn with_placeholder_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.placeholder_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub base_url: String,
    pub details_base_url: String,
    pub collection: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            base_url: ARCHIVE_BASE_URL.to_string(),
            details_base_url: ARCHIVE_DETAILS_BASE_URL.to_string(),
            collection: ARCHIVE_COLLECTION.to_string(),
        }
    }
}

impl ArchiveConfig {
    pub fn from_env() -> Self {
        Self {
            access_key: env_string("INTERNET_ARCHIVE_ACCESS_KEY"),
            secret_key: env_string("INTERNET_ARCHIVE_SECRET_KEY"),
            base_url: env_url("ARCHIVE_BASE_URL", ARCHIVE_BASE_URL),
            details_base_url: env_url("ARCHIVE_DETAILS_BASE_URL", ARCHIVE_DETAILS_BASE_URL),
            collection: env_string("ARCHIVE_COLLECTION")
                .unwrap_or_else(|| ARCHIVE_COLLECTION.to_string()),
        }
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = non_blank(access_key);
        self.secret_key = non_blank(secret_key);
        self
    }

    pub fn with_base_urls(
        mut self,
        base_url: impl Into<String>,
        details_base_url: impl Into<String>,
    ) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.details_base_url = details_base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    pub endpoint: Option<String>,
    pub project_id: Option<String>,
    pub app_url: Option<String>,
}

impl IdentityConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_string("IDENTITY_ENDPOINT").map(|url| url.trim_end_matches('/').to_string()),
            project_id: env_string("IDENTITY_PROJECT_ID"),
            app_url: env_string("APP_URL"),
        }
    }

    pub fn with_endpoint(
        mut self,
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        self.endpoint = Some(endpoint.into().trim_end_matches('/').to_string());
        self.project_id = non_blank(project_id);
        self
    }

    pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
        self.app_url = non_blank(app_url);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.project_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: String,
    pub data_dir: PathBuf,
    pub providers: ProviderConfig,
    pub archive: ArchiveConfig,
    pub identity: IdentityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            data_dir: default_data_dir(),
            providers: ProviderConfig::default(),
            archive: ArchiveConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env_string("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let environment = env_string("APP_ENV").unwrap_or_else(|| "development".to_string());
        let data_dir = env_string("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Self {
            port,
            environment,
            data_dir,
            providers: ProviderConfig::from_env(),
            archive: ArchiveConfig::from_env(),
            identity: IdentityConfig::from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_providers(mut self, providers: ProviderConfig) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_archive(mut self, archive: ArchiveConfig) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }
}

fn default_data_dir() -> PathBuf {
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("image-cascade");
    base
}

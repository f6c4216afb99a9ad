use std::path::PathBuf;

use bedtime_ai::openai::DEFAULT_BASE_URL;
use bedtime_ai::{OpenAiConfig, PineconeConfig};
use bedtime_core::similarity::namespace_for_environment;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deployment environment name (default: `development`).
    pub app_env: String,
    /// Prefix joined onto stored asset paths in responses (default: `/files`).
    pub public_file_base_url: String,
    /// Owner of the daily story; the job is disabled when unset.
    pub daily_story_user_email: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `APP_ENV`                | `development`           |
    /// | `PUBLIC_FILE_BASE_URL`   | `/files`                |
    /// | `DAILY_STORY_USER_EMAIL` | unset                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let public_file_base_url =
            std::env::var("PUBLIC_FILE_BASE_URL").unwrap_or_else(|_| "/files".into());

        let daily_story_user_email = std::env::var("DAILY_STORY_USER_EMAIL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            app_env,
            public_file_base_url,
            daily_story_user_email,
        }
    }

    /// Vector namespace for this deployment.
    pub fn vector_namespace(&self) -> &'static str {
        namespace_for_environment(&self.app_env)
    }

    /// Public URL for a storage-relative asset path.
    ///
    /// Paths that are already absolute URLs are returned unchanged.
    pub fn public_file_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.public_file_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Credentials and locations of the external providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai: OpenAiConfig,
    pub pinecone: PineconeConfig,
    /// Root directory for generated media (default: `./storage`).
    pub asset_dir: PathBuf,
}

impl ProviderConfig {
    /// Load provider settings from the environment.
    ///
    /// | Env Var               | Default                     |
    /// |-----------------------|-----------------------------|
    /// | `OPENAI_API_KEY`      | required                    |
    /// | `OPENAI_BASE_URL`     | `https://api.openai.com/v1` |
    /// | `PINECONE_API_KEY`    | required                    |
    /// | `PINECONE_INDEX_HOST` | required                    |
    /// | `ASSET_DIR`           | `./storage`                 |
    pub fn from_env() -> Self {
        let openai = OpenAiConfig {
            api_key: std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set"),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
        };

        let pinecone = PineconeConfig {
            api_key: std::env::var("PINECONE_API_KEY").expect("PINECONE_API_KEY must be set"),
            index_host: std::env::var("PINECONE_INDEX_HOST")
                .expect("PINECONE_INDEX_HOST must be set"),
        };

        let asset_dir = std::env::var("ASSET_DIR")
            .unwrap_or_else(|_| "./storage".into())
            .into();

        Self {
            openai,
            pinecone,
            asset_dir,
        }
    }
}

//! Client configuration loaded via OrthoConfig.
//!
//! Every field is optional; accessors supply the defaults.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::DEFAULT_LOGIN_PATH;
use crate::outbound::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// API root used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_STORAGE_DIR: &str = ".movies-session";

/// Settings for the movie API client.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MOVIES")]
pub struct ClientSettings {
    /// Root URL of the movie API, including any `/api/v1` prefix.
    pub api_base_url: Option<String>,
    /// Per-request timeout in milliseconds; `0` selects the default.
    #[ortho_config(default = 10_000)]
    pub timeout_ms: u64,
    /// Directory holding the persisted session.
    pub storage_dir: Option<PathBuf>,
    /// Login entry point reported after an unrecoverable refresh failure.
    pub login_path: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: Option<String>,
}

impl ClientSettings {
    /// Return the configured API root, falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured value is not an absolute URL.
    pub fn api_base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL))
    }

    /// Return the per-request timeout, falling back to ten seconds.
    pub const fn timeout(&self) -> Duration {
        if self.timeout_ms == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }

    /// Return the session directory, falling back to `.movies-session`.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
    }

    /// Return the login entry point, falling back to `/login`.
    pub fn login_path(&self) -> &str {
        self.login_path.as_deref().unwrap_or(DEFAULT_LOGIN_PATH)
    }

    /// Return the user agent, falling back to `movies-client/<version>`.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

use std::env;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable naming the question source (`remote`, `deepseek`, `demo`).
pub const SOURCE_ENV: &str = "QUIZ_SOURCE";
/// Environment variable holding the question endpoint URL.
pub const SOURCE_URL_ENV: &str = "QUIZ_SOURCE_URL";
/// Environment variable holding the request timeout in whole seconds.
pub const SOURCE_TIMEOUT_ENV: &str = "QUIZ_SOURCE_TIMEOUT_SECS";

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this key
    const KEY_NAME: &'static str;

    /// Find the key by checking environment variables, after loading `.env` if present
    fn find_key() -> Option<String> {
        load_dotenv();
        env::var(Self::KEY_NAME).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Load `.env` into the process environment, silently ignoring a missing file.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Question source settings read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    /// Explicit source choice; `None` means auto-detect.
    pub source: Option<String>,
    /// Remote endpoint; `None` means the remote source is unconfigured.
    pub url: Option<String>,
    pub timeout: Option<Duration>,
}

impl SourceConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        let config = Self::from_lookup(|key| env::var(key).ok());
        debug!(source = ?config.source, url = ?config.url, timeout = ?config.timeout, "Loaded source configuration");
        config
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = non_empty(SOURCE_TIMEOUT_ENV).and_then(|raw| match raw.parse::<u64>() {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring invalid {}", SOURCE_TIMEOUT_ENV);
                None
            }
        });

        Self {
            source: non_empty(SOURCE_ENV),
            url: non_empty(SOURCE_URL_ENV),
            timeout,
        }
    }
}

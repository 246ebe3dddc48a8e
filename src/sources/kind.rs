use std::fmt;
use tracing::info;

use super::{DemoSource, QuestionSource, RemoteConfig, RemoteSource};
use crate::config::SourceConfig;
#[cfg(feature = "deepseek")]
use crate::config::KeyFromEnv;
use crate::error::GenerationError;

/// Which question source to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Remote,
    #[cfg(feature = "deepseek")]
    DeepSeek,
    Demo,
}

impl SourceKind {
    /// Parse source kind from string (case insensitive)
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            #[cfg(feature = "deepseek")]
            "deepseek" => Ok(Self::DeepSeek),
            "demo" => Ok(Self::Demo),
            _ => Err(format!("Unknown question source: '{}'. Supported: {}", s, Self::supported())),
        }
    }

    fn supported() -> &'static str {
        if cfg!(feature = "deepseek") {
            "remote, deepseek, demo"
        } else {
            "remote, demo"
        }
    }

    /// Pick the source for a configuration.
    ///
    /// An explicit choice wins; otherwise a configured endpoint selects the remote
    /// source, a DeepSeek key selects DeepSeek, and anything else falls back to demo.
    pub fn detect(config: &SourceConfig) -> Result<Self, String> {
        if let Some(explicit) = &config.source {
            return Self::from_str(explicit);
        }
        if config.url.is_some() {
            return Ok(Self::Remote);
        }
        if let Some(kind) = Self::detect_deepseek() {
            return Ok(kind);
        }
        Ok(Self::Demo)
    }

    #[cfg(feature = "deepseek")]
    fn detect_deepseek() -> Option<Self> {
        super::DeepSeekSource::find_key().map(|_| Self::DeepSeek)
    }

    #[cfg(not(feature = "deepseek"))]
    fn detect_deepseek() -> Option<Self> {
        None
    }

    /// Construct the source this kind names.
    pub fn build(self, config: &SourceConfig) -> Result<Box<dyn QuestionSource>, GenerationError> {
        info!(kind = %self, "Building question source");
        match self {
            Self::Remote => {
                let url = config.url.clone().ok_or_else(|| {
                    GenerationError::Unconfigured(format!("{} is not set", crate::config::SOURCE_URL_ENV))
                })?;
                let mut remote = RemoteConfig::new(url);
                remote.timeout = config.timeout;
                Ok(Box::new(RemoteSource::new(remote)?))
            }
            #[cfg(feature = "deepseek")]
            Self::DeepSeek => Ok(Box::new(super::DeepSeekSource::from_env()?)),
            Self::Demo => Ok(Box::new(DemoSource::default())),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            #[cfg(feature = "deepseek")]
            Self::DeepSeek => write!(f, "deepseek"),
            Self::Demo => write!(f, "demo"),
        }
    }
}

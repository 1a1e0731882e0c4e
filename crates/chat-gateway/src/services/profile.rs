use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ProfileConfig;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error(
        "Profile not found. Create {path} (copy from profile.example.md) or set the PROFILE_PROMPT environment variable."
    )]
    NotFound { path: String },

    #[error("Failed to read profile {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// System instructions injected into every conversation.
///
/// Loaded on first use and cached for the rest of the process. A failed
/// load is not cached, so a profile file created later is still picked up.
#[derive(Debug)]
pub struct ProfileLoader {
    prompt: Option<String>,
    path: PathBuf,
    cached: OnceCell<Arc<str>>,
}

impl ProfileLoader {
    pub fn new(prompt: Option<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.filter(|p| !p.is_empty()),
            path: path.into(),
            cached: OnceCell::new(),
        }
    }

    pub fn from_config(cfg: &ProfileConfig) -> Self {
        Self::new(cfg.prompt.clone(), &cfg.path)
    }

    pub fn load(&self) -> Result<Arc<str>, ProfileError> {
        self.cached.get_or_try_init(|| self.read_source()).cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.get().is_some()
    }

    fn read_source(&self) -> Result<Arc<str>, ProfileError> {
        if let Some(prompt) = &self.prompt {
            debug!("Using profile from PROFILE_PROMPT");
            return Ok(Arc::from(prompt.as_str()));
        }

        let path = self.path.display().to_string();
        if !self.path.exists() {
            return Err(ProfileError::NotFound { path });
        }

        let text = std::fs::read_to_string(&self.path)
            .map_err(|source| ProfileError::Read { path: path.clone(), source })?;

        info!(path = %path, bytes = text.len(), "Profile loaded");
        Ok(Arc::from(text))
    }
}

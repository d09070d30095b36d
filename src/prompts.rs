// Nightshift — Prompt list loading and day/night text composition

use crate::config::TextConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("missing prompts file: {0}")]
    Missing(PathBuf),
    #[error("failed to read prompts file: {0}")]
    Read(#[from] std::io::Error),
    #[error("prompts file is empty: {0}")]
    Empty(PathBuf),
}

/// Read one prompt per line, trimming whitespace and dropping blank lines.
pub fn read_prompts(path: &Path) -> Result<Vec<String>, PromptError> {
    if !path.exists() {
        return Err(PromptError::Missing(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    Ok(parse_prompts(&content))
}

/// Like [`read_prompts`], but an empty list is an error.
pub fn load_prompts(path: &Path) -> Result<Vec<String>, PromptError> {
    let prompts = read_prompts(path)?;
    if prompts.is_empty() {
        return Err(PromptError::Empty(path.to_path_buf()));
    }
    tracing::debug!(path = %path.display(), count = prompts.len(), "Loaded prompts");
    Ok(prompts)
}

pub fn parse_prompts(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Day and night renderings of one scene prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVariants {
    pub day: String,
    pub night: String,
}

impl PromptVariants {
    pub fn compose(base: &str, text: &TextConfig) -> Self {
        Self {
            day: format!("{}, {}, {}", text.prefix, base, text.day_suffix),
            night: format!("{}, {}, {}", text.prefix, base, text.night_suffix),
        }
    }
}

// Nightshift — Resume checkpoint (file-based, atomic replace)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Index of the last prompt whose job fully left the queue.
///
/// `-1` means nothing has been completed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default = "default_last_done_index")]
    pub last_done_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_last_done_index() -> i64 {
    -1
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            last_done_index: default_last_done_index(),
            updated_at: None,
        }
    }
}

impl Checkpoint {
    /// Load the checkpoint, treating an absent or unreadable file as a fresh
    /// start.
    pub async fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match read_checkpoint(path).await {
            Ok(cp) => cp,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable progress file: {}", e);
                Self::default()
            }
        }
    }

    /// First prompt index that still needs processing.
    pub fn resume_index(&self) -> usize {
        usize::try_from(self.last_done_index.saturating_add(1)).unwrap_or(0)
    }

    /// Record `index` as completed.
    pub fn mark_done(&mut self, index: usize) {
        self.last_done_index = index as i64;
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }

    /// Persist the checkpoint by writing a temp file and renaming it over
    /// `path`.
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&tmp_path, &content).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        Ok(())
    }

    /// Remove the progress file. Returns whether a file was removed.
    pub async fn reset(path: &Path) -> anyhow::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn read_checkpoint(path: &Path) -> anyhow::Result<Checkpoint> {
    let content = tokio::fs::read_to_string(path).await?;
    let cp: Checkpoint = serde_json::from_str(&content)?;
    Ok(cp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_absent_file_means_fresh_start() {
        let tmp = TempDir::new().unwrap();
        let cp = Checkpoint::load(&tmp.path().join("progress.json")).await;
        assert_eq!(cp.last_done_index, -1);
        assert_eq!(cp.resume_index(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_means_fresh_start() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("progress.json");
        tokio::fs::write(&path, "{\"last_done_index\": ").await.unwrap();

        let cp = Checkpoint::load(&path).await;
        assert_eq!(cp, Checkpoint::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs").join("progress.json");

        let mut cp = Checkpoint::default();
        cp.mark_done(4);
        cp.save(&path).await.unwrap();

        let loaded = Checkpoint::load(&path).await;
        assert_eq!(loaded.last_done_index, 4);
        assert_eq!(loaded.resume_index(), 5);
        assert!(loaded.updated_at.is_some());

        // No temp file left behind
        assert!(!tmp.path().join("jobs").join("progress.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_reads_plain_index_object() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("progress.json");
        tokio::fs::write(&path, r#"{"last_done_index": 2, "note": "x"}"#)
            .await
            .unwrap();

        let cp = Checkpoint::load(&path).await;
        assert_eq!(cp.last_done_index, 2);
        assert_eq!(cp.updated_at, None);
    }

    #[tokio::test]
    async fn test_reset() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("progress.json");
        Checkpoint::default().save(&path).await.unwrap();

        assert!(Checkpoint::reset(&path).await.unwrap());
        assert!(!path.exists());
        assert!(!Checkpoint::reset(&path).await.unwrap());
    }

    #[test]
    fn test_resume_index_ignores_negative_garbage() {
        let cp = Checkpoint {
            last_done_index: -42,
            updated_at: None,
        };
        assert_eq!(cp.resume_index(), 0);
    }
}

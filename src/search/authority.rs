//! Per-document authority scores (PageRank-style prior)

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;

/// Score assumed for documents absent from the sidecar
pub const DEFAULT_AUTHORITY: f32 = 0.5;

/// Read-only authority-score table loaded from `doc_scores.json`
#[derive(Debug, Default)]
pub struct AuthorityScores {
    scores: HashMap<String, f32>,
}

impl AuthorityScores {
    /// Load the sidecar; an absent file yields an empty table where every
    /// document scores [`DEFAULT_AUTHORITY`]
    pub fn load(sidecar_dir: &Path) -> Result<Self> {
        let path = sidecar_dir.join("doc_scores.json");
        if !path.is_file() {
            info!("document scores not found, using default authority");
            return Ok(Self::default());
        }

        let scores: HashMap<String, f32> = serde_json::from_str(&fs::read_to_string(&path)?)?;
        info!(documents = scores.len(), "document authority scores loaded");
        Ok(Self { scores })
    }

    pub fn get(&self, doc_id: &str) -> f32 {
        self.scores.get(doc_id).copied().unwrap_or(DEFAULT_AUTHORITY)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl FromIterator<(String, f32)> for AuthorityScores {
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_for_unknown_doc() {
        let scores: AuthorityScores = [("PMC1".to_string(), 0.9f32)].into_iter().collect();
        assert_eq!(scores.get("PMC1"), 0.9);
        assert_eq!(scores.get("PMC2"), DEFAULT_AUTHORITY);
    }

    #[test]
    fn test_load_absent_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scores = AuthorityScores::load(dir.path()).unwrap();
        assert!(scores.is_empty());
        assert_eq!(scores.get("anything"), DEFAULT_AUTHORITY);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("doc_scores.json"),
            r#"{"PMC1": 0.75, "PMC2": 0.25}"#,
        )
        .unwrap();

        let scores = AuthorityScores::load(dir.path()).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get("PMC1"), 0.75);
    }
}

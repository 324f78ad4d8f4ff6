use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use rfq_form_spec::AnswerSet;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("form id '{0}' cannot be used as a draft key")]
    InvalidFormId(String),
    #[error("draft io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("draft at {path} is not valid json: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode draft: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Persists in-progress answer snapshots keyed by form id.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn save_draft(&self, form_id: &str, snapshot: &AnswerSet) -> Result<(), DraftError>;

    async fn load_draft(&self, form_id: &str) -> Result<Option<AnswerSet>, DraftError>;

    async fn discard_draft(&self, _form_id: &str) -> Result<(), DraftError> {
        Ok(())
    }
}

/// Process-local draft store.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: DashMap<String, AnswerSet>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn get(&self, form_id: &str) -> Option<AnswerSet> {
        self.drafts.get(form_id).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn save_draft(&self, form_id: &str, snapshot: &AnswerSet) -> Result<(), DraftError> {
        self.drafts.insert(form_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load_draft(&self, form_id: &str) -> Result<Option<AnswerSet>, DraftError> {
        Ok(self.get(form_id))
    }

    async fn discard_draft(&self, form_id: &str) -> Result<(), DraftError> {
        self.drafts.remove(form_id);
        Ok(())
    }
}

/// One `<form_id>.json` file per draft inside a directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    root: PathBuf,
}

impl FileDraftStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn draft_path(&self, form_id: &str) -> Result<PathBuf, DraftError> {
        let valid = !form_id.is_empty()
            && form_id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(DraftError::InvalidFormId(form_id.to_string()));
        }
        Ok(self.root.join(format!("{form_id}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DraftError + '_ {
    move |source| DraftError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn save_draft(&self, form_id: &str, snapshot: &AnswerSet) -> Result<(), DraftError> {
        let path = self.draft_path(form_id)?;
        let body = serde_json::to_vec_pretty(snapshot).map_err(DraftError::Encode)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error(&self.root))?;

        // Each write gets its own sibling file so overlapping saves of one
        // form never share a partial file; the last rename wins.
        let tmp = self
            .root
            .join(format!(".{form_id}.{}.json.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, body).await.map_err(io_error(&tmp))?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&path)(err));
        }
        debug!(form = form_id, path = %path.display(), "draft saved");
        Ok(())
    }

    async fn load_draft(&self, form_id: &str) -> Result<Option<AnswerSet>, DraftError> {
        let path = self.draft_path(form_id)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path)(err)),
        };
        let draft = serde_json::from_slice(&raw).map_err(|source| DraftError::Corrupt {
            path: path.clone(),
            source,
        })?;
        Ok(Some(draft))
    }

    async fn discard_draft(&self, form_id: &str) -> Result<(), DraftError> {
        let path = self.draft_path(form_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path)(err)),
        }
    }
}

//! Append-only JSONL media library.
//!
//! Each line is one [`LibraryEntry`]. The file is replayed on open to rebuild
//! the next record id and the blocked-source set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use vidbot_models::{ArtifactMetadata, RecordId};

use crate::collaborators::MediaLibrary;
use crate::error::{WorkerError, WorkerResult};

/// One line of the library file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LibraryEntry {
    Record {
        id: RecordId,
        created_at: DateTime<Utc>,
        metadata: ArtifactMetadata,
    },
    QueryLink {
        query_norm: String,
        record_id: RecordId,
    },
    Block {
        external_id: Option<String>,
        source_url: Option<String>,
    },
}

#[derive(Default)]
struct LibraryState {
    next_id: i64,
    blocked_ids: HashSet<String>,
    blocked_urls: HashSet<String>,
}

impl LibraryState {
    fn apply(&mut self, entry: &LibraryEntry) {
        match entry {
            LibraryEntry::Record { id, .. } => self.next_id = self.next_id.max(id.0 + 1),
            LibraryEntry::QueryLink { .. } => {}
            LibraryEntry::Block {
                external_id,
                source_url,
            } => {
                if let Some(id) = external_id {
                    self.blocked_ids.insert(id.clone());
                }
                if let Some(url) = source_url {
                    self.blocked_urls.insert(url.clone());
                }
            }
        }
    }
}

/// Media library persisted as JSON lines.
pub struct JsonlLibrary {
    path: PathBuf,
    state: Mutex<LibraryState>,
}

impl JsonlLibrary {
    /// Open (or create) the library at `path`.
    pub async fn open(path: impl AsRef<Path>) -> WorkerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut state = LibraryState {
            next_id: 1,
            ..Default::default()
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (lineno, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<LibraryEntry>(line) {
                        Ok(entry) => state.apply(&entry),
                        Err(e) => warn!(
                            path = %path.display(),
                            line = lineno + 1,
                            error = %e,
                            "Skipping malformed library line"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(path = %path.display(), next_id = state.next_id, "Opened media library");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Block a source by id, URL, or both.
    pub async fn block(&self, external_id: Option<&str>, source_url: Option<&str>) -> WorkerResult<()> {
        if external_id.is_none() && source_url.is_none() {
            return Err(WorkerError::library_failed("block needs an id or a URL"));
        }
        let entry = LibraryEntry::Block {
            external_id: external_id.map(String::from),
            source_url: source_url.map(String::from),
        };
        let mut state = self.state.lock().await;
        self.append(&entry).await?;
        state.apply(&entry);
        Ok(())
    }

    /// Every entry currently in the file.
    pub async fn entries(&self) -> WorkerResult<Vec<LibraryEntry>> {
        let _state = self.state.lock().await;
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(WorkerError::from))
            .collect()
    }

    async fn append(&self, entry: &LibraryEntry) -> WorkerResult<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl MediaLibrary for JsonlLibrary {
    async fn is_blocked(&self, external_id: &str, source_url: &str) -> WorkerResult<bool> {
        let state = self.state.lock().await;
        Ok((!external_id.is_empty() && state.blocked_ids.contains(external_id))
            || state.blocked_urls.contains(source_url))
    }

    async fn create_record(&self, metadata: &ArtifactMetadata) -> WorkerResult<RecordId> {
        let mut state = self.state.lock().await;
        let id = RecordId(state.next_id);
        let entry = LibraryEntry::Record {
            id,
            created_at: Utc::now(),
            metadata: metadata.clone(),
        };
        self.append(&entry).await?;
        state.apply(&entry);
        Ok(id)
    }

    async fn link_query(&self, query_norm: &str, record: RecordId) -> WorkerResult<()> {
        let _state = self.state.lock().await;
        self.append(&LibraryEntry::QueryLink {
            query_norm: query_norm.to_string(),
            record_id: record,
        })
        .await
    }
}

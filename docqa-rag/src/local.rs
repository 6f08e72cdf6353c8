//! Durable vector store kept in a local directory.
//!
//! Layout:
//!
//! ```text
//! <dir>/manifest.json   format version, embedding model, dimensions, created_at
//! <dir>/entries.jsonl   one serialized IndexEntry per line, append-only
//! ```
//!
//! The whole index is loaded into memory on open. Searches take a shared
//! read lock only; appends go to disk first, then become visible to search.
//!
//! A final line left incomplete by an interrupted append is dropped on open
//! and truncated away before the next append. Malformed lines anywhere else
//! are treated as corruption.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::document::{IndexEntry, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

const MANIFEST_FILE: &str = "manifest.json";
const ENTRIES_FILE: &str = "entries.jsonl";
const FORMAT_VERSION: u32 = 1;

/// Identity of an index: which embedding model produced its vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// On-disk format version.
    pub format_version: u32,
    /// Embedding model id used for every entry.
    pub embedding_model: String,
    /// Vector dimensionality of every entry.
    pub dimensions: usize,
    /// When the index was first created.
    pub created_at: DateTime<Utc>,
}

/// A persistent, append-only vector store.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::LocalVectorStore;
///
/// // ingestion
/// let store =
///     LocalVectorStore::create_or_open("storage/index", "text-embedding-3-small", 1536).await?;
/// // query serving
/// let store = LocalVectorStore::open("storage/index", "text-embedding-3-small").await?;
/// ```
#[derive(Debug)]
pub struct LocalVectorStore {
    dir: PathBuf,
    manifest: IndexManifest,
    entries: RwLock<Vec<IndexEntry>>,
    writer: Mutex<Tail>,
}

/// How `entries.jsonl` ends, as far as the next append is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    Clean,
    /// The last entry is complete but has no trailing newline.
    MissingNewline,
    /// Bytes from `valid_len` on are a partially written entry.
    Torn { valid_len: u64 },
}

impl LocalVectorStore {
    /// Open the index at `dir`, creating it if absent.
    ///
    ///
    /// An existing index with no entries is re-stamped with `dimensions`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if the directory cannot be created, the
    /// existing manifest names a different model, a non-empty index holds
    /// vectors of another dimension, or stored entries are corrupt.
    pub async fn create_or_open(
        dir: impl AsRef<Path>,
        embedding_model: &str,
        dimensions: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, "failed to create index directory", e))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
            let manifest = read_manifest(&manifest_path).await?;
            check_model(&manifest, embedding_model)?;
            manifest
        } else {
            let manifest = IndexManifest {
                format_version: FORMAT_VERSION,
                embedding_model: embedding_model.to_string(),
                dimensions,
                created_at: Utc::now(),
            };
            write_manifest(&manifest_path, &manifest).await?;
            info!(dir = %dir.display(), model = embedding_model, dimensions, "created index");
            manifest
        };

        let mut store = Self::load(dir, manifest).await?;
        if store.manifest.dimensions != dimensions {
            if !store.entries.get_mut().is_empty() {
                return Err(RagError::index(format!(
                    "index at {} holds {}-dimensional vectors, provider produces {dimensions}",
                    store.dir.display(),
                    store.manifest.dimensions
                )));
            }
            warn!(
                dir = %store.dir.display(),
                recorded = store.manifest.dimensions,
                dimensions,
                "index is empty, re-stamping manifest dimensions"
            );
            store.manifest.dimensions = dimensions;
            write_manifest(&manifest_path, &store.manifest).await?;
        }
        Ok(store)
    }

    /// Open an existing index read-for-query.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if the directory or manifest is missing,
    /// the manifest names a different embedding model, or entries are corrupt.
    pub async fn open(dir: impl AsRef<Path>, embedding_model: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(RagError::index(format!(
                "index directory {} does not exist",
                dir.display()
            )));
        }

        let manifest = read_manifest(&dir.join(MANIFEST_FILE)).await?;
        check_model(&manifest, embedding_model)?;
        Self::load(dir, manifest).await
    }

    async fn load(dir: PathBuf, manifest: IndexManifest) -> Result<Self> {
        let entries_path = dir.join(ENTRIES_FILE);
        let (entries, tail) = match tokio::fs::read(&entries_path).await {
            Ok(raw) => parse_entries(&entries_path, &raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Vec::new(), Tail::Clean),
            Err(e) => return Err(io_error(&entries_path, "failed to read entries", e)),
        };

        info!(dir = %dir.display(), entries = entries.len(), "opened index");
        Ok(Self { dir, manifest, entries: RwLock::new(entries), writer: Mutex::new(tail) })
    }

    /// The index manifest.
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// The index directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_dimensions(&self, len: usize, what: &str) -> Result<()> {
        if len != self.manifest.dimensions {
            return Err(RagError::index(format!(
                "{what} has {len} dimensions, index expects {}",
                self.manifest.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        for entry in &entries {
            self.check_dimensions(entry.embedding.len(), &format!("entry '{}'", entry.id))?;
        }

        let mut lines = String::new();
        for entry in &entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| RagError::index(format!("failed to serialize entry: {e}")))?;
            lines.push_str(&line);
            lines.push('\n');
        }

        let mut tail = self.writer.lock().await;
        let path = self.dir.join(ENTRIES_FILE);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, "failed to open entries for append", e))?;

        match *tail {
            Tail::Clean => {}
            Tail::MissingNewline => {
                file.write_all(b"\n")
                    .await
                    .map_err(|e| io_error(&path, "failed to terminate last entry", e))?;
            }
            Tail::Torn { valid_len } => {
                file.set_len(valid_len)
                    .await
                    .map_err(|e| io_error(&path, "failed to truncate partial entry", e))?;
                warn!(path = %path.display(), valid_len, "truncated partially written entry");
            }
        }
        *tail = Tail::Clean;

        let valid_len = file
            .metadata()
            .await
            .map_err(|e| io_error(&path, "failed to stat entries", e))?
            .len();
        let written = match file.write_all(lines.as_bytes()).await {
            Ok(()) => file.sync_data().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            *tail = Tail::Torn { valid_len };
            return Err(io_error(&path, "failed to append entries", e));
        }

        let count = entries.len();
        self.entries.write().await.extend(entries);
        debug!(dir = %self.dir.display(), count, "appended entries");
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.check_dimensions(embedding.len(), "query embedding")?;
        let entries = self.entries.read().await;
        Ok(rank(&entries, embedding, top_k))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

fn io_error(path: &Path, what: &str, e: std::io::Error) -> RagError {
    error!(path = %path.display(), error = %e, "{what}");
    RagError::index(format!("{what} ({}): {e}", path.display()))
}

fn check_model(manifest: &IndexManifest, embedding_model: &str) -> Result<()> {
    if manifest.embedding_model != embedding_model {
        return Err(RagError::index(format!(
            "index was built with embedding model '{}', refusing to use '{embedding_model}'",
            manifest.embedding_model
        )));
    }
    Ok(())
}

async fn read_manifest(path: &Path) -> Result<IndexManifest> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_error(path, "failed to read manifest", e))?;
    let manifest: IndexManifest = serde_json::from_str(&raw)
        .map_err(|e| RagError::index(format!("corrupt manifest {}: {e}", path.display())))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(RagError::index(format!(
            "unsupported index format version {} in {}",
            manifest.format_version,
            path.display()
        )));
    }
    Ok(manifest)
}

async fn write_manifest(path: &Path, manifest: &IndexManifest) -> Result<()> {
    let raw = serde_json::to_string_pretty(manifest)
        .map_err(|e| RagError::index(format!("failed to serialize manifest: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, raw).await.map_err(|e| io_error(&tmp, "failed to write manifest", e))?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| io_error(path, "failed to install manifest", e))
}

/// Parse `entries.jsonl`. Only an unterminated final line may be malformed;
/// it is the remains of an interrupted append and is skipped.
fn parse_entries(path: &Path, raw: &[u8]) -> Result<(Vec<IndexEntry>, Tail)> {
    let mut entries = Vec::new();
    let mut tail = Tail::Clean;
    let mut offset = 0u64;

    for (n, line) in raw.split_inclusive(|b| *b == b'\n').enumerate() {
        let start = offset;
        offset += line.len() as u64;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let terminated = line.ends_with(b"\n");
        match serde_json::from_slice::<IndexEntry>(line) {
            Ok(entry) => {
                entries.push(entry);
                if !terminated {
                    tail = Tail::MissingNewline;
                }
            }
            Err(e) if !terminated => {
                warn!(
                    path = %path.display(),
                    line = n + 1,
                    error = %e,
                    "ignoring partially written last entry"
                );
                tail = Tail::Torn { valid_len: start };
            }
            Err(e) => {
                return Err(RagError::index(format!(
                    "corrupt entry at {}:{}: {e}",
                    path.display(),
                    n + 1
                )));
            }
        }
    }

    Ok((entries, tail))
}

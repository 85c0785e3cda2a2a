use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatL2Index;
use crate::metadata::{EmbeddingCache, MetadataStore};
use crate::record::DocumentRecord;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

const INDEX_FILE: &str = "index.bin";
const METADATA_FILE: &str = "metadata.json";
const EMBEDDINGS_FILE: &str = "embeddings.bin";

/// Locations of the three persisted artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
    pub embeddings: PathBuf,
}

impl IndexPaths {
    /// Standard file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            index: dir.join(INDEX_FILE),
            metadata: dir.join(METADATA_FILE),
            embeddings: dir.join(EMBEDDINGS_FILE),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.index, &self.metadata, &self.embeddings]
    }
}

/// An immutable view of the index, metadata and embedding cache.
///
/// Position `i` refers to the same document in all three collections. The
/// embedding cache may be empty after loading an index whose cache was
/// missing or unusable; see [`IndexSnapshot::has_embeddings`].
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    index: FlatL2Index,
    metadata: MetadataStore,
    embeddings: EmbeddingCache,
}

impl IndexSnapshot {
    fn empty(dim: usize) -> Result<Self> {
        Ok(Self {
            index: FlatL2Index::new(dim)?,
            metadata: MetadataStore::new(),
            embeddings: EmbeddingCache::new(dim),
        })
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn embeddings(&self) -> &EmbeddingCache {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn record(&self, position: usize) -> Option<&DocumentRecord> {
        self.metadata.get(position)
    }

    /// Whether every indexed vector has a cached embedding
    pub fn has_embeddings(&self) -> bool {
        !self.embeddings.is_empty() && self.embeddings.len() == self.index.len()
    }
}

/// Owner of the aligned index triple.
///
/// Readers take an `Arc<IndexSnapshot>` that stays consistent for as long as
/// they hold it. Writers hold the lock across the whole triple-append and
/// copy-on-write, so outstanding snapshots never see a partial document.
pub struct IndexStore {
    paths: IndexPaths,
    dim: usize,
    state: RwLock<Arc<IndexSnapshot>>,
}

impl IndexStore {
    /// Create an empty store; nothing is read from disk
    pub fn new(paths: IndexPaths, dim: usize) -> Result<Self> {
        let snapshot = IndexSnapshot::empty(dim)?;
        Ok(Self {
            paths,
            dim,
            state: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Create a store and load any persisted state
    pub async fn open(paths: IndexPaths, dim: usize) -> Result<Self> {
        let store = Self::new(paths, dim)?;
        store.load().await?;
        Ok(store)
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Current consistent view of the index
    pub async fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.state.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.len()
    }

    /// Append one document to all three collections.
    ///
    /// The embedding length is checked before anything is touched, so a
    /// mismatch leaves the store unchanged.
    pub async fn add_document(
        &self,
        embedding: Vec<f32>,
        record: DocumentRecord,
    ) -> Result<usize> {
        if embedding.len() != self.dim {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dim,
                actual: embedding.len(),
            });
        }

        let mut guard = self.state.write().await;
        let snapshot = Arc::make_mut(&mut guard);

        let cache_aligned = snapshot.embeddings.len() == snapshot.index.len();
        let position = snapshot.index.add(&embedding)?;
        snapshot.metadata.append(record);
        if cache_aligned {
            snapshot.embeddings.push(&embedding)?;
        }

        debug!("Added document at position {position}");
        Ok(position)
    }

    /// Persist the current snapshot.
    ///
    /// Every artifact is first written and synced to a `.tmp` sibling, then
    /// renamed into place: embeddings, metadata and finally the index. A
    /// failed write leaves the previously saved files untouched.
    pub async fn save(&self) -> Result<()> {
        let snapshot = self.snapshot().await;

        if let Some(parent) = self.paths.index.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let keep_embeddings = snapshot.has_embeddings() || snapshot.is_empty();
        let embeddings = if keep_embeddings {
            let bytes = snapshot.embeddings.to_bytes()?;
            Some(write_temp(&self.paths.embeddings, &bytes).await?)
        } else {
            None
        };
        let metadata = write_temp(&self.paths.metadata, &snapshot.metadata.to_bytes()?).await?;
        let index = write_temp(&self.paths.index, &snapshot.index.to_bytes()?).await?;

        match embeddings {
            Some(tmp) => tokio::fs::rename(tmp, &self.paths.embeddings).await?,
            None => remove_if_exists(&self.paths.embeddings).await?,
        }
        tokio::fs::rename(metadata, &self.paths.metadata).await?;
        tokio::fs::rename(index, &self.paths.index).await?;

        info!(
            "Saved {} documents to {}",
            snapshot.len(),
            self.paths.index.display()
        );
        Ok(())
    }

    /// Replace the in-memory state with the persisted one.
    ///
    /// A missing index file yields an empty index. Files are read and checked
    /// before the swap, so a failed load leaves the current state in place.
    /// Returns the number of loaded documents.
    pub async fn load(&self) -> Result<usize> {
        let snapshot = self.read_snapshot().await?;
        let count = snapshot.len();
        *self.state.write().await = Arc::new(snapshot);
        info!("Loaded {count} documents");
        Ok(count)
    }

    /// Delete persisted artifacts and reset to an empty index.
    ///
    /// Missing files are not an error, so clearing twice is a no-op.
    pub async fn clear(&self) -> Result<()> {
        for path in self.paths.all() {
            remove_if_exists(path).await?;
            remove_if_exists(&temp_path(path)).await?;
        }
        *self.state.write().await = Arc::new(IndexSnapshot::empty(self.dim)?);
        info!("Cleared index");
        Ok(())
    }

    async fn read_snapshot(&self) -> Result<IndexSnapshot> {
        let Some(index_bytes) = read_if_exists(&self.paths.index).await? else {
            debug!(
                "No index at {}, starting empty",
                self.paths.index.display()
            );
            return IndexSnapshot::empty(self.dim);
        };

        let index = FlatL2Index::from_bytes(&index_bytes)?;
        if index.dimension() != self.dim {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dim,
                actual: index.dimension(),
            });
        }

        let metadata = match read_if_exists(&self.paths.metadata).await? {
            Some(bytes) => MetadataStore::from_bytes(&bytes)?,
            None => MetadataStore::new(),
        };
        if metadata.len() != index.len() {
            return Err(VectorStoreError::Misaligned {
                index: index.len(),
                metadata: metadata.len(),
            });
        }

        let embeddings = self.read_embeddings(index.len()).await?;

        Ok(IndexSnapshot {
            index,
            metadata,
            embeddings,
        })
    }

    async fn read_embeddings(&self, expected: usize) -> Result<EmbeddingCache> {
        let empty = EmbeddingCache::new(self.dim);
        let Some(bytes) = read_if_exists(&self.paths.embeddings).await? else {
            if expected > 0 {
                warn!("Embedding cache missing, cosine scores will use L2 distance");
            }
            return Ok(empty);
        };

        match EmbeddingCache::from_bytes(&bytes) {
            Ok(cache) if cache.dimension() == self.dim && cache.len() == expected => Ok(cache),
            Ok(cache) => {
                warn!(
                    "Discarding embedding cache of {} vectors (dim {}) that does not match {expected} indexed vectors",
                    cache.len(),
                    cache.dimension()
                );
                Ok(empty)
            }
            Err(e) => {
                warn!("Discarding unreadable embedding cache: {e}");
                Ok(empty)
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `bytes` to the `.tmp` sibling of `path` and sync it to disk
async fn write_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = temp_path(path);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(tmp)
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

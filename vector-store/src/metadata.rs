use crate::codec;
use crate::error::{Result, VectorStoreError};
use crate::record::DocumentRecord;

/// Ordered document records, aligned by position with the vector index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: Vec<DocumentRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: DocumentRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn get_all(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn get(&self, position: usize) -> Option<&DocumentRecord> {
        self.records.get(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first `n` records
    pub fn inspect(&self, n: usize) -> &[DocumentRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// JSON array of records
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.records)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let records = serde_json::from_slice(bytes)?;
        Ok(Self { records })
    }
}

/// Raw embeddings kept alongside the index for cosine re-scoring
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingCache {
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingCache {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn push(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn get(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        let end = start.checked_add(self.dim)?;
        self.data.get(start..end)
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self.dim, &self.data)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (dim, data) = codec::decode(bytes)?;
        Ok(Self { dim, data })
    }
}

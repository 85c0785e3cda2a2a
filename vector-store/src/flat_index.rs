use crate::codec;
use crate::distance::squared_l2;
use crate::error::{Result, VectorStoreError};

/// A neighbour returned by [`FlatL2Index::search`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the stored vector
    pub position: usize,

    /// Squared L2 distance to the query (lower is better)
    pub distance: f32,
}

/// Exact brute-force index over fixed-dimension vectors.
///
/// Vectors are stored contiguously in insertion order, so a vector's position
/// is its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Create an empty index of dimension `dim`
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(VectorStoreError::InvalidDimension(dim));
        }
        Ok(Self {
            dim,
            data: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, returning its position
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Exact k-nearest search by squared L2 distance.
    ///
    /// Results are sorted ascending by distance with ties broken by position,
    /// and contain `min(k, len)` entries.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimension(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Stored vector at `position`
    pub fn reconstruct(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        let end = start.checked_add(self.dim)?;
        self.data.get(start..end)
    }

    /// Copies of the first `n` stored vectors
    pub fn vectors(&self, n: usize) -> Vec<Vec<f32>> {
        self.data
            .chunks_exact(self.dim)
            .take(n)
            .map(<[f32]>::to_vec)
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self.dim, &self.data)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (dim, data) = codec::decode(bytes)?;
        if dim == 0 {
            return Err(VectorStoreError::CorruptIndex(
                "index dimension is zero".to_string(),
            ));
        }
        Ok(Self { dim, data })
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

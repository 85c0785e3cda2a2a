//! Binary snapshot of a flat vector collection, shared by the vector index
//! and the embedding cache. Encoded with `bincode`.

use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedVectors {
    version: u32,
    dim: u64,
    data: Vec<f32>,
}

pub(crate) fn encode(dim: usize, data: &[f32]) -> Result<Vec<u8>> {
    let persisted = PersistedVectors {
        version: FORMAT_VERSION,
        dim: dim as u64,
        data: data.to_vec(),
    };
    Ok(bincode::serialize(&persisted)?)
}

/// Decode a blob into `(dim, data)`; `data` always holds whole vectors.
pub(crate) fn decode(bytes: &[u8]) -> Result<(usize, Vec<f32>)> {
    let persisted: PersistedVectors = bincode::deserialize(bytes)
        .map_err(|e| VectorStoreError::CorruptIndex(e.to_string()))?;

    if persisted.version != FORMAT_VERSION {
        return Err(VectorStoreError::CorruptIndex(format!(
            "unsupported format version {}",
            persisted.version
        )));
    }

    let dim = usize::try_from(persisted.dim)
        .map_err(|e| VectorStoreError::CorruptIndex(e.to_string()))?;
    if dim == 0 && !persisted.data.is_empty() {
        return Err(VectorStoreError::CorruptIndex(
            "vectors stored with dimension zero".to_string(),
        ));
    }
    if dim > 0 && persisted.data.len() % dim != 0 {
        return Err(VectorStoreError::CorruptIndex(format!(
            "{} values do not split into vectors of dimension {dim}",
            persisted.data.len()
        )));
    }

    Ok((dim, persisted.data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_preserves_bits() {
        let data = vec![0.1f32, -0.0, f32::MIN_POSITIVE, 1e-30, 3.5, -7.25];
        let (dim, decoded) = decode(&encode(3, &data).unwrap()).unwrap();
        assert_eq!(dim, 3);
        let original_bits: Vec<u32> = data.iter().map(|v| v.to_bits()).collect();
        let decoded_bits: Vec<u32> = decoded.iter().map(|v| v.to_bits()).collect();
        assert_eq!(original_bits, decoded_bits);
    }

    #[test]
    fn test_decode_rejects_truncated_blob() {
        let mut bytes = encode(2, &[1.0, 2.0]).unwrap();
        bytes.pop();
        assert!(matches!(
            decode(&bytes),
            Err(VectorStoreError::CorruptIndex(_))
        ));
        assert!(decode(b"CR").is_err());
    }

    #[test]
    fn test_decode_rejects_partial_vector() {
        let bytes = encode(2, &[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(VectorStoreError::CorruptIndex(_))
        ));
    }

    #[test]
    fn test_decode_rejects_other_version() {
        let bytes = bincode::serialize(&PersistedVectors {
            version: FORMAT_VERSION + 1,
            dim: 1,
            data: vec![1.0],
        })
        .unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported format version"));
    }
}

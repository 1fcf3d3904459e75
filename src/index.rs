//! Vector index and document store.
//!
//! The corpus is persisted as two parallel files built offline:
//!
//! - a vector file: `n × dims` little-endian `f32` values, row `i` being the
//!   embedding of chunk `i`;
//! - a metadata file: a JSON array whose element `i` describes chunk `i`.
//!
//! Both are loaded once at startup and never mutated, so they are shared
//! across requests behind an `Arc` without locking.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::models::CorpusEntry;

/// Nearest-neighbour search over corpus vectors.
pub trait VectorIndex: Send + Sync {
    /// Vector dimensionality.
    fn dims(&self) -> usize;
    /// Number of indexed vectors.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Up to `top_k` `(distance, id)` pairs, sorted ascending by distance.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(f32, usize)>>;
}

/// Read-only lookup of chunk metadata by internal id.
pub trait DocumentStore: Send + Sync {
    fn get(&self, id: usize) -> Option<&CorpusEntry>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============ Flat L2 index ============

/// Exact index: every query is compared against every stored vector using
/// squared Euclidean distance.
pub struct FlatL2Index {
    dims: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Build from row vectors. All rows must have `dims` entries.
    pub fn new(dims: usize, rows: &[Vec<f32>]) -> Result<Self> {
        if dims == 0 {
            bail!("index dimensionality must be > 0");
        }
        let mut data = Vec::with_capacity(rows.len() * dims);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dims {
                bail!("vector {} has {} dims, expected {}", i, row.len(), dims);
            }
            data.extend_from_slice(row);
        }
        Ok(Self { dims, data })
    }

    /// Decode a vector file produced by [`vec_to_blob`] over all rows.
    pub fn from_bytes(dims: usize, bytes: &[u8]) -> Result<Self> {
        if dims == 0 {
            bail!("index dimensionality must be > 0");
        }
        let row_bytes = dims * 4;
        if bytes.len() % row_bytes != 0 {
            bail!(
                "vector file is {} bytes, not a multiple of {} ({} dims × 4)",
                bytes.len(),
                row_bytes,
                dims
            );
        }
        Ok(Self {
            dims,
            data: blob_to_vec(bytes),
        })
    }

    pub fn load(path: &Path, dims: usize) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read vector index: {}", path.display()))?;
        let index = Self::from_bytes(dims, &bytes)
            .with_context(|| format!("Invalid vector index: {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            vectors = index.len(),
            dims,
            "loaded vector index"
        );
        Ok(index)
    }

    fn row(&self, id: usize) -> &[f32] {
        &self.data[id * self.dims..(id + 1) * self.dims]
    }
}

impl VectorIndex for FlatL2Index {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.data.len() / self.dims
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(f32, usize)>> {
        if query.len() != self.dims {
            bail!(
                "query vector has {} dims, index expects {}",
                query.len(),
                self.dims
            );
        }

        let mut hits: Vec<(f32, usize)> = (0..self.len())
            .map(|id| (squared_l2(query, self.row(id)), id))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// ============ Corpus metadata ============

/// Chunk metadata held in memory, indexed by position.
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn new(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus metadata: {}", path.display()))?;
        let entries: Vec<CorpusEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse corpus metadata: {}", path.display()))?;
        tracing::info!(path = %path.display(), chunks = entries.len(), "loaded corpus metadata");
        Ok(Self { entries })
    }
}

impl DocumentStore for Corpus {
    fn get(&self, id: usize) -> Option<&CorpusEntry> {
        self.entries.get(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Encode vectors as little-endian `f32` bytes, the vector file format.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian `f32` bytes. Trailing bytes short of a full value are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

//! Immutable in-memory vector index with cosine search

pub mod store;

pub use store::{read_manifest, IndexManifest, MANIFEST_FILE, METADATA_FILE, VECTORS_FILE};

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{Chunk, IndexedVector};

/// Search result with chunk and similarity
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is better)
    pub similarity: f32,
    /// 1-based position in the result list
    pub rank: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Vector index built once per ingestion run, read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<Entry>,
}

impl VectorIndex {
    /// An index with no vectors; searching it yields nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from embedded chunks, keeping insertion order
    pub fn build(vectors: Vec<IndexedVector>) -> Result<Self> {
        let dimensions = vectors.first().map(|v| v.embedding.len()).unwrap_or(0);
        let mut seen = HashSet::with_capacity(vectors.len());
        let mut entries = Vec::with_capacity(vectors.len());

        for (position, item) in vectors.into_iter().enumerate() {
            if item.embedding.len() != dimensions || dimensions == 0 {
                return Err(Error::index(format!(
                    "vector {} has {} dimensions, expected {}",
                    position,
                    item.embedding.len(),
                    dimensions
                )));
            }
            if item.embedding.iter().any(|x| !x.is_finite()) {
                return Err(Error::index(format!(
                    "vector for chunk {} contains non-finite values",
                    item.chunk.id
                )));
            }
            if !seen.insert(item.chunk.id.clone()) {
                return Err(Error::index(format!("duplicate chunk id {}", item.chunk.id)));
            }

            let norm = l2_norm(&item.embedding);
            entries.push(Entry {
                chunk: item.chunk,
                vector: item.embedding,
                norm,
            });
        }

        Ok(Self {
            dimensions,
            entries,
        })
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimensions (0 for an empty index)
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Chunks in insertion order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Top `k` chunks by cosine similarity, best first.
    ///
    /// Equal similarities keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(Error::index(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine(query, query_norm, entry)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (position, similarity))| SearchResult {
                chunk: self.entries[position].chunk.clone(),
                similarity,
                rank: i + 1,
            })
            .collect())
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(query: &[f32], query_norm: f32, entry: &Entry) -> f32 {
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(&entry.vector).map(|(a, b)| a * b).sum();
    dot / (query_norm * entry.norm)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{ChunkId, SourceType};

    pub(crate) fn chunk(locator: &str, index: u32, source_type: SourceType) -> Chunk {
        let text = format!("chunk {} of {}", index, locator);
        Chunk {
            id: ChunkId::derive(locator, None, index as usize * 100),
            end: text.len(),
            text,
            source_type,
            locator: locator.to_string(),
            page: None,
            title: None,
            start: 0,
            index,
        }
    }

    pub(crate) fn vector(locator: &str, index: u32, embedding: Vec<f32>) -> IndexedVector {
        IndexedVector {
            chunk: chunk(locator, index, SourceType::Website),
            embedding,
        }
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = VectorIndex::build(vec![
            vector("https://a.test", 0, vec![0.0, 1.0]),
            vector("https://b.test", 0, vec![1.0, 0.0]),
            vector("https://c.test", 0, vec![0.7, 0.7]),
        ])
        .unwrap();

        let results = index.search(&[1.0, 0.1], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.locator, "https://b.test");
        assert_eq!(results[1].chunk.locator, "https://c.test");
        assert_eq!(results[0].rank, 1);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = VectorIndex::build(vec![
            vector("https://first.test", 0, vec![1.0, 0.0]),
            vector("https://second.test", 0, vec![2.0, 0.0]),
            vector("https://third.test", 0, vec![0.5, 0.0]),
        ])
        .unwrap();

        let results = index.search(&[1.0, 0.0], 5).unwrap();
        let order: Vec<_> = results.iter().map(|r| r.chunk.locator.as_str()).collect();
        assert_eq!(
            order,
            vec!["https://first.test", "https://second.test", "https://third.test"]
        );
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::build(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_build_rejects_inconsistent_dimensions() {
        let err = VectorIndex::build(vec![
            vector("https://a.test", 0, vec![1.0, 0.0]),
            vector("https://a.test", 1, vec![1.0, 0.0, 0.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[test]
    fn test_build_rejects_duplicate_ids() {
        let err = VectorIndex::build(vec![
            vector("https://a.test", 0, vec![1.0, 0.0]),
            vector("https://a.test", 0, vec![0.0, 1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = VectorIndex::build(vec![vector("https://a.test", 0, vec![1.0, 0.0])]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }
}

//! On-disk layout of a published index
//!
//! ```text
//! <index.path>/
//!   vectors.bin     bincode { dimensions, ids, vectors } in insertion order
//!   metadata.json   chunk_id -> chunk metadata
//!   manifest.json   { complete, chunk_count, dimensions, embedding_model, created_at }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkId, IndexedVector, SourceType};

use super::VectorIndex;

/// Binary vector artifact
pub const VECTORS_FILE: &str = "vectors.bin";
/// Chunk metadata store
pub const METADATA_FILE: &str = "metadata.json";
/// Completion marker, written last
pub const MANIFEST_FILE: &str = "manifest.json";

/// Describes a published index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Set only once every other file is written
    pub complete: bool,
    /// Number of vectors
    pub chunk_count: usize,
    /// Vector dimensions
    pub dimensions: usize,
    /// Model the vectors were produced with
    pub embedding_model: String,
    /// Publication time
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct VectorsFile {
    dimensions: usize,
    ids: Vec<ChunkId>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct ChunkMetadata {
    text: String,
    source_type: SourceType,
    locator: String,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    start: usize,
    end: usize,
    index: u32,
}

impl ChunkMetadata {
    fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source_type: chunk.source_type,
            locator: chunk.locator.clone(),
            page: chunk.page,
            title: chunk.title.clone(),
            start: chunk.start,
            end: chunk.end,
            index: chunk.index,
        }
    }

    fn into_chunk(self, id: ChunkId) -> Chunk {
        Chunk {
            id,
            text: self.text,
            source_type: self.source_type,
            locator: self.locator,
            page: self.page,
            title: self.title,
            start: self.start,
            end: self.end,
            index: self.index,
        }
    }
}

impl VectorIndex {
    /// Publish the index to `dir`, replacing any previous index there.
    ///
    /// Files are written to a temporary sibling directory that is renamed into
    /// place only after the manifest is written. On failure the temporary
    /// directory is removed and the previous index is left untouched.
    pub fn persist(&self, dir: &Path, embedding_model: &str) -> Result<IndexManifest> {
        let parent = match dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        let staging = parent.join(format!(".{}.tmp-{}", name, uuid::Uuid::new_v4()));

        let manifest = match self.write_files(&staging, embedding_model) {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        if let Err(e) = swap_into_place(&staging, dir, &parent, &name) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        tracing::info!(
            "Published index with {} vectors to {}",
            manifest.chunk_count,
            dir.display()
        );
        Ok(manifest)
    }

    fn write_files(&self, staging: &Path, embedding_model: &str) -> Result<IndexManifest> {
        fs::create_dir_all(staging)?;

        let vectors = VectorsFile {
            dimensions: self.dimensions,
            ids: self.entries.iter().map(|e| e.chunk.id.clone()).collect(),
            vectors: self.entries.iter().map(|e| e.vector.clone()).collect(),
        };
        let encoded = bincode::serde::encode_to_vec(&vectors, bincode::config::standard())
            .map_err(|e| Error::index(format!("failed to encode vectors: {}", e)))?;
        fs::write(staging.join(VECTORS_FILE), encoded)?;

        let metadata: BTreeMap<&ChunkId, ChunkMetadata> = self
            .entries
            .iter()
            .map(|e| (&e.chunk.id, ChunkMetadata::from_chunk(&e.chunk)))
            .collect();
        fs::write(
            staging.join(METADATA_FILE),
            serde_json::to_vec_pretty(&metadata)?,
        )?;

        let manifest = IndexManifest {
            complete: true,
            chunk_count: self.entries.len(),
            dimensions: self.dimensions,
            embedding_model: embedding_model.to_string(),
            created_at: Utc::now(),
        };
        fs::write(
            staging.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        Ok(manifest)
    }

    /// Load a published index, refusing anything not marked complete
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = read_manifest(dir)?;
        if !manifest.complete {
            return Err(Error::index(format!(
                "index at {} is incomplete; re-run ingestion",
                dir.display()
            )));
        }

        let raw = fs::read(dir.join(VECTORS_FILE))?;
        let (vectors, _): (VectorsFile, usize) =
            bincode::serde::decode_from_slice(&raw, bincode::config::standard())
                .map_err(|e| Error::index(format!("failed to decode vectors: {}", e)))?;

        if vectors.ids.len() != vectors.vectors.len() || vectors.ids.len() != manifest.chunk_count
        {
            return Err(Error::index(format!(
                "vector artifact holds {} ids and {} vectors, manifest says {}",
                vectors.ids.len(),
                vectors.vectors.len(),
                manifest.chunk_count
            )));
        }

        let mut metadata: BTreeMap<ChunkId, ChunkMetadata> =
            serde_json::from_slice(&fs::read(dir.join(METADATA_FILE))?)?;

        let items = vectors
            .ids
            .into_iter()
            .zip(vectors.vectors)
            .enumerate()
            .map(|(position, (id, embedding))| {
                let meta = metadata.remove(&id).ok_or_else(|| {
                    Error::index(format!(
                        "metadata store has no entry for vector {} ({})",
                        position, id
                    ))
                })?;
                Ok(IndexedVector {
                    chunk: meta.into_chunk(id),
                    embedding,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let index = Self::build(items)?;
        if !index.is_empty() && index.dimensions != vectors.dimensions {
            return Err(Error::index(format!(
                "vectors have {} dimensions, artifact header says {}",
                index.dimensions, vectors.dimensions
            )));
        }

        tracing::info!(
            "Loaded index with {} vectors ({} model) from {}",
            index.len(),
            manifest.embedding_model,
            dir.display()
        );
        Ok(index)
    }
}

/// Read the manifest of a published index
pub fn read_manifest(dir: &Path) -> Result<IndexManifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(Error::index(format!(
            "no index manifest at {}; run ingestion first",
            path.display()
        )));
    }
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

fn swap_into_place(staging: &Path, dir: &Path, parent: &Path, name: &str) -> Result<()> {
    if !dir.exists() {
        fs::rename(staging, dir)?;
        return Ok(());
    }

    let retired = parent.join(format!(".{}.old-{}", name, uuid::Uuid::new_v4()));
    fs::rename(dir, &retired)?;
    if let Err(e) = fs::rename(staging, dir) {
        let _ = fs::rename(&retired, dir);
        return Err(e.into());
    }
    if let Err(e) = fs::remove_dir_all(&retired) {
        tracing::warn!("Could not remove previous index {}: {}", retired.display(), e);
    }
    Ok(())
}

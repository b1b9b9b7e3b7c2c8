//! Domain types shared by the chunker, the indexes and the retriever.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// Source format reported by the extraction step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    #[serde(rename = "PDF")]
    Pdf,
    Word,
    Excel,
    #[default]
    Unknown,
}

impl FileType {
    /// Maps a file extension (without the dot, any case) to its format.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Word,
            "xlsx" | "xls" => Self::Excel,
            _ => Self::Unknown,
        }
    }

    /// Parses the label used at the extraction boundary (`"PDF"`, `"Word"`, ...).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "word" => Self::Word,
            "excel" => Self::Excel,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Word => "Word",
            Self::Excel => "Excel",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted source file. Consumed once by the chunker, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    #[serde(default, deserialize_with = "file_type_label")]
    pub file_type: FileType,
    #[serde(alias = "raw_text")]
    pub content: String,
}

fn file_type_label<'de, D>(deserializer: D) -> Result<FileType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let label = String::deserialize(deserializer)?;
    Ok(FileType::from_label(&label))
}

/// Per-chunk metadata stored next to the vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub filename: String,
    pub file_type: FileType,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Smallest retrieval unit. `0 <= chunk_index < total_chunks` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Identity key, unique across the whole collection.
    pub fn id(&self) -> ChunkId {
        chunk_id(&self.metadata.filename, self.metadata.chunk_index)
    }
}

pub fn chunk_id(filename: &str, chunk_index: usize) -> ChunkId {
    format!("{filename}_{chunk_index}")
}

/// A chunk as read back from the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Nearest-neighbour hit from the embedding index. Lower distance is closer.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk: StoredChunk,
    pub distance: f32,
}

/// Lexical hit; `score` is always positive.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    pub chunk: StoredChunk,
    pub score: u32,
}

/// Fused, per-query result handed to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
    pub keyword_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl SearchResult {
    pub fn to_context(&self) -> ContextPassage {
        ContextPassage {
            content: self.content.clone(),
            metadata: ContextMetadata {
                filename: self.metadata.filename.clone(),
                chunk_index: self.metadata.chunk_index,
                total_chunks: self.metadata.total_chunks,
            },
            distance: self.distance,
            keyword_score: self.keyword_score,
            rerank_score: self.rerank_score,
        }
    }
}

/// Record handed to the answer generator. Only `content` and
/// `metadata.filename` are meaningful to it; the rest is diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPassage {
    pub content: String,
    pub metadata: ContextMetadata,
    pub distance: f32,
    pub keyword_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub filename: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::{Chunk, ChunkMetadata, Document, FileType};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive regular chunks.
    pub overlap: usize,
    /// Label suffix identifying an atomic table block, e.g. `【診療部の勤務時間】`.
    pub table_marker_suffix: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 800, overlap: 150, table_marker_suffix: "の勤務時間".to_string() }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits extracted text into retrieval passages.
///
/// Table blocks (a `【<label><suffix>】` marker up to the next `【` or the end
/// of text) are emitted first, whole and in source order. The remaining text
/// is cut into `chunk_size` windows that end on the last newline or sentence
/// stop past the window midpoint, overlapping by `overlap` characters.
pub struct Chunker {
    config: ChunkingConfig,
    table_block: Regex,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        let pattern = format!("【[^】]*{}】[^【]*", regex::escape(&config.table_marker_suffix));
        let table_block = Regex::new(&pattern).with_context(|| format!("invalid table marker pattern: {pattern}"))?;
        Ok(Self { config, table_block })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks: Vec<String> = self
            .table_block
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let remainder = self.table_block.replace_all(text, "");
        chunks.extend(self.split_fixed(&remainder));
        chunks
    }

    fn split_fixed(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let size = self.config.chunk_size;
        let mut out = Vec::new();
        let mut start = 0usize;
        while start < len {
            let mut end = (start + size).min(len);
            if end < len {
                if let Some(brk) = last_break(&chars[start..end]) {
                    if brk as f64 > size as f64 * 0.5 {
                        end = start + brk + 1;
                    }
                }
            }
            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                out.push(piece.to_string());
            }
            if end >= len {
                break;
            }
            start = end.saturating_sub(self.config.overlap).max(start + 1);
        }
        out
    }
}

/// Offset of the last newline, `。`, or `.` followed by a space.
fn last_break(window: &[char]) -> Option<usize> {
    (0..window.len()).rev().find(|&i| match window[i] {
        '\n' | '。' => true,
        '.' => window.get(i + 1) == Some(&' '),
        _ => false,
    })
}

/// Turns extracted documents into indexed chunks.
pub struct DataProcessor {
    chunker: Chunker,
}

impl DataProcessor {
    pub fn new() -> Result<Self> { Self::with_config(ChunkingConfig::default()) }

    pub fn with_config(config: ChunkingConfig) -> Result<Self> {
        Ok(Self { chunker: Chunker::new(config)? })
    }

    pub fn chunker(&self) -> &Chunker { &self.chunker }

    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let pieces = self.chunker.chunk(&doc.content);
        let total_chunks = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                metadata: ChunkMetadata {
                    filename: doc.filename.clone(),
                    file_type: doc.file_type,
                    chunk_index,
                    total_chunks,
                },
            })
            .collect()
    }

    /// Chunks a corpus load. Documents with blank content are skipped; when a
    /// filename repeats, the last document with that name wins so chunk ids
    /// stay unique.
    pub fn process_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        let mut last_by_name: HashMap<&str, usize> = HashMap::new();
        for (i, doc) in docs.iter().enumerate() {
            if let Some(prev) = last_by_name.insert(doc.filename.as_str(), i) {
                warn!(filename = %doc.filename, replaced = prev, "duplicate filename in corpus load; keeping the later document");
            }
        }
        let mut all_chunks = Vec::new();
        for (i, doc) in docs.iter().enumerate() {
            if last_by_name.get(doc.filename.as_str()) != Some(&i) {
                continue;
            }
            if doc.content.trim().is_empty() {
                warn!(filename = %doc.filename, "no text extracted; skipping");
                continue;
            }
            let chunks = self.chunk_document(doc);
            debug!(filename = %doc.filename, chunks = chunks.len(), "chunked document");
            all_chunks.extend(chunks);
        }
        info!("Processed {} documents into {} chunks", last_by_name.len(), all_chunks.len());
        all_chunks
    }
}

/// Loads plain-text extracts named `<original filename>.txt` from `dir`.
///
/// `就業規則.docx.txt` becomes a `Word` document named `就業規則.docx`.
/// Unreadable and blank files are logged and skipped.
pub fn load_extracted_dir(dir: &Path) -> Result<Vec<Document>> {
    if !dir.exists() {
        return Err(Error::NotFound(format!("document directory {}", dir.display())).into());
    }
    let mut docs = Vec::new();
    for path in list_txt_files(dir) {
        let content = match read_file_content(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read extract; skipping");
                continue;
            }
        };
        if content.trim().is_empty() {
            warn!(path = %path.display(), "empty extract; skipping");
            continue;
        }
        let Some(filename) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else { continue };
        let file_type = Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .map_or(FileType::Unknown, FileType::from_extension);
        docs.push(Document { filename, file_type, content });
    }
    info!("Loaded {} documents from {}", docs.len(), dir.display());
    Ok(docs)
}

/// Loads `{filename, content, file_type}` records, one JSON object per line.
/// Malformed lines and blank documents are logged and skipped.
pub fn load_jsonl(path: &Path) -> Result<Vec<Document>> {
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut docs = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Document>(&line) {
            Ok(doc) if doc.content.trim().is_empty() => {
                warn!(filename = %doc.filename, "no text extracted; skipping");
            }
            Ok(doc) => docs.push(doc),
            Err(e) => warn!(line = lineno + 1, error = %e, "malformed document record; skipping"),
        }
    }
    info!("Loaded {} documents from {}", docs.len(), path.display());
    Ok(docs)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    txt_files.sort();
    txt_files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig { chunk_size: size, overlap, ..ChunkingConfig::default() }).expect("chunker")
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(chunker(800, 150).chunk("就業規則\n第1条 目的"), vec!["就業規則\n第1条 目的"]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(chunker(800, 150).chunk("  \n\n ").is_empty());
    }

    #[test]
    fn table_blocks_come_first_then_regular_text() {
        let text = "前文です。\n【診療部の勤務時間】\n日勤 8:30〜17:00\n【看護部門の勤務時間】\n夜勤 16:30〜9:00\n【表】後文";
        let chunks = chunker(800, 150).chunk(text);
        assert_eq!(chunks[0], "【診療部の勤務時間】\n日勤 8:30〜17:00");
        assert_eq!(chunks[1], "【看護部門の勤務時間】\n夜勤 16:30〜9:00");
        assert_eq!(chunks[2], "前文です。\n【表】後文");
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn other_bracket_labels_are_not_tables() {
        let chunks = chunker(800, 150).chunk("【第1章 総則】この規則は…");
        assert_eq!(chunks, vec!["【第1章 総則】この規則は…"]);
    }

    #[test]
    fn table_block_survives_any_chunk_size() {
        let table = format!("【薬局の勤務時間】\n{}", "早番 8:00〜16:30\n".repeat(40).trim_end());
        let text = format!("{}\n{}\n【附則】{}", "規程本文。".repeat(60), table, "附則。".repeat(60));
        for (size, overlap) in [(20, 5), (100, 30), (800, 150), (5000, 10)] {
            let chunks = chunker(size, overlap).chunk(&text);
            assert_eq!(chunks.iter().filter(|c| **c == table).count(), 1, "size={size}");
            assert_eq!(chunks[0], table);
            assert!(chunks[1..].iter().all(|c| !c.contains("の勤務時間】")));
        }
    }

    #[test]
    fn cuts_on_last_sentence_stop_after_midpoint() {
        // 10-char sentences; window of 25 should end after the second stop (offset 19).
        let text = "あいうえおかきくけ。".repeat(5);
        let chunks = chunker(25, 5).chunk(&text);
        assert_eq!(chunks[0].chars().count(), 20);
        assert!(chunks[0].ends_with('。'));
        // Next window starts `overlap` characters before the previous end.
        assert!(chunks[1].starts_with("かきくけ。"));
    }

    #[test]
    fn falls_back_to_hard_cut_without_late_breakpoint() {
        let text = "あ。".to_string() + &"い".repeat(100);
        let chunks = chunker(40, 10).chunk(&text);
        assert_eq!(chunks[0].chars().count(), 40);
    }

    #[test]
    fn half_width_period_needs_following_space() {
        let window: Vec<char> = "a.b. c".chars().collect();
        assert_eq!(last_break(&window), Some(3));
        let window: Vec<char> = "v1.2".chars().collect();
        assert_eq!(last_break(&window), None);
    }

    #[test]
    fn regular_chunks_cover_the_whole_text() {
        let text: String = (0..500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunker(100, 20).chunk(&text);
        assert_eq!(chunks[0], text[..100]);
        assert!(text.ends_with(chunks.last().expect("last chunk").as_str()));
        for pair in chunks.windows(2) {
            assert_eq!(&pair[0][pair[0].len() - 20..], &pair[1][..20]);
        }
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let err = Chunker::new(ChunkingConfig { chunk_size: 100, overlap: 100, ..ChunkingConfig::default() });
        assert!(err.is_err());
    }

    #[test]
    fn chunk_document_numbers_chunks() {
        let processor = DataProcessor::with_config(ChunkingConfig { chunk_size: 30, overlap: 5, ..ChunkingConfig::default() })
            .expect("processor");
        let doc = Document {
            filename: "規程.docx".into(),
            file_type: FileType::Word,
            content: "第一条。".repeat(30),
        };
        let chunks = processor.chunk_document(&doc);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.metadata.chunk_index, i);
            assert_eq!(c.metadata.total_chunks, chunks.len());
            assert_eq!(c.id(), format!("規程.docx_{i}"));
        }
    }
}

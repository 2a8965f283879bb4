use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{Document, Passage};

/// Separator placed between documents when building the fallback context.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum passage length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive passages of the same document.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

/// Reads every recognized text file under a directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    extensions: Vec<String>,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::with_extensions(["txt", "md"])
    }
}

impl DocumentLoader {
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { extensions }
    }

    pub fn load_dir(&self, data_dir: &Path) -> Result<Vec<Document>> {
        let meta = fs::metadata(data_dir).map_err(|e| Error::load(data_dir, e))?;
        if !meta.is_dir() {
            return Err(Error::load(
                data_dir,
                io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        // Only the root is fatal; unreadable entries below it are skipped.
        let mut documents = Vec::new();
        let mut skipped = 0usize;
        for entry in walkdir::WalkDir::new(data_dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let path = e.path().unwrap_or(data_dir).to_path_buf();
                    return Err(Error::load(path, io::Error::from(e)));
                }
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "skipping unreadable entry");
                    skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_recognized(entry.path()) {
                continue;
            }
            let content = match read_file_content(entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable document");
                    skipped += 1;
                    continue;
                }
            };
            let id = relative_id(entry.path(), data_dir);
            debug!(doc_id = %id, chars = content.chars().count(), "loaded document");
            documents.push(Document { id, content });
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        info!(count = documents.len(), skipped, dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    fn is_recognized(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            let bytes = fs::read(file_path).map_err(|e| Error::load(file_path, e))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Err(e) => Err(Error::load(file_path, e)),
    }
}

fn relative_id(path: &Path, data_dir: &Path) -> String {
    let relative = path.strip_prefix(data_dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits documents into fixed-size overlapping passages.
///
/// Sizes are counted in characters so a passage never splits a code point.
/// The window advances by `chunk_size - chunk_overlap`; the last passage of a
/// document ends exactly at the end of its text and may be shorter.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { chunk_size: config.chunk_size, overlap: config.chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Passage> {
        let text = document.content.as_str();
        // bounds[i] is the byte offset of char i; the last entry is text.len().
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = bounds.len() - 1;
        if char_count == 0 {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            spans.push((start, end));
            if end == char_count {
                break;
            }
            start = end - self.overlap;
        }

        let total_chunks = spans.len();
        spans
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| Passage {
                id: format!("{}:{}", document.id, chunk_index),
                doc_id: document.id.clone(),
                content: text[bounds[start]..bounds[end]].to_string(),
                offset: start,
                chunk_index,
                total_chunks,
            })
            .collect()
    }

    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Passage> {
        documents.iter().flat_map(|d| self.chunk_document(d)).collect()
    }
}

/// Concatenation of every document's text, used when no index is available.
pub fn fallback_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// Output of one pass over the data directory.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub passages: Vec<Passage>,
}

pub struct DataProcessor {
    loader: DocumentLoader,
    chunker: Chunker,
}

impl DataProcessor {
    pub fn new(loader: DocumentLoader, chunker: Chunker) -> Self {
        Self { loader, chunker }
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Corpus> {
        let documents = self.loader.load_dir(data_dir)?;
        let passages = self.chunker.chunk_all(&documents);
        info!(
            documents = documents.len(),
            passages = passages.len(),
            chunk_size = self.chunker.chunk_size,
            overlap = self.chunker.overlap,
            "chunked documents"
        );
        Ok(Corpus { documents, passages })
    }
}

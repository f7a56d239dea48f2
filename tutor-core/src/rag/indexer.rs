//! Curriculum file collection and text chunking for ingestion.
//!
//! Page boundaries are form feeds (`\x0c`), which is what `pdftotext` and
//! most text exporters emit between pages. Each page is then split into
//! overlapping chunks.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Extensions picked up when ingesting a directory.
const INDEXABLE_EXTENSIONS: &[&str] = &["txt", "md"];

const PAGE_BREAK: char = '\x0c';

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexerError>;

/// A piece of page text with its 1-based page number and 0-based position
/// within that page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    pub page_number: i64,
    pub chunk_number: i64,
    pub text: String,
}

/// Splits text on form feeds into pages, numbered from 1.
///
/// Pages that are blank after trimming are dropped but still consume a page
/// number, so numbering matches the source document.
pub fn split_pages(text: &str) -> Vec<(i64, &str)> {
    text.split(PAGE_BREAK)
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| (i as i64 + 1, page))
        .collect()
}

/// Splits text into overlapping chunks of at most `chunk_size` bytes.
///
/// Chunk edges are moved to the nearest UTF-8 character boundary so multi-byte
/// characters are never split.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        // chunk_size smaller than one character
        if end == start {
            end = start + 1;
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }

        chunks.push(text[start..end].to_string());

        if end == text.len() {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { start + 1 };
        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
    }

    chunks
}

/// Splits a whole document into page-tagged chunks.
///
/// Chunks are trimmed; whitespace-only chunks are dropped.
pub fn chunk_document(text: &str, chunk_size: usize, overlap: usize) -> Vec<PageChunk> {
    let mut out = Vec::new();
    for (page_number, page) in split_pages(text) {
        let pieces = chunk_text(page.trim(), chunk_size, overlap);
        let mut chunk_number = 0;
        for piece in pieces {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            out.push(PageChunk {
                page_number,
                chunk_number,
                text: piece.to_string(),
            });
            chunk_number += 1;
        }
    }
    out
}

/// A curriculum file read from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

/// Collects indexable files under `path`, or `path` itself if it is a file.
///
/// Hidden entries are skipped when walking a directory. Unreadable or
/// non-UTF-8 files are logged and skipped. Results are sorted by path so
/// ingestion order is deterministic.
pub async fn collect_files(path: impl AsRef<Path>) -> Result<Vec<SourceFile>> {
    let path = path.as_ref();
    let mut files = Vec::new();

    if fs::metadata(path).await?.is_file() {
        let content = fs::read_to_string(path).await?;
        files.push(SourceFile {
            path: path.to_path_buf(),
            content,
        });
        return Ok(files);
    }

    collect_files_recursive(path, &mut files).await?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(root = %path.display(), files = files.len(), "Collected curriculum files");
    Ok(files)
}

fn collect_files_recursive<'a>(
    dir: &'a Path,
    files: &'a mut Vec<SourceFile>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if is_hidden(&path) {
                continue;
            }

            if entry.file_type().await?.is_dir() {
                collect_files_recursive(&path, files).await?;
            } else if is_indexable(&path) {
                match fs::read_to_string(&path).await {
                    Ok(content) => files.push(SourceFile { path, content }),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
                }
            }
        }

        Ok(())
    })
}

fn is_indexable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| INDEXABLE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Document id for a file: its stem, or the full path when there is none.
pub fn document_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

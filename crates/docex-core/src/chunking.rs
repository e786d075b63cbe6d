//! Recursive text chunking for documents too long for one model call.
//!
//! Text is split at the coarsest separator that occurs in it (paragraphs,
//! then lines, then spaces, then single characters). Pieces that are still
//! too long are split again with the finer separators, and the resulting
//! pieces are greedily merged back into chunks of at most `chunk_size`
//! characters. When a chunk is emitted, its trailing pieces (up to
//! `chunk_overlap` characters) start the next chunk.

use std::collections::VecDeque;

use tracing::debug;

/// Separators in order of preference. The empty separator means a hard cut
/// between characters.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Splits text into bounded, overlapping chunks.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a chunker. The overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks.
    ///
    /// Text that already fits is returned unchanged as the only chunk.
    /// Blank text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let chunks = self.split_recursive(text, SEPARATORS);
        debug!(
            "Split {} chars into {} chunks (size {}, overlap {})",
            char_len(text),
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }

            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }

        chunks
    }

    /// Greedily join pieces with `separator` into chunks no longer than
    /// `chunk_size`, carrying up to `chunk_overlap` characters forward.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joined_sep = if current.is_empty() { 0 } else { sep_len };

            if total + len + joined_sep > self.chunk_size && !current.is_empty() {
                push_chunk(&mut chunks, &current, separator);

                while total > self.chunk_overlap
                    || (total > 0 && total + len + sep_len > self.chunk_size)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(first);
                    if !current.is_empty() {
                        total -= sep_len;
                    }
                }
            }

            if !current.is_empty() {
                total += sep_len;
            }
            current.push_back(piece);
            total += len;
        }

        push_chunk(&mut chunks, &current, separator);
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, pieces: &VecDeque<&str>, separator: &str) {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

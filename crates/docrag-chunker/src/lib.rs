//! Deterministic overlapping passage splitter for docrag.
//!
//! [`OverlapChunker`] turns free-form text into ordered passages bounded by a
//! target size. Splitting is pure logic with no I/O: identical input and
//! configuration always produce identical passages.
//!
//! The policy:
//! - text within `chunk_size` characters becomes a single passage;
//! - otherwise paragraphs (blank-line boundaries) are accumulated into a
//!   buffer and flushed when the next paragraph would overflow;
//! - a paragraph longer than `chunk_size` is split again on sentence
//!   boundaries with the same accumulate/flush policy;
//! - each passage after the first is prefixed with the trailing `overlap`
//!   characters of the previous passage, giving retrieval boundary context.

use docrag_core::ChunkError;
use tracing::debug;

/// Default passage size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap carried between consecutive passages.
pub const DEFAULT_OVERLAP: usize = 200;

/// Configuration for the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Target passage size in characters
    pub chunk_size: usize,
    /// Characters of the previous passage prepended to the next one
    pub overlap: usize,
}

impl ChunkConfig {
    /// Create a validated configuration.
    ///
    /// `chunk_size` must be positive and `overlap` strictly smaller than
    /// `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Splits text into overlapping passages.
#[derive(Debug, Clone, Default)]
pub struct OverlapChunker {
    config: ChunkConfig,
}

impl OverlapChunker {
    /// Create a chunker with the given configuration.
    #[must_use]
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Split text into ordered passages.
    ///
    /// Empty or whitespace-only input produces zero passages; input within
    /// `chunk_size` characters produces exactly one passage equal to the
    /// trimmed text. Every passage is at most `chunk_size + overlap`
    /// characters long.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.replace("\r\n", "\n");
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if char_len(trimmed) <= self.config.chunk_size {
            return vec![trimmed.to_string()];
        }

        let mut passages = Vec::new();
        let mut buffer = String::new();

        for paragraph in trimmed.split("\n\n").map(str::trim) {
            if paragraph.is_empty() {
                continue;
            }

            if char_len(paragraph) > self.config.chunk_size {
                flush(&mut buffer, &mut passages);
                self.split_sentences(paragraph, &mut passages);
                continue;
            }

            if !buffer.is_empty()
                && char_len(&buffer) + 2 + char_len(paragraph) > self.config.chunk_size
            {
                flush(&mut buffer, &mut passages);
            }

            if !buffer.is_empty() {
                buffer.push_str("\n\n");
            }
            buffer.push_str(paragraph);
        }
        flush(&mut buffer, &mut passages);

        debug!(
            passages = passages.len(),
            chars = char_len(trimmed),
            "split text"
        );

        self.apply_overlap(passages)
    }

    /// Accumulate sentences of an oversized paragraph into passages.
    fn split_sentences(&self, paragraph: &str, passages: &mut Vec<String>) {
        let mut buffer = String::new();

        for sentence in split_sentence_units(paragraph) {
            if char_len(&sentence) > self.config.chunk_size {
                // A single run-on sentence still has to respect the bound.
                flush(&mut buffer, passages);
                hard_split(&sentence, self.config.chunk_size, passages);
                continue;
            }

            if !buffer.is_empty()
                && char_len(&buffer) + 1 + char_len(&sentence) > self.config.chunk_size
            {
                flush(&mut buffer, passages);
            }

            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(&sentence);
        }
        flush(&mut buffer, passages);
    }

    /// Prefix each passage after the first with the tail of its predecessor.
    fn apply_overlap(&self, raw: Vec<String>) -> Vec<String> {
        if self.config.overlap == 0 {
            return raw;
        }

        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for passage in raw {
            let passage = match out.last() {
                Some(prev) => format!("{}{passage}", char_suffix(prev, self.config.overlap)),
                None => passage,
            };
            out.push(passage);
        }
        out
    }
}

/// Number of characters (not bytes) in a string.
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The trailing `n` characters of a string, char-safe.
fn char_suffix(s: &str, n: usize) -> String {
    let skip = char_len(s).saturating_sub(n);
    s.chars().skip(skip).collect()
}

/// Move the buffer into the passage list if it holds anything.
fn flush(buffer: &mut String, passages: &mut Vec<String>) {
    if !buffer.is_empty() {
        passages.push(std::mem::take(buffer));
    }
}

/// Split a paragraph into sentence units on `.`/`!`/`?` + whitespace.
///
/// The terminator stays with its sentence; text without a final terminator
/// becomes the last unit.
fn split_sentence_units(paragraph: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            let unit = current.trim().to_string();
            if !unit.is_empty() {
                units.push(unit);
            }
            current.clear();
        }
    }

    let unit = current.trim().to_string();
    if !unit.is_empty() {
        units.push(unit);
    }
    units
}

/// Split an oversized sentence at fixed character boundaries.
fn hard_split(sentence: &str, chunk_size: usize, passages: &mut Vec<String>) {
    let chars: Vec<char> = sentence.chars().collect();
    for piece in chars.chunks(chunk_size) {
        let piece: String = piece.iter().collect();
        let piece = piece.trim().to_string();
        if !piece.is_empty() {
            passages.push(piece);
        }
    }
}

//! Deterministic text chunking for bounded-size classification requests.
//!
//! Policy text is split on paragraph boundaries and greedily packed into
//! chunks sized for one classification call each. Chunk boundaries never
//! fall mid-paragraph, so no sentence is ever split; a single paragraph
//! longer than the upper bound is emitted whole as one oversized chunk.

use serde::{Deserialize, Serialize};

/// Fixed token approximation: no real tokenizer dependency.
const CHARS_PER_TOKEN: usize = 4;

/// Chunk size bounds, expressed in approximate tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Lower bound: a chunk is not flushed before reaching this size.
    pub min_tokens: usize,

    /// Upper bound: appending a paragraph that would cross this size
    /// flushes first (once the lower bound is met).
    pub max_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_tokens: 1500,
            max_tokens: 2000,
        }
    }
}

impl ChunkerConfig {
    fn min_chars(&self) -> usize {
        self.min_tokens * CHARS_PER_TOKEN
    }

    fn max_chars(&self) -> usize {
        self.max_tokens * CHARS_PER_TOKEN
    }

    /// Split `text` into classification-sized chunks.
    ///
    /// Every chunk except possibly the last has at least `min_chars` bytes;
    /// concatenating all chunks' paragraphs reproduces the input paragraph
    /// sequence losslessly. Empty input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let min_chars = self.min_chars();
        let max_chars = self.max_chars();

        let mut chunks = Vec::new();
        let mut current = String::new();

        for para in split_paragraphs(text) {
            if current.len() + para.len() < max_chars {
                push_paragraph(&mut current, &para);
            } else if current.len() >= min_chars {
                chunks.push(finish(&mut current));
                push_paragraph(&mut current, &para);
            } else {
                // Accept the overshoot rather than emit an undersized chunk.
                push_paragraph(&mut current, &para);
                if current.len() >= min_chars {
                    chunks.push(finish(&mut current));
                }
            }
        }

        if !current.trim().is_empty() {
            chunks.push(finish(&mut current));
        }

        tracing::debug!(
            chunks = chunks.len(),
            input_bytes = text.len(),
            "chunked policy text"
        );

        chunks
    }
}

/// Paragraphs are runs of non-blank lines, separated by blank lines.
/// Per-line indentation is trimmed; internal line breaks are preserved.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

fn push_paragraph(buffer: &mut String, para: &str) {
    buffer.push_str(para);
    buffer.push_str("\n\n");
}

fn finish(buffer: &mut String) -> String {
    let chunk = buffer.trim_end().to_string();
    buffer.clear();
    chunk
}

//! Overlapping, boundary-aware text chunker.
//!
//! Splits document text into windows of at most `window` characters where
//! each window after the first starts exactly `overlap` characters before the
//! previous one ended. Lengths are counted in `char`s, so multi-byte UTF-8
//! text is never split inside a code point.
//!
//! # Algorithm
//!
//! 1. Start the first chunk at position 0.
//! 2. Let `end = start + window`. If that reaches the end of the text, emit
//!    the remainder as the final chunk.
//! 3. Otherwise search backwards from `end` for a cut point, preferring a
//!    paragraph boundary (after `\n\n`), then a sentence boundary (after
//!    `.`/`!`/`?` followed by whitespace), then a word boundary (after any
//!    whitespace). Only cut points more than `overlap` characters past
//!    `start` are eligible, so every step makes progress.
//! 4. With no eligible boundary, hard-cut at `end`.
//! 5. Emit `[start, cut)` and continue from `cut - overlap`.
//!
//! Because the next chunk always begins `overlap` characters before the
//! previous cut, dropping the first `overlap` characters of every chunk but
//! the first and concatenating reconstructs the input exactly.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::Chunker;
//!
//! let chunker = Chunker::new(1000, 200).unwrap();
//! let chunks = chunker.split("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks.len(), 1);
//! ```

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

/// Default window size in characters.
pub const DEFAULT_WINDOW: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// Boundary kinds, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Sentence,
    Word,
}

const PREFERENCE: [Boundary; 3] = [Boundary::Paragraph, Boundary::Sentence, Boundary::Word];

/// A validated chunking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    /// Create a chunker, rejecting `window == 0` and `overlap >= window`.
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        if window == 0 {
            bail!("chunk window must be > 0");
        }
        if overlap >= window {
            bail!(
                "chunk overlap ({}) must be smaller than the window ({})",
                overlap,
                window
            );
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// # Guarantees
    ///
    /// - Empty text yields no chunks.
    /// - Text of at most `window` chars yields one chunk equal to the text.
    /// - Every chunk holds at most `window` chars.
    /// - Chunk `i + 1` begins `overlap` chars before chunk `i` ends.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        // Byte offset of every char position, plus the end of the string.
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = start + self.window;
            if end >= total {
                chunks.push(text[offsets[start]..].to_string());
                break;
            }
            let cut = self.find_cut(&chars, start, end);
            chunks.push(text[offsets[start]..offsets[cut]].to_string());
            start = cut - self.overlap;
        }
        chunks
    }

    /// Pick the cut position for a chunk starting at `start` whose window
    /// ends at `end` (exclusive, `end < chars.len()`).
    fn find_cut(&self, chars: &[char], start: usize, end: usize) -> usize {
        let min_cut = start + self.overlap + 1;
        for kind in PREFERENCE {
            if let Some(cut) = (min_cut..=end).rev().find(|&p| is_boundary(chars, p, kind)) {
                return cut;
            }
        }
        end
    }
}

/// Whether a cut before char position `p` falls right after a boundary of
/// the given kind.
fn is_boundary(chars: &[char], p: usize, kind: Boundary) -> bool {
    if p == 0 || p > chars.len() {
        return false;
    }
    let prev = chars[p - 1];
    match kind {
        Boundary::Paragraph => p >= 2 && prev == '\n' && chars[p - 2] == '\n',
        Boundary::Sentence => {
            p >= 2 && prev.is_whitespace() && matches!(chars[p - 2], '.' | '!' | '?')
        }
        Boundary::Word => prev.is_whitespace(),
    }
}

/// Number of chars in a chunk, the unit every window is measured in.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// SHA-256 hex digest of a chunk's text, stored alongside chunk records.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

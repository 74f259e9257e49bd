//! Size-bounded, overlapping chunking that snaps to natural boundaries

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, ChunkId, CleanedDocument};

/// Text chunker with configurable size and overlap, both in characters.
///
/// Each window is cut after the last paragraph break, else line break, else
/// sentence boundary, else word boundary found in the second half of the
/// window; failing all of those it is cut hard at `chunk_size` characters.
/// The next window starts `overlap` characters before the cut, moved forward
/// to the next word start.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. The overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Build from the chunking section of the configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk a cleaned document. Calling this twice yields identical chunks.
    pub fn chunk(&self, doc: &CleanedDocument) -> Vec<Chunk> {
        self.spans(doc.text())
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                id: ChunkId::derive(doc.locator(), doc.page(), start),
                text: doc.text()[start..end].to_string(),
                source_type: doc.source_type(),
                locator: doc.locator().to_string(),
                page: doc.page(),
                title: doc.title().map(|t| t.to_string()),
                start,
                end,
                index: index as u32,
            })
            .collect()
    }

    /// Byte spans `[start, end)` of every window
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        if text.is_empty() {
            return spans;
        }

        let mut start = 0usize;
        loop {
            let hard_end = advance_chars(text, start, self.chunk_size);
            if hard_end >= text.len() {
                spans.push((start, text.len()));
                break;
            }

            let min_cut = advance_chars(text, start, (self.chunk_size / 2).max(1));
            let end = snap_end(text, start, min_cut, hard_end);
            spans.push((start, end));

            start = self.next_start(text, start, end);
        }

        spans
    }

    fn next_start(&self, text: &str, start: usize, end: usize) -> usize {
        if self.overlap == 0 {
            return end;
        }

        let back = retreat_chars(text, end, self.overlap);
        let candidate = if back == 0 || text[..back].ends_with(char::is_whitespace) {
            back
        } else {
            // Move forward past the partial word and the whitespace after it
            match text[back..end].find(char::is_whitespace) {
                Some(ws) => {
                    let after = back + ws;
                    after
                        + text[after..end]
                            .find(|c: char| !c.is_whitespace())
                            .unwrap_or(end - after)
                }
                None => back,
            }
        };

        if candidate <= start {
            end
        } else {
            candidate.min(end)
        }
    }
}

/// Pick the cut position in `(start, hard_end]`
fn snap_end(text: &str, start: usize, min_cut: usize, hard_end: usize) -> usize {
    let region = &text[min_cut..hard_end];

    if let Some(pos) = region.rfind("\n\n") {
        return min_cut + pos + 2;
    }
    if let Some(pos) = region.rfind('\n') {
        return min_cut + pos + 1;
    }

    let sentence_cut = text[start..hard_end]
        .split_sentence_bound_indices()
        .map(|(i, _)| start + i)
        .filter(|&b| b >= min_cut && b > start)
        .last();
    if let Some(cut) = sentence_cut {
        return cut;
    }

    if let Some((pos, ws)) = region.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        return min_cut + pos + ws.len_utf8();
    }

    hard_end
}

/// Byte index `n` characters after `from`, or the end of the text
fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte index `n` characters before `to`, or zero
fn retreat_chars(text: &str, to: usize, n: usize) -> usize {
    if n == 0 {
        return to;
    }
    text[..to]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

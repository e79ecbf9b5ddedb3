//! Boundary-aware overlapping text chunker.
//!
//! Splits page text into spans of at most `max_chars` bytes, preferring to
//! break on paragraph boundaries (`\n\n`), then sentence ends, then word
//! boundaries, with a hard cut as the last resort. Consecutive spans overlap
//! by `overlap` bytes so retrieval keeps cross-boundary context.
//!
//! Spans are byte ranges into the original text, always on `char`
//! boundaries. Splitting is lossless: dropping each span's overlap prefix
//! and concatenating the rest reproduces the input exactly.

use sha2::{Digest, Sha256};

use crate::models::{Chunk, Page};

/// Split `text` into overlapping `(start, end)` byte spans.
///
/// Every span is at most `max_chars` bytes (a single oversized `char` is
/// the only exception) and starts `overlap` bytes before the previous
/// span's end, snapped back to a char boundary. Empty input yields no
/// spans.
pub fn split_text(text: &str, max_chars: usize, overlap: usize) -> Vec<(usize, usize)> {
    let len = text.len();
    if len == 0 || max_chars == 0 {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut prev_end = 0usize;

    while start < len {
        if len - start <= max_chars {
            spans.push((start, len));
            break;
        }

        let mut window_end = floor_char_boundary(text, start + max_chars);
        if window_end <= start {
            // A single char wider than the window; take it whole.
            window_end = next_char_boundary(text, start);
        }

        let end = find_break(text, start, prev_end + 1, window_end);
        spans.push((start, end));
        prev_end = end;

        // Step back by the overlap, but never past the span we just cut.
        start = if end - start > overlap {
            floor_char_boundary(text, end - overlap)
        } else {
            end
        };
    }

    spans
}

/// Choose a break position in `(start, window_end]`, at least `min_end`.
///
/// Preference order: paragraph break, sentence end, newline, space, hard
/// cut at the window edge. Separators stay attached to the chunk they end.
fn find_break(text: &str, start: usize, min_end: usize, window_end: usize) -> usize {
    let window = &text[start..window_end];

    if let Some(pos) = window.rfind("\n\n") {
        let end = start + pos + 2;
        if end >= min_end {
            return end;
        }
    }

    let mut sentence_end: Option<usize> = None;
    for pat in [". ", "! ", "? "] {
        if let Some(pos) = window.rfind(pat) {
            let end = start + pos + 2;
            if end >= min_end {
                sentence_end = sentence_end.max(Some(end));
            }
        }
    }
    if let Some(pos) = window.rfind('\n') {
        let end = start + pos + 1;
        if end >= min_end {
            sentence_end = sentence_end.max(Some(end));
        }
    }
    if let Some(end) = sentence_end {
        return end;
    }

    if let Some(pos) = window.rfind(' ') {
        let end = start + pos + 1;
        if end >= min_end {
            return end;
        }
    }

    window_end
}

/// Cut one page into provenance-carrying chunks.
pub fn chunk_page(document: &str, page: &Page, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    split_text(&page.text, max_chars, overlap)
        .into_iter()
        .map(|(s, e)| make_chunk(document, page.number, s, &page.text[s..e]))
        .collect()
}

fn make_chunk(document: &str, page: usize, offset: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        document: document.to_string(),
        page,
        offset,
        text: text.to_string(),
        hash,
    }
}

fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    if i >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn next_char_boundary(text: &str, mut i: usize) -> usize {
    i += 1;
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i.min(text.len())
}

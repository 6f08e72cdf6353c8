//! Property tests for recursive chunking.

use docqa_rag::chunking::{Chunker, RecursiveChunker};
use docqa_rag::document::{Document, Metadata};
use proptest::prelude::*;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn suffix(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    chars[chars.len() - n..].iter().collect()
}

fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Text mixing words, sentence ends, newlines, paragraphs, and non-ASCII.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zA-Zé]{1,12}",
            3 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("? ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
        ],
        1..120,
    )
    .prop_map(|parts| parts.concat())
}

/// `(chunk_size, chunk_overlap)` with `overlap < size`.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (2usize..80).prop_flat_map(|size| (Just(size), 0..size))
}

/// Stitch chunks back together by dropping each overlap prefix.
fn reassemble(chunks: &[String], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(chunk);
        } else {
            text.extend(chunk.chars().skip(overlap));
        }
    }
    text
}

mod prop_chunk_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// No chunk exceeds `chunk_size` code points.
        #[test]
        fn chunks_never_exceed_size(text in arb_text(), (size, overlap) in arb_params()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            for chunk in chunker.split_text(&text) {
                prop_assert!(char_len(&chunk) <= size, "chunk of {} > {size}", char_len(&chunk));
            }
        }

        /// Chunk `i + 1` begins with the last `chunk_overlap` code points of chunk `i`.
        #[test]
        fn consecutive_chunks_share_exact_overlap(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let chunks = chunker.split_text(&text);
            for pair in chunks.windows(2) {
                prop_assert!(char_len(&pair[0]) >= overlap);
                prop_assert_eq!(suffix(&pair[0], overlap), prefix(&pair[1], overlap));
            }
        }

        /// Removing the overlaps reproduces the original text.
        #[test]
        fn chunks_cover_the_whole_text(text in arb_text(), (size, overlap) in arb_params()) {
            prop_assume!(!text.trim().is_empty());
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let chunks = chunker.split_text(&text);
            prop_assert_eq!(reassemble(&chunks, overlap), text);
        }

        /// The same input always produces the same chunk sequence.
        #[test]
        fn chunking_is_deterministic(text in arb_text(), (size, overlap) in arb_params()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let document = Document::new(text, Metadata::new("doc.txt").with("page", "1"));
            let first = chunker.chunk(&document);
            let second = chunker.chunk(&document);
            prop_assert_eq!(&first, &second);
            for (i, chunk) in first.iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
                prop_assert_eq!(&chunk.metadata, &document.metadata);
            }
        }
    }
}

#[test]
fn whitespace_only_document_yields_nothing() {
    let chunker = RecursiveChunker::new(10, 2).unwrap();
    let doc = Document::new("   \n\n  ", Metadata::new("blank.txt"));
    assert!(chunker.chunk(&doc).is_empty());
}

#[test]
fn default_parameters_split_long_text() {
    let chunker = RecursiveChunker::new(1000, 200).unwrap();
    let text = "Sentence number one is here. ".repeat(100);
    let chunks = chunker.split_text(&text);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| char_len(c) <= 1000));
    for pair in chunks.windows(2) {
        assert_eq!(suffix(&pair[0], 200), prefix(&pair[1], 200));
    }
}

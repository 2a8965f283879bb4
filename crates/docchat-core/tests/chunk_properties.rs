use docchat_core::data_processor::{ChunkingConfig, Chunker};
use docchat_core::types::{Document, Passage};
use proptest::prelude::*;

/// Rebuild the document text by dropping each passage's leading overlap.
fn reassemble(passages: &[Passage], overlap: usize) -> String {
    let mut out = String::new();
    for (i, p) in passages.iter().enumerate() {
        let skip = if i == 0 { 0 } else { overlap };
        out.extend(p.content.chars().skip(skip));
    }
    out
}

fn params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #[test]
    fn passages_reconstruct_original_text(text in "\\PC{0,300}", (size, overlap) in params()) {
        let chunker = Chunker::new(&ChunkingConfig { chunk_size: size, chunk_overlap: overlap }).unwrap();
        let passages = chunker.chunk_document(&Document::new("doc", text.clone()));
        prop_assert_eq!(reassemble(&passages, overlap), text);
    }

    #[test]
    fn passages_respect_size_and_overlap(text in "\\PC{0,300}", (size, overlap) in params()) {
        let chunker = Chunker::new(&ChunkingConfig { chunk_size: size, chunk_overlap: overlap }).unwrap();
        let passages = chunker.chunk_document(&Document::new("doc", text));
        for p in &passages {
            prop_assert!(p.char_len() <= size);
            prop_assert!(!p.content.is_empty());
        }
        for pair in passages.windows(2) {
            let prev: Vec<char> = pair[0].content.chars().collect();
            let next: Vec<char> = pair[1].content.chars().collect();
            prop_assert_eq!(prev.len(), size, "only the last passage may be short");
            prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
            prop_assert_eq!(pair[1].offset, pair[0].offset + size - overlap);
        }
    }

    #[test]
    fn chunking_is_deterministic(text in "\\PC{0,200}", (size, overlap) in params()) {
        let chunker = Chunker::new(&ChunkingConfig { chunk_size: size, chunk_overlap: overlap }).unwrap();
        let doc = Document::new("doc", text);
        prop_assert_eq!(chunker.chunk_document(&doc), chunker.chunk_document(&doc));
    }
}

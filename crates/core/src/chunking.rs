use crate::error::IngestError;
use crate::models::Chunk;

/// Splits `text` into consecutive runs of at most `chunk_size` characters.
///
/// Boundaries are purely positional: every character, line breaks included,
/// lands in exactly one chunk and only the last chunk may be shorter.
/// Empty input yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<Vec<Chunk>, IngestError> {
    if chunk_size == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;

    for (offset, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(Chunk {
                index: chunks.len(),
                text: text[start..offset].to_string(),
            });
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(Chunk {
            index: chunks.len(),
            text: text[start..].to_string(),
        });
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple_and_remainder_lengths() {
        let text = "a".repeat(2_500);
        let chunks = chunk_text(&text, 1_000).unwrap();
        let lengths = chunks.iter().map(Chunk::char_len).collect::<Vec<_>>();
        assert_eq!(lengths, vec![1_000, 1_000, 500]);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn concatenation_reproduces_input_with_line_breaks() {
        let text = "line one\r\nline two\n\nthird paragraph\twith tab\n";
        for size in 1..=text.len() + 3 {
            let chunks = chunk_text(text, size).unwrap();
            let joined = chunks
                .iter()
                .map(|chunk| chunk.text.as_str())
                .collect::<String>();
            assert_eq!(joined, text);

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|chunk| chunk.char_len() == size));
            assert!(last.char_len() <= size && last.char_len() > 0);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "héllo wörld ✓✓✓";
        let chunks = chunk_text(text, 4).unwrap();
        assert!(chunks.iter().all(|chunk| chunk.char_len() <= 4));
        assert_eq!(chunks[0].text, "héll");
        assert_eq!(chunks.last().unwrap().text, "✓✓✓");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1_000).unwrap().is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let result = chunk_text("abc", 0);
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }
}

use crate::error::EmbedError;

/// Default number of words per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Splits text into consecutive, non-overlapping chunks of `chunk_size` words.
///
/// Words are separated by any whitespace and rejoined with single spaces.
/// The last chunk may be shorter. Whitespace-only text yields no chunks.
pub fn split_words(text: &str, chunk_size: usize) -> Result<Vec<String>, EmbedError> {
    if chunk_size == 0 {
        return Err(EmbedError::InvalidChunkSize(chunk_size));
    }

    let words: Vec<&str> = text.split_whitespace().collect();

    Ok(words.chunks(chunk_size).map(|group| group.join(" ")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(if count % 2 == 0 { " " } else { "\n\t " })
    }

    #[test]
    fn chunk_count_is_ceiling_of_word_count() {
        for words in [1, 299, 300, 301, 599, 600, 601, 1234] {
            let chunks = split_words(&numbered_words(words), DEFAULT_CHUNK_SIZE).unwrap();
            assert_eq!(chunks.len(), words.div_ceil(DEFAULT_CHUNK_SIZE), "words: {words}");
        }
    }

    #[test]
    fn chunks_reproduce_word_sequence() {
        let text = numbered_words(731);
        let chunks = split_words(&text, DEFAULT_CHUNK_SIZE).unwrap();

        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);

        assert!(chunks[..chunks.len() - 1]
            .iter()
            .all(|c| c.split(' ').count() == DEFAULT_CHUNK_SIZE));
        assert_eq!(chunks.last().unwrap().split(' ').count(), 131);
    }

    #[test]
    fn exactly_chunk_size_words_is_one_normalized_chunk() {
        let text = numbered_words(299) + "\n\n  last  ";
        let chunks = split_words(&text, DEFAULT_CHUNK_SIZE).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(split_words("", 300).unwrap().is_empty());
        assert!(split_words(" \n\t ", 300).unwrap().is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            split_words("some words", 0),
            Err(EmbedError::InvalidChunkSize(0))
        ));
    }

    #[test]
    fn custom_chunk_size() {
        let chunks = split_words("a b c d e", 2).unwrap();
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
    }
}

use crate::core::tokens;

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Splits text after each run of terminal punctuation. Whitespace following a
/// terminator belongs to the next sentence, and trailing text without a
/// terminator is kept as the last piece, so the pieces concatenate back to
/// the input.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_terminal_run = false;

    for (idx, ch) in text.char_indices() {
        let is_terminal = TERMINATORS.contains(&ch);
        if in_terminal_run && !is_terminal {
            sentences.push(&text[start..idx]);
            start = idx;
        }
        in_terminal_run = is_terminal;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Greedily packs whole sentences into chunks of at most `max_tokens_per_chunk`
/// estimated tokens. A sentence larger than the budget becomes its own chunk.
pub fn chunk(text: &str, max_tokens_per_chunk: usize) -> Vec<String> {
    if tokens::estimate(text) <= max_tokens_per_chunk {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for sentence in split_sentences(text) {
        // Whitespace-only tails ride along with the previous chunk.
        if sentence.trim().is_empty() {
            current.push_str(sentence);
            continue;
        }

        let sentence_tokens = tokens::estimate(sentence);
        if current_tokens + sentence_tokens > max_tokens_per_chunk && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push_str(sentence);
        current_tokens += sentence_tokens;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    log::debug!(
        "Split {} estimated tokens into {} chunks (budget {})",
        tokens::estimate(text),
        chunks.len(),
        max_tokens_per_chunk
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {} talks about batteries and grids. ", i))
            .collect()
    }

    #[test]
    fn sentences_keep_punctuation_and_remainder() {
        let parts = split_sentences("Hello there! How are you?? Fine. trailing words");
        assert_eq!(
            parts,
            vec!["Hello there!", " How are you??", " Fine.", " trailing words"]
        );
    }

    #[test]
    fn text_within_budget_is_returned_untouched() {
        let text = "  Short text. With two sentences!  ";
        assert_eq!(chunk(text, 100), vec![text.to_string()]);
    }

    #[test]
    fn chunks_rejoin_to_original() {
        let text = format!("{}and an unterminated tail\n\n", long_text(200));
        let chunks = chunk(&text, 300);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunks_respect_budget_when_sentences_are_small() {
        let text = long_text(300);
        for piece in chunk(&text, 250) {
            assert!(tokens::estimate(&piece) <= 250, "chunk over budget");
        }
    }

    #[test]
    fn oversized_sentence_is_kept_whole() {
        let giant = format!("{}.", "x".repeat(2000));
        let text = format!("Intro sentence. {} Outro sentence.", giant);
        let chunks = chunk(&text, 100);

        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().any(|c| c.contains(&giant)));
        assert!(chunks.iter().any(|c| tokens::estimate(c) > 100));
    }

    #[test]
    fn chunk_order_follows_document_order() {
        let text = long_text(100);
        let chunks = chunk(&text, 120);
        let first = chunks.first().unwrap();
        let last = chunks.last().unwrap();
        assert!(first.contains("Sentence number 0 "));
        assert!(last.contains("Sentence number 99 "));
    }
}

//! Splitting of oversized notifications for length-limited channels.
//!
//! Every chunk starts with the same prefix (a `[HH:MM]` marker in practice),
//! which both tells the reader when the update was made and keeps otherwise
//! identical posts from being rejected as duplicates.

/// Smallest limit for which chunking still makes sense with an `[HH:MM]` prefix.
pub const MIN_CHUNK_LIMIT: usize = 16;

/// Split `message` into chunks each strictly shorter than `limit` characters.
///
/// Words are separated by single spaces and packed greedily: a word joins the
/// current chunk while `len(chunk + " " + word) < limit`. Each chunk begins
/// with `prefix`. A word too long to fit even in an empty chunk is cut across
/// as many chunks as needed.
///
/// Lengths are counted in `char`s.
///
/// # Examples
///
/// ```
/// use metro_core::chunking::chunk_message;
///
/// let chunks = chunk_message("um dois tres", "[08:15]", 20);
/// assert_eq!(chunks, vec!["[08:15] um dois", "[08:15] tres"]);
/// ```
pub fn chunk_message(message: &str, prefix: &str, limit: usize) -> Vec<String> {
    let prefix_len = prefix.chars().count();
    let mut pending: Vec<String> = message.split(' ').rev().map(str::to_string).collect();
    let mut chunks = Vec::new();

    while !pending.is_empty() {
        let mut chunk = prefix.to_string();
        let mut chunk_len = prefix_len;
        let mut packed_any = false;

        while let Some(word) = pending.last() {
            let word_len = word.chars().count();
            if chunk_len + 1 + word_len >= limit {
                break;
            }
            chunk.push(' ');
            chunk.push_str(word);
            chunk_len += 1 + word_len;
            packed_any = true;
            pending.pop();
        }

        if !packed_any {
            if let Some(word) = pending.pop() {
                let room = limit.saturating_sub(prefix_len + 2).max(1);
                let head: String = word.chars().take(room).collect();
                let tail: String = word.chars().skip(room).collect();
                chunk.push(' ');
                chunk.push_str(&head);
                if !tail.is_empty() {
                    pending.push(tail);
                }
            }
        }

        chunks.push(chunk);
    }

    chunks
}

/// The text of `chunk` without its prefix and separating space.
pub fn chunk_body<'a>(chunk: &'a str, prefix: &str) -> &'a str {
    chunk
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(' '))
        .unwrap_or(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "[12:34]";

    fn words_of(chunks: &[String]) -> Vec<String> {
        chunks
            .iter()
            .flat_map(|c| chunk_body(c, PREFIX).split(' ').map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    fn assert_well_formed(message: &str, limit: usize) -> Vec<String> {
        let chunks = chunk_message(message, PREFIX, limit);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.starts_with(PREFIX), "{chunk:?} lacks the prefix");
            assert!(
                chunk.chars().count() < limit,
                "{chunk:?} is {} chars, limit {limit}",
                chunk.chars().count()
            );
        }
        chunks
    }

    #[test]
    fn test_short_message_is_single_chunk() {
        let chunks = assert_well_formed("⚠️ Linha Azul: Avaria.", 270);
        assert_eq!(chunks, vec!["[12:34] ⚠️ Linha Azul: Avaria."]);
    }

    #[test]
    fn test_300_char_message_splits_in_two_at_270() {
        let mut words = vec!["abcd"; 59];
        words.push("abcde");
        let message = words.join(" ");
        assert_eq!(message.chars().count(), 300);

        let chunks = assert_well_formed(&message, 270);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.starts_with("[12:34] ")));
        assert_eq!(words_of(&chunks), words);
    }

    #[test]
    fn test_chunks_reproduce_word_sequence() {
        let message = "Devido a avaria num comboio a circulação está interrompida entre \
                       as estações Alameda e São Sebastião. Prevê-se o restabelecimento \
                       da circulação dentro de 30 minutos. Pedimos desculpa pelo incómodo.";
        let chunks = assert_well_formed(message, 60);

        assert!(chunks.len() >= 2);
        let expected: Vec<String> = message.split(' ').map(str::to_string).collect();
        assert_eq!(words_of(&chunks), expected);
    }

    #[test]
    fn test_boundary_is_strictly_less_than_limit() {
        // "[12:34] abcd" is 12 chars: fits under 13 but not under 12.
        assert_eq!(chunk_message("abcd", PREFIX, 13), vec!["[12:34] abcd"]);
        let chunks = chunk_message("abcd efgh", PREFIX, 13);
        assert_eq!(chunks, vec!["[12:34] abcd", "[12:34] efgh"]);
    }

    #[test]
    fn test_overlong_word_is_cut() {
        let word = "x".repeat(50);
        let chunks = assert_well_formed(&word, 20);

        assert_eq!(chunks.len(), 5);
        let rebuilt: String = chunks.iter().map(|c| chunk_body(c, PREFIX)).collect();
        assert_eq!(rebuilt, word);
    }

    #[test]
    fn test_multibyte_characters_count_as_one() {
        let message = "ção ção ção";
        // 7 + 4 + 4 = 15 < 16, third word would make 19.
        let chunks = assert_well_formed(message, 16);
        assert_eq!(chunks, vec!["[12:34] ção ção", "[12:34] ção"]);
    }

    #[test]
    fn test_chunk_body_strips_prefix() {
        assert_eq!(chunk_body("[12:34] olá mundo", PREFIX), "olá mundo");
        assert_eq!(chunk_body("sem prefixo", PREFIX), "sem prefixo");
    }
}

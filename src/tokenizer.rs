//! Query and document tokenization
//!
//! The rule is deliberately minimal: lemmatization happens offline when the
//! lexicon is built, so at this layer a token is just a lowercased
//! alphanumeric run. The same rule applies to corpus text and query strings
//! so that both sides hit the same lexicon entries.

use std::collections::HashMap;

/// Tokenize text: split on whitespace, lowercase, strip characters that are
/// not alphanumeric, discard empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|word| {
            let clean: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if clean.is_empty() {
                None
            } else {
                Some(clean)
            }
        })
        .collect()
}

/// Count occurrences of each token in a token sequence
pub fn term_frequencies<I, T>(tokens: I) -> HashMap<T, u32>
where
    I: IntoIterator<Item = T>,
    T: std::hash::Hash + Eq,
{
    let mut freq = HashMap::new();
    for token in tokens {
        *freq.entry(token).or_insert(0) += 1;
    }
    freq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenization() {
        let tokens = tokenize("Hello World! This is a test.");
        assert_eq!(tokens, vec!["hello", "world", "this", "is", "a", "test"]);
    }

    #[test]
    fn test_punctuation_stripped_inside_words() {
        let tokens = tokenize("gene-expression p53's (in-vivo)");
        assert_eq!(tokens, vec!["geneexpression", "p53s", "invivo"]);
    }

    #[test]
    fn test_empty_after_cleaning() {
        // Tokens that are pure punctuation vanish entirely
        let tokens = tokenize("--- ... !!! word");
        assert_eq!(tokens, vec!["word"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t\n  ").is_empty());
    }

    #[test]
    fn test_term_frequencies() {
        let freq = term_frequencies(tokenize("apple apple banana"));
        assert_eq!(freq.get("apple"), Some(&2));
        assert_eq!(freq.get("banana"), Some(&1));
    }
}

/// Words that never make it into a topic keyword fragment.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "by", "with",
    "from", "is", "was", "are", "were", "calls", "story", "news",
];

const PUNCTUATION: &[char] = &['.', ',', '!', '?', ':', ';', '"', '(', ')', '[', ']', '{', '}'];

const MAX_KEYWORDS: usize = 5;

/// Derive a short keyword fragment from the topic to bias search queries.
///
/// Tokens are split on whitespace, stripped of surrounding punctuation and
/// lowercased. Short tokens (≤2 chars), stop words and pure numbers are
/// dropped; the first five survivors are joined with spaces, in order.
pub fn extract_topic_keywords(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(|word| word.trim_matches(PUNCTUATION).to_lowercase())
        .filter(|word| word.chars().count() > 2)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| !word.chars().all(|c| c.is_numeric()))
        .take(MAX_KEYWORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

//! Text normalization shared by the relevance scorer.

/// Function words excluded from word-level comparison.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "can", "this", "that",
    "these", "those", "it", "its", "i", "you", "we", "they", "he", "she", "who", "which", "what",
    "when", "where", "why", "how", "all", "each", "every", "both", "few", "more", "most", "other",
    "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very",
    "just", "also", "now", "our", "your", "their", "any", "etc",
];

/// Soft-skill phrases that every CV trivially claims.
pub const GENERIC_TERMS: &[&str] = &[
    "communication",
    "teamwork",
    "team player",
    "hard worker",
    "motivated",
    "detail oriented",
    "detail-oriented",
    "self-starter",
    "proactive",
    "problem solving",
    "problem-solving",
    "time management",
    "organized",
    "flexible",
    "adaptable",
    "quick learner",
    "passionate",
    "dedicated",
    "responsible",
    "reliable",
    "professional",
    "excellent",
];

/// Lowercases, replaces punctuation (except `-` and `_`) with spaces,
/// collapses whitespace and trims.
pub fn normalize_text(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&replaced)
}

/// Content words of `text`: normalized, longer than one character, not a stop word.
pub fn extract_words(text: &str) -> Vec<String> {
    normalize_text(text)
        .split(' ')
        .filter(|word| word.chars().count() > 1 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Replaces every `<...>` tag with a space. An unterminated `<` is kept as text.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                out.push(' ');
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    collapse_whitespace(&out)
}

/// True when the normalized item equals or contains a generic term.
pub fn is_generic_item(item: &str) -> bool {
    let normalized = normalize_text(item);
    GENERIC_TERMS.iter().any(|term| normalized.contains(term))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

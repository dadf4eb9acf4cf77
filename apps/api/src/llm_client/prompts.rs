// Shared prompt fragments and locale handling.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Locale used when the requested one is missing or unsupported.
pub const DEFAULT_LOCALE: &str = "en";

/// Supported locale codes and the language name given to the model.
const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
];

/// Instruction appended to every prompt that must return machine-readable JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "\
- Return ONLY valid JSON, no additional text
- Do NOT include explanations or apologies";

/// Lowercases `locale` and falls back to `DEFAULT_LOCALE` when unsupported.
pub fn normalize_locale(locale: &str) -> &'static str {
    let lowered = locale.trim().to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(code, _)| *code == lowered)
        .map(|(code, _)| *code)
        .unwrap_or(DEFAULT_LOCALE)
}

/// Language name for a locale code, after normalization.
pub fn target_language(locale: &str) -> &'static str {
    let code = normalize_locale(locale);
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("English")
}

/// Language block placed at the top of generation and extraction prompts.
pub fn language_instruction(language: &str) -> String {
    format!(
        "**CRITICAL - LANGUAGE REQUIREMENT:**\n\
         - Write ALL content in {language}\n\
         - Translate any non-{language} content to {language}\n\
         - Use professional {language} terminology"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_locale_is_case_insensitive() {
        assert_eq!(normalize_locale("FR"), "fr");
        assert_eq!(normalize_locale(" De "), "de");
    }

    #[test]
    fn test_unsupported_locale_falls_back_to_english() {
        assert_eq!(normalize_locale("es"), "en");
        assert_eq!(normalize_locale(""), "en");
        assert_eq!(target_language("pt-BR"), "English");
    }

    #[test]
    fn test_target_language_names() {
        assert_eq!(target_language("it"), "Italian");
        assert_eq!(target_language("fr"), "French");
    }

    #[test]
    fn test_language_instruction_mentions_language() {
        let block = language_instruction("German");
        assert!(block.contains("ALL content in German"));
    }
}

//! Code language detection.

use once_cell::sync::Lazy;
use regex::Regex;

/// Heuristic signatures, checked in order. HTML goes first because markup
/// embeds script; TypeScript before JavaScript because it is a superset.
static LANGUAGE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "html",
            r"(?is)^\s*(<!doctype\s+html|<html\b|<(div|span|p|a|ul|ol|li|table|head|body|section|form|button|input|img|script|style)\b[^>]*>.*</)",
        ),
        (
            "java",
            r"\bpublic\s+(static\s+)?(final\s+)?(class|interface|void|int|String|boolean)\b|System\.out\.print|\bimport\s+java\.",
        ),
        (
            "typescript",
            r"\binterface\s+\w+\s*\{|\btype\s+\w+\s*=|:\s*(string|number|boolean|any|void|unknown)\b|\bas\s+const\b|\benum\s+\w+\s*\{",
        ),
        (
            "javascript",
            r#"\b(const|let|var)\s+\w+\s*=|\bfunction\s*\w*\s*\(|=>|console\.log|\brequire\(|\bimport\s+.+\s+from\s+['"]|\bdocument\.|\bexport\s+(default|const|function)\b"#,
        ),
        (
            "python",
            r"(?m)^\s*def\s+\w+\s*\(.*\)\s*(->\s*\S+\s*)?:|^\s*class\s+\w+(\(.*\))?:|^\s*(import\s+\w+|from\s+[\w.]+\s+import\b)|\bprint\(|\belif\b|\bself\.",
        ),
    ]
    .into_iter()
    .map(|(language, pattern)| {
        (
            language,
            Regex::new(pattern).expect("Invalid language regex"),
        )
    })
    .collect()
});

/// Guess the language of a code snippet.
pub fn detect_language(code: &str) -> &'static str {
    LANGUAGE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(code))
        .map_or("plaintext", |(language, _)| language)
}

/// The `language-*` / `lang-*` suffix among CSS classes.
pub fn language_hint(classes: &[String]) -> Option<&str> {
    classes.iter().find_map(|class| {
        class
            .strip_prefix("language-")
            .or_else(|| class.strip_prefix("lang-"))
            .filter(|hint| !hint.is_empty())
    })
}

/// Map a class hint onto a known language name.
pub fn normalize_language(hint: &str) -> Option<&'static str> {
    let language = match hint.to_ascii_lowercase().as_str() {
        "js" | "jsx" | "javascript" | "mjs" => "javascript",
        "ts" | "tsx" | "typescript" => "typescript",
        "html" | "xml" | "xhtml" | "markup" => "html",
        "py" | "python" | "python3" => "python",
        "java" => "java",
        "text" | "plain" | "plaintext" | "txt" => "plaintext",
        _ => return None,
    };
    Some(language)
}

//! Text cleaning and metrics.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines that are UI chrome rather than content when they stand alone.
const ARTIFACT_LINES: &[&str] = &[
    "Share",
    "Reply",
    "Show more",
    "Show less",
    "Read more",
    "See more",
    "Copy",
    "Copy code",
    "Copied!",
    "Like",
    "Report",
    "Translate",
    "Follow",
    "Subscribe",
    "Edit",
    "Delete",
    "Upvote",
    "Downvote",
];

static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("Invalid whitespace regex"));
static LINE_EDGE_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^ +| +$").expect("Invalid line edge regex"));
static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Invalid newline regex"));

/// Strip artifact lines, collapse whitespace and trim.
pub fn clean_text(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let kept: Vec<&str> = normalized
        .split('\n')
        .filter(|line| !ARTIFACT_LINES.contains(&line.trim()))
        .collect();
    let joined = kept.join("\n");

    let collapsed = HORIZONTAL_SPACE.replace_all(&joined, " ");
    let collapsed = LINE_EDGE_SPACE.replace_all(&collapsed, "");
    let collapsed = EXCESS_NEWLINES.replace_all(&collapsed, "\n\n");
    collapsed.trim().to_string()
}

/// Whitespace-separated token count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Character count.
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}

/// Keep line layout but drop trailing spaces and surrounding blank lines.
///
/// Used for code-like selections where indentation matters.
pub fn preserve_layout(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_more_alone_is_empty() {
        assert_eq!(clean_text("Show more"), "");
        assert_eq!(clean_text("  Share  \n"), "");
    }

    #[test]
    fn test_artifact_lines_removed() {
        let raw = "Great post\nReply\nShare\nAnother line";
        assert_eq!(clean_text(raw), "Great post\nAnother line");
    }

    #[test]
    fn test_artifact_must_match_whole_line() {
        assert_eq!(clean_text("Share this with friends"), "Share this with friends");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(clean_text("a  \t b"), "a b");
        assert_eq!(clean_text("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a   \n  \n   \n b"), "a\n\nb");
        assert_eq!(clean_text("\n\n  padded  \n\n"), "padded");
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("one two\nthree"), 3);
        assert_eq!(count_chars("héllo"), 5);
    }

    #[test]
    fn test_preserve_layout() {
        let raw = "\n\n    def f():  \n        return 1\n\n";
        assert_eq!(preserve_layout(raw), "    def f():\n        return 1");
        assert_eq!(preserve_layout("\n \n"), "");
    }
}

pub const DEFAULT_EXCERPT_LEAD_CHARS: usize = 40;

/// Collapses every whitespace run into a single space so the text fits on one line.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replaces `"` with `'` and drops `\`. Lossy; only for consumers that
/// interpolate raw strings into templates without escaping.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '"' => Some('\''),
            '\\' => None,
            other => Some(other),
        })
        .collect()
}

/// Picks the article body, substituting the excerpt when the detected content
/// is empty or does not contain the excerpt's opening `lead_chars` characters
/// (case-insensitive); that mismatch usually means boilerplate was captured.
pub fn choose_content(content: String, excerpt: &str, lead_chars: usize) -> String {
    if content.is_empty() {
        return excerpt.to_string();
    }
    if excerpt.is_empty() {
        return content;
    }
    let lead: String = excerpt.chars().take(lead_chars).collect::<String>().to_lowercase();
    if content.to_lowercase().contains(&lead) {
        content
    } else {
        excerpt.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_to_single_spaces() {
        assert_eq!(collapse_whitespace("  a\n\tb   c \r\n"), "a b c");
    }

    #[test]
    fn sanitize_rewrites_quotes_and_drops_backslashes() {
        assert_eq!(sanitize_text(r#"say "hi" \o/"#), "say 'hi' o/");
    }

    #[test]
    fn empty_content_falls_back_to_excerpt() {
        assert_eq!(choose_content(String::new(), "Summary", 40), "Summary");
    }

    #[test]
    fn matching_content_is_kept() {
        let content = "Intro. THE QUICK BROWN FOX jumps over the lazy dog.".to_string();
        assert_eq!(choose_content(content.clone(), "The quick brown fox", 40), content);
    }

    #[test]
    fn mismatching_content_is_replaced() {
        let content = "Home News Sport Weather".to_string();
        assert_eq!(
            choose_content(content, "The quick brown fox", 40),
            "The quick brown fox"
        );
    }

    #[test]
    fn lead_only_uses_the_opening_characters() {
        let excerpt = "Opening words match but the tail of this excerpt never appears";
        let content = "Lead: opening words match but then the body diverges".to_string();
        assert_eq!(choose_content(content.clone(), excerpt, 18), content);
    }

    #[test]
    fn lead_is_char_based_for_multibyte_text() {
        let excerpt = "Ñandú über straße";
        let content = "Intro ñandú über straße and more".to_string();
        assert_eq!(choose_content(content.clone(), excerpt, 5), content);
    }
}

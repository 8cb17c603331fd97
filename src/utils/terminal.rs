//! Terminal output sanitization
//!
//! Conversation titles come straight from the export and may contain ANSI escape
//! sequences or other control characters. Anything printed to the terminal by the
//! CLI goes through [`clean_for_terminal`] first.

/// Strips ANSI CSI escape sequences and control characters from a single-line
/// value, replacing newlines and tabs with spaces
///
/// # Examples
///
/// ```
/// use chat_export_analyzer::utils::terminal::clean_for_terminal;
///
/// assert_eq!(clean_for_terminal("\x1b[31mRed\x1b[0m\ntitle"), "Red title");
/// ```
pub fn clean_for_terminal(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // CSI sequence: ESC [ params final-letter
            if chars.peek() == Some(&'[') {
                chars.next();
                for next_ch in chars.by_ref() {
                    if next_ch.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }

        match ch {
            '\n' | '\r' | '\t' => result.push(' '),
            c if c.is_control() => {}
            c => result.push(c),
        }
    }

    result
}

/// Shortens `text` to at most `max_chars` characters, marking the cut with `…`
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_color_codes() {
        assert_eq!(clean_for_terminal("\x1b[31mRed text\x1b[0m normal"), "Red text normal");
    }

    #[test]
    fn test_clean_cursor_movement() {
        assert_eq!(clean_for_terminal("\x1b[2J\x1b[H Cleared"), " Cleared");
    }

    #[test]
    fn test_clean_bare_escape_and_bell() {
        assert_eq!(clean_for_terminal("a\x1bb\x07c"), "abc");
    }

    #[test]
    fn test_clean_flattens_whitespace_controls() {
        assert_eq!(clean_for_terminal("one\ntwo\tthree\r"), "one two three ");
    }

    #[test]
    fn test_clean_keeps_unicode() {
        assert_eq!(clean_for_terminal("Hello 👋 \x1b[1mWorld\x1b[0m"), "Hello 👋 World");
    }

    #[test]
    fn test_truncate_for_display() {
        assert_eq!(truncate_for_display("short", 10), "short");
        assert_eq!(truncate_for_display("a longer title", 8), "a longe…");
        assert_eq!(truncate_for_display("ééééé", 3), "éé…");
    }
}

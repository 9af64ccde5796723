//! HTML escaping and message chunking for Telegram's HTML parse mode.

/// Telegram message size limit, in bytes of UTF-8.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Escape the characters Telegram's HTML parser treats specially.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Strip the tags and entities produced by this crate's formatters, for the
/// plain-text fallback when Telegram rejects our HTML.
#[must_use]
pub fn html_to_plain(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {},
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Prefers breaking at a newline, then a space, and never inside a UTF-8
/// character or an HTML entity.
#[must_use]
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 || text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while remaining.len() > max_len {
        let window = match remaining.floor_char_boundary(max_len) {
            0 => remaining.chars().next().map_or(remaining.len(), char::len_utf8),
            end => end,
        };
        let slice = &remaining[..window];
        let split_at = slice
            .rfind('\n')
            .or_else(|| slice.rfind(' '))
            .filter(|&pos| pos > 0)
            .unwrap_or_else(|| entity_safe_end(slice));

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches('\n');
        remaining = remaining.strip_prefix(' ').unwrap_or(remaining);
    }
    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

/// Pull a hard split back so it doesn't cut an `&...;` entity in half.
fn entity_safe_end(slice: &str) -> usize {
    match slice.rfind('&') {
        Some(amp) if amp > 0 && !slice[amp..].contains(';') => amp,
        _ => slice.len(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("plain", "plain")]
    #[case("a < b && c > d", "a &lt; b &amp;&amp; c &gt; d")]
    #[case("<script>", "&lt;script&gt;")]
    #[case("say \"hi\"", "say &quot;hi&quot;")]
    #[case("摇滚 🎸", "摇滚 🎸")]
    fn test_escape_html(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_html(input), expected);
    }

    #[test]
    fn plain_fallback_strips_tags_and_entities() {
        let html = "🎸 <b>ÖNIKA LI</b>\n<i>a &lt; b &amp; c</i>";
        assert_eq!(html_to_plain(html), "🎸 ÖNIKA LI\na < b & c");
    }

    #[test]
    fn short_message_is_single_chunk() {
        assert_eq!(chunk_message("hello", 100), vec!["hello"]);
        assert!(chunk_message("", 100).is_empty());
    }

    #[test]
    fn chunks_split_at_newline_then_space() {
        assert_eq!(chunk_message("line1\nline2\nline3", 10), vec![
            "line1", "line2", "line3"
        ]);
        assert_eq!(chunk_message("hello world foo bar", 10), vec![
            "hello", "world foo", "bar"
        ]);
    }

    #[test]
    fn chunks_respect_utf8_boundaries() {
        let text = format!("{}лz", "a".repeat(4095));
        let chunks = chunk_message(&text, TELEGRAM_MAX_MESSAGE_LEN);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4095);
        assert_eq!(chunks[1], "лz");
    }

    #[test]
    fn long_cjk_text_fits_limit() {
        let text = "摇滚".repeat(3000);
        let chunks = chunk_message(&text, TELEGRAM_MAX_MESSAGE_LEN);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.len() <= TELEGRAM_MAX_MESSAGE_LEN));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn hard_split_keeps_entities_whole() {
        let text = format!("{}&amp;tail", "x".repeat(8));
        let chunks = chunk_message(&text, 10);
        assert_eq!(chunks[0], "x".repeat(8));
        assert!(chunks[1].starts_with("&amp;"));
    }
}

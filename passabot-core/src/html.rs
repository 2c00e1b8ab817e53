//! Helpers for the HTML subset accepted by chat notification sinks.
//!
//! Only `<b>`, `<code>` and `<pre>` are emitted by passabot, so escaping
//! the three reserved characters is sufficient.

/// Longest message text, in characters, accepted by the chat sink.
pub const MESSAGE_CHAR_LIMIT: usize = 4096;

/// Escapes `&`, `<` and `>` for inclusion in an HTML-formatted message.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Truncates `text` to at most `max_chars` characters, appending an
/// ellipsis marker when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}

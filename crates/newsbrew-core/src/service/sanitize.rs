//! Newsletter body sanitation for LLM input.

/// Best plain-text body for a newsletter: the text part verbatim when one
/// exists, otherwise the HTML part stripped down to text. Empty when the
/// message carried neither.
#[must_use]
pub fn newsletter_body(raw_text: Option<&str>, raw_html: Option<&str>) -> String {
    match (raw_text, raw_html) {
        (Some(text), _) if !text.trim().is_empty() => text.to_string(),
        (_, Some(html)) => plain_text_from_html(html),
        _ => String::new(),
    }
}

/// Convert an HTML body to readable text: markup, scripts, and styles
/// go, whitespace collapses to single spaces.
#[must_use]
pub fn plain_text_from_html(html: &str) -> String {
    let text = htmd::convert(html).unwrap_or_else(|_| strip_tags(html));
    collapse_whitespace(&text)
}

/// Collapse all whitespace runs to single spaces and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` bytes on a UTF-8 character boundary.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Fallback tag stripper for HTML the converter rejects. Drops
/// `<script>` and `<style>` blocks wholesale, replaces every other tag
/// with a space. ASCII lowercasing keeps byte offsets aligned with the
/// original, so searches run over one pre-lowered copy.
fn strip_tags(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(open) = lower[pos..].find('<').map(|i| pos + i) {
        out.push_str(&html[pos..open]);
        let rest = &lower[open..];

        let end = if rest.starts_with("<script") {
            rest.find("</script>").map(|i| open + i + "</script>".len())
        } else if rest.starts_with("<style") {
            rest.find("</style>").map(|i| open + i + "</style>".len())
        } else {
            rest.find('>').map(|i| open + i + 1)
        };

        match end {
            Some(end) => {
                out.push(' ');
                pos = end;
            }
            // Unterminated tag: drop the tail.
            None => return out,
        }
    }

    out.push_str(&html[pos..]);
    out
}

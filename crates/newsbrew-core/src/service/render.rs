//! Deterministic digest rendering.
//!
//! Pure templates over the typed digest: the same digest always renders
//! to the same documents, and no business decisions happen here.

use std::fmt::Write;

use newsbrew_llm::Digest;

/// Render the digest as a standalone HTML document.
#[must_use]
pub fn digest_html(digest: &Digest, title: &str) -> String {
    let mut html = String::with_capacity(2048);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  <style>\n    \
         body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; \
         color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}\n    \
         h1 {{ color: #1a1a1a; border-bottom: 2px solid #eee; padding-bottom: 10px; }}\n    \
         h2 {{ color: #444; margin-top: 30px; }}\n    \
         .highlights {{ background: #f8f9fa; padding: 15px; border-radius: 8px; margin: 15px 0; }}\n    \
         .newsletter {{ border-left: 3px solid #007bff; padding-left: 15px; margin: 20px 0; }}\n    \
         .source {{ font-weight: bold; color: #007bff; }}\n    \
         a {{ color: #007bff; text-decoration: none; }}\n    \
         .footer {{ margin-top: 40px; padding-top: 20px; border-top: 1px solid #eee; \
         font-size: 14px; color: #666; }}\n  </style>\n</head>\n<body>\n  <h1>{}</h1>\n  \
         <p><em>{}</em></p>\n",
        escape_html(title),
        escape_html(&digest.period_covered),
    );

    if !digest.highlights.is_empty() {
        html.push_str("  <div class=\"highlights\">\n    <h2>Highlights</h2>\n    <ul>\n");
        for highlight in &digest.highlights {
            let _ = writeln!(html, "      <li>{}</li>", escape_html(highlight));
        }
        html.push_str("    </ul>\n  </div>\n");
    }

    html.push_str("  <h2>Newsletter Summaries</h2>\n");
    for entry in &digest.newsletters {
        let _ = write!(
            html,
            "  <div class=\"newsletter\">\n    <p class=\"source\">{}</p>\n    \
             <h3>{}</h3>\n    <p>{}</p>\n",
            escape_html(&entry.source),
            escape_html(&entry.headline),
            escape_html(&entry.summary),
        );
        if !entry.top_links.is_empty() {
            html.push_str("    <p><strong>Links:</strong></p>\n    <ul>\n");
            for link in &entry.top_links {
                let _ = writeln!(
                    html,
                    "      <li><a href=\"{}\">{}</a></li>",
                    escape_html(link.url.as_deref().unwrap_or("#")),
                    escape_html(&link.title),
                );
            }
            html.push_str("    </ul>\n");
        }
        html.push_str("  </div>\n");
    }

    let _ = write!(
        html,
        "  <div class=\"footer\">\n    <p>{}</p>\n    \
         <p><em>Generated by newsbrew</em></p>\n  </div>\n</body>\n</html>\n",
        escape_html(&digest.closing_note),
    );

    html
}

/// Render the digest as plain text.
#[must_use]
pub fn digest_text(digest: &Digest, title: &str) -> String {
    let mut text = String::with_capacity(1024);

    let _ = writeln!(text, "{}", title.to_uppercase());
    let _ = writeln!(text, "{}\n", digest.period_covered);

    if !digest.highlights.is_empty() {
        text.push_str("HIGHLIGHTS\n");
        let _ = writeln!(text, "{}", "=".repeat(40));
        for highlight in &digest.highlights {
            let _ = writeln!(text, "- {highlight}");
        }
        text.push('\n');
    }

    text.push_str("NEWSLETTER SUMMARIES\n");
    let _ = writeln!(text, "{}\n", "=".repeat(40));

    for entry in &digest.newsletters {
        let _ = writeln!(text, "[{}]", entry.source);
        let _ = writeln!(text, "{}", entry.headline);
        let _ = writeln!(text, "{}", "-".repeat(30));
        let _ = writeln!(text, "{}", entry.summary);
        if !entry.top_links.is_empty() {
            text.push_str("\nLinks:\n");
            for link in &entry.top_links {
                let _ = writeln!(
                    text,
                    "  - {}: {}",
                    link.title,
                    link.url.as_deref().unwrap_or("N/A")
                );
            }
        }
        text.push('\n');
    }

    let _ = writeln!(text, "\n{}", digest.closing_note);
    text.push_str("\n---\nGenerated by newsbrew\n");

    text
}

/// Escape the characters HTML cares about in text and attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsbrew_llm::{DigestEntry, Link};

    fn sample_digest() -> Digest {
        Digest {
            period_covered: "Aug 1 - Aug 7".to_string(),
            highlights: vec!["Models got bigger".to_string()],
            newsletters: vec![DigestEntry {
                source: "AI Weekly".to_string(),
                headline: "Scaling continues".to_string(),
                summary: "Everything doubled.".to_string(),
                top_links: vec![Link {
                    title: "The paper".to_string(),
                    url: Some("https://example.com/paper".to_string()),
                }],
            }],
            closing_note: "See you next week.".to_string(),
        }
    }

    #[test]
    fn test_html_contains_all_sections() {
        let html = digest_html(&sample_digest(), "Morning AI");
        assert!(html.contains("<h1>Morning AI</h1>"));
        assert!(html.contains("Aug 1 - Aug 7"));
        assert!(html.contains("Models got bigger"));
        assert!(html.contains("AI Weekly"));
        assert!(html.contains("https://example.com/paper"));
        assert!(html.contains("See you next week."));
    }

    #[test]
    fn test_html_escapes_content() {
        let mut digest = sample_digest();
        digest.highlights = vec!["a < b & c".to_string()];
        let html = digest_html(&digest, "T");
        assert!(html.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_text_layout() {
        let text = digest_text(&sample_digest(), "Morning AI");
        assert!(text.starts_with("MORNING AI\n"));
        assert!(text.contains("HIGHLIGHTS"));
        assert!(text.contains("- Models got bigger"));
        assert!(text.contains("[AI Weekly]"));
        assert!(text.contains("The paper: https://example.com/paper"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let digest = sample_digest();
        assert_eq!(digest_html(&digest, "T"), digest_html(&digest, "T"));
        assert_eq!(digest_text(&digest, "T"), digest_text(&digest, "T"));
    }

    #[test]
    fn test_link_without_url_gets_placeholder() {
        let mut digest = sample_digest();
        digest.newsletters[0].top_links = vec![Link {
            title: "Unlinked".to_string(),
            url: None,
        }];
        assert!(digest_html(&digest, "T").contains("href=\"#\""));
        assert!(digest_text(&digest, "T").contains("Unlinked: N/A"));
    }
}

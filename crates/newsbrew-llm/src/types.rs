//! Structured results returned by the extraction and digest calls.

use serde::{Deserialize, Serialize};

/// A link surfaced from a newsletter or a digest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link title as worded by the model.
    pub title: String,
    /// Target URL, when the model could recover one.
    #[serde(default)]
    pub url: Option<String>,
}

/// A titled section of a newsletter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSection {
    /// Section heading.
    pub heading: String,
    /// Short summary of the section body.
    pub summary: String,
}

/// Structured content extracted from one newsletter.
///
/// This is the shape persisted on the newsletter row; `topics` doubles as
/// the row's derived topic list, so the two can never drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Topics the newsletter covers.
    #[serde(default)]
    pub topics: Vec<String>,
    /// The most important takeaways.
    #[serde(default)]
    pub key_takeaways: Vec<String>,
    /// Per-section summaries.
    #[serde(default)]
    pub sections: Vec<ContentSection>,
    /// Notable links found in the body.
    #[serde(default)]
    pub links: Vec<Link>,
}

/// One newsletter's entry within a generated digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestEntry {
    /// Which newsletter this entry summarizes (sender or publication name).
    pub source: String,
    /// Headline for the entry.
    pub headline: String,
    /// Prose summary.
    pub summary: String,
    /// Most relevant links, in order.
    #[serde(default)]
    pub top_links: Vec<Link>,
}

/// A generated digest over a batch of extracted newsletters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    /// Human-readable label for the period the digest covers.
    pub period_covered: String,
    /// Cross-newsletter highlights, in order.
    #[serde(default)]
    pub highlights: Vec<String>,
    /// One entry per input newsletter.
    #[serde(default)]
    pub newsletters: Vec<DigestEntry>,
    /// Short closing note.
    #[serde(default)]
    pub closing_note: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_content_roundtrip() {
        let content = ExtractedContent {
            topics: vec!["AI".to_string(), "Rust".to_string()],
            key_takeaways: vec!["Borrowing is hard".to_string()],
            sections: vec![ContentSection {
                heading: "This week".to_string(),
                summary: "Things happened.".to_string(),
            }],
            links: vec![Link {
                title: "Release notes".to_string(),
                url: Some("https://example.com/notes".to_string()),
            }],
        };

        let json = serde_json::to_string(&content).unwrap();
        let back: ExtractedContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn test_digest_tolerates_missing_optional_fields() {
        let json = r#"{
            "period_covered": "Aug 1 - Aug 7",
            "newsletters": [
                {"source": "AI Weekly", "headline": "Big week", "summary": "..."}
            ]
        }"#;
        let digest: Digest = serde_json::from_str(json).unwrap();
        assert_eq!(digest.period_covered, "Aug 1 - Aug 7");
        assert!(digest.highlights.is_empty());
        assert!(digest.newsletters[0].top_links.is_empty());
        assert!(digest.closing_note.is_empty());
    }
}

//! Quality gate deciding whether extracted content is worth returning.

use std::fmt;

use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};

/// Phrases that mean the page still needs rendering or a subscription.
const BLOCKED_PHRASES: &[&str] = &[
    "enable javascript",
    "javascript is required",
    "javascript is disabled",
    "please enable js",
    "requires javascript",
    "this content is for subscribers",
    "subscribers only",
    "subscribe to continue reading",
    "to continue reading, subscribe",
    "already a subscriber? log in",
    "loading player",
    "video player is loading",
    "media playback is unsupported",
];

/// Elements that break the text flow; inline elements join their text as is.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Per-strategy acceptance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPolicy {
    /// Minimum plain text length in characters.
    pub min_text_length: usize,
    /// Minimum number of non-empty paragraph blocks (0 disables the check).
    pub min_paragraphs: usize,
}

impl QualityPolicy {
    pub const fn new(min_text_length: usize, min_paragraphs: usize) -> Self {
        Self {
            min_text_length,
            min_paragraphs,
        }
    }
}

/// Why content was judged insufficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooShort { length: usize, floor: usize },
    TooFewParagraphs { count: usize, minimum: usize },
    BlockedPhrase(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { length, floor } => {
                write!(f, "text too short ({} < {} chars)", length, floor)
            }
            Self::TooFewParagraphs { count, minimum } => {
                write!(f, "too few paragraphs ({} < {})", count, minimum)
            }
            Self::BlockedPhrase(phrase) => write!(f, "contains \"{}\"", phrase),
        }
    }
}

/// Plain text view of an extracted fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub text: String,
    pub paragraphs: usize,
}

/// Stateless classifier over extracted content.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityGate;

impl QualityGate {
    /// Strip markup from an HTML fragment and count its paragraph blocks.
    pub fn assess(html: &str) -> Assessment {
        let fragment = Html::parse_fragment(html);
        let text = normalize_whitespace(&flow_text(&fragment));

        let paragraphs = match Selector::parse("p") {
            Ok(selector) => fragment
                .select(&selector)
                .filter(|p| p.text().any(|t| !t.trim().is_empty()))
                .count(),
            Err(_) => 0,
        };

        Assessment { text, paragraphs }
    }

    /// Accept or reject plain text under a policy.
    pub fn check(policy: &QualityPolicy, text: &str, paragraphs: usize) -> Result<(), Rejection> {
        let length = text.chars().count();
        if length < policy.min_text_length {
            return Err(Rejection::TooShort {
                length,
                floor: policy.min_text_length,
            });
        }

        if policy.min_paragraphs > 0 && paragraphs < policy.min_paragraphs {
            return Err(Rejection::TooFewParagraphs {
                count: paragraphs,
                minimum: policy.min_paragraphs,
            });
        }

        let lower = text.to_lowercase();
        if let Some(phrase) = BLOCKED_PHRASES.iter().copied().find(|p| lower.contains(p)) {
            return Err(Rejection::BlockedPhrase(phrase));
        }

        Ok(())
    }

    /// Assess and check in one go.
    pub fn evaluate(policy: &QualityPolicy, html: &str) -> Result<Assessment, Rejection> {
        let assessment = Self::assess(html);
        Self::check(policy, &assessment.text, assessment.paragraphs)?;
        Ok(assessment)
    }
}

fn is_block(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|el| BLOCK_TAGS.contains(&el.name()))
}

/// Concatenated text with a break at every block boundary.
fn flow_text(fragment: &Html) -> String {
    let mut text = String::new();
    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(t) => {
                if node.prev_sibling().is_some_and(|s| is_block(s.value())) {
                    text.push(' ');
                }
                text.push_str(t);
            }
            other if is_block(other) => text.push(' '),
            _ => {}
        }
    }
    text
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(count: usize, words: usize) -> String {
        (0..count)
            .map(|i| format!("<p>{}</p>", format!("word{} ", i).repeat(words)))
            .collect()
    }

    const LIVE: QualityPolicy = QualityPolicy::new(500, 3);
    const LAST_RESORT: QualityPolicy = QualityPolicy::new(100, 0);

    #[test]
    fn assess_strips_markup_and_counts_paragraphs() {
        let a = QualityGate::assess("<h1>Title</h1><p>One <b>two</b></p>\n<p>  </p><div><p>three</p></div>");
        assert_eq!(a.text, "Title One two three");
        assert_eq!(a.paragraphs, 2);
    }

    #[test]
    fn inline_markup_adds_no_spaces() {
        let a = QualityGate::assess("<p>Water is <b>rising</b>.</p><p>Don&#39;t <a href='#'>wait</a>.</p>");
        assert_eq!(a.text, "Water is rising. Don't wait.");
    }

    #[test]
    fn text_after_a_block_is_separated() {
        let a = QualityGate::assess("<div><p>one</p>two<br>three</div>");
        assert_eq!(a.text, "one two three");
    }

    #[test]
    fn accepts_substantial_content() {
        let html = paragraphs(4, 40);
        assert!(QualityGate::evaluate(&LIVE, &html).is_ok());
    }

    #[test]
    fn rejects_short_text() {
        let err = QualityGate::evaluate(&LIVE, "<p>short</p><p>a</p><p>b</p>").unwrap_err();
        assert!(matches!(err, Rejection::TooShort { floor: 500, .. }));
    }

    #[test]
    fn rejects_loading_shell_with_few_paragraphs() {
        let html = format!("<div>{}</div><p>only one</p>", "filler text ".repeat(80));
        let err = QualityGate::evaluate(&LIVE, &html).unwrap_err();
        assert_eq!(err, Rejection::TooFewParagraphs { count: 1, minimum: 3 });
    }

    #[test]
    fn paragraph_check_disabled_for_later_strategies() {
        let html = format!("<div>{}</div>", "filler text ".repeat(20));
        assert!(QualityGate::evaluate(&LAST_RESORT, &html).is_ok());
    }

    #[test]
    fn rejects_blocked_phrases_case_insensitively() {
        let html = format!(
            "{}<p>Please ENABLE JAVASCRIPT to view this page.</p>",
            paragraphs(5, 30)
        );
        let err = QualityGate::evaluate(&LIVE, &html).unwrap_err();
        assert_eq!(err, Rejection::BlockedPhrase("enable javascript"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let text = "é".repeat(100);
        assert!(QualityGate::check(&LAST_RESORT, &text, 0).is_ok());
        assert!(QualityGate::check(&LAST_RESORT, &"é".repeat(99), 0).is_err());
    }
}

//! Noise removal: page chrome, paywall overlays, clamp styling and
//! boilerplate labels.

use std::sync::LazyLock;

use dom_query::{Document, Selection};

/// Page chrome removed from the whole document before the main node is chosen.
const STRUCTURAL: &str = "script, noscript, style, svg, nav, footer, header, aside, iframe, \
     form, button, [role='banner'], [role='navigation'], [role='complementary']";

/// Chrome removed again inside the selected node.
const SECONDARY: &str = "style, nav, footer, iframe, header, aside, form, button";

/// Class/id fragments marking overlays, paywalls, ads and recommendation rails.
/// Matching is substring based and deliberately broad.
pub const NOISE_PATTERNS: &[&str] = &[
    "paywall",
    "subscribe",
    "subscription",
    "metered",
    "piano",
    "gate",
    "regwall",
    "login-wall",
    "premium-content",
    "truncated",
    "fade-out",
    "fadeout",
    "gradient-overlay",
    "article-limit",
    "nag",
    "prompt",
    "modal",
    "overlay",
    "popup",
    "cookie",
    "consent",
    "newsletter",
    "signup",
    "ad-",
    "ads-",
    "advert",
    "taboola",
    "outbrain",
    "recommend",
];

/// Leaf labels that carry no article text.
const BOILERPLATE_LABELS: &[&str] = &["Advertisement", "Supported by", "Related Content"];
const BOILERPLATE_PREFIX: &str = "See more on:";

static NOISE_SELECTOR: LazyLock<String> = LazyLock::new(|| {
    NOISE_PATTERNS
        .iter()
        .map(|p| format!("[class*='{p}'], [id*='{p}']"))
        .collect::<Vec<_>>()
        .join(", ")
});

fn remove_all(selection: &Selection) {
    for node in selection.nodes() {
        Selection::from((*node).clone()).remove();
    }
}

/// Drop scripts, styles, navigation and other page chrome.
pub fn strip_structural(doc: &Document) {
    remove_all(&doc.select(STRUCTURAL));
}

/// Drop every descendant of `scope` whose class or id looks like noise.
///
/// Scoped to descendants so a flagged `<body>` or `<html>` never takes the
/// whole page with it.
pub fn strip_noise(scope: &Selection) {
    remove_all(&scope.select(NOISE_SELECTOR.as_str()));
}

/// Undo CSS that hides or truncates article text.
pub fn neutralize_clamps(doc: &Document) {
    for node in doc.select("[style]").nodes() {
        let el = Selection::from((*node).clone());
        let Some(style) = el.attr("style") else {
            continue;
        };
        if is_clamp_style(&style) {
            el.remove_attr("style");
        }
    }

    for node in doc.select("[class]").nodes() {
        let el = Selection::from((*node).clone());
        let Some(class) = el.attr("class") else {
            continue;
        };
        let kept: Vec<&str> = class
            .split_whitespace()
            .filter(|c| !is_clamp_class(c))
            .collect();
        if kept.len() == class.split_whitespace().count() {
            continue;
        }
        if kept.is_empty() {
            el.remove_attr("class");
        } else {
            el.set_attr("class", &kept.join(" "));
        }
    }
}

fn is_clamp_style(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("overflow:hidden")
        || compact.contains("max-height")
        || compact.contains("line-clamp")
}

fn is_clamp_class(class: &str) -> bool {
    class == "truncate" || class == "overflow-hidden" || class.starts_with("line-clamp")
}

/// Remove residual chrome and boilerplate labels inside the chosen node.
pub fn strip_boilerplate(main: &Selection) {
    remove_all(&main.select(SECONDARY));

    for node in main.select("*").nodes() {
        let el = Selection::from((*node).clone());
        if el.children().length() > 0 {
            continue;
        }
        let text = el.text();
        let text = text.trim();
        if BOILERPLATE_LABELS.contains(&text) || text.starts_with(BOILERPLATE_PREFIX) {
            el.remove();
        }
    }
}

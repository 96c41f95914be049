//! Title resolution.

use dom_query::{Document, Selection};

pub const UNTITLED: &str = "Untitled Document";

/// First non-empty title from, in order: `og:title`, `<title>`, the page's
/// first `h1`, the first `h1`/`h2` inside the main node.
pub fn resolve_title(doc: &Document, main: &Selection) -> String {
    let og = doc
        .select("meta[property='og:title']")
        .attr("content")
        .map(|t| t.to_string());

    [
        og,
        Some(doc.select("title").first().text().to_string()),
        Some(doc.select("h1").first().text().to_string()),
        Some(main.select("h1, h2").first().text().to_string()),
    ]
    .into_iter()
    .flatten()
    .map(|t| collapse(&t))
    .find(|t| !t.is_empty())
    .unwrap_or_else(|| UNTITLED.to_string())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

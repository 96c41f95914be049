//! Reference normalization for links and images.

use dom_query::Selection;
use url::Url;

/// Lazy-loading attributes consulted when an image has no `src`.
const LAZY_SRC_ATTRS: &[&str] = &["data-src", "data-lazy-src"];

/// Whether a reference should be resolved against the page URL.
///
/// Empty values, fragments, `data:`/`mailto:`/`javascript:` references and
/// anything already absolute are left alone.
pub fn needs_resolution(reference: &str) -> bool {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') {
        return false;
    }
    let lower = reference.to_ascii_lowercase();
    if ["data:", "mailto:", "javascript:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return false;
    }
    Url::parse(reference).is_err()
}

/// Resolve `reference` against `base`, or return it unchanged.
pub fn resolve(reference: &str, base: &Url) -> String {
    if !needs_resolution(reference) {
        return reference.to_string();
    }
    match base.join(reference.trim()) {
        Ok(url) => url.to_string(),
        Err(_) => reference.to_string(),
    }
}

/// Absolutize image sources and link targets under `main`, and open every
/// link in a new browsing context.
pub fn normalize(main: &Selection, base: &Url) {
    for node in main.select("img").nodes() {
        let img = Selection::from((*node).clone());
        let src = img
            .attr("src")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                LAZY_SRC_ATTRS.iter().find_map(|attr| {
                    img.attr(attr)
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                })
            });
        if let Some(src) = src {
            img.set_attr("src", &resolve(&src, base));
        }
    }

    for node in main.select("a").nodes() {
        let link = Selection::from((*node).clone());
        if let Some(href) = link.attr("href") {
            if needs_resolution(&href) {
                let resolved = resolve(&href, base);
                link.set_attr("href", &resolved);
            }
        }
        link.set_attr("target", "_blank");
        link.set_attr("rel", "noopener noreferrer");
    }
}

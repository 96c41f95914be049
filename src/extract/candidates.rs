//! Main-content node selection.

use dom_query::{Document, Selection};

/// One rule of the candidate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRule {
    pub selector: &'static str,
    /// Visible text must be strictly longer than this many characters.
    pub min_text_length: usize,
}

impl CandidateRule {
    pub const fn new(selector: &'static str, min_text_length: usize) -> Self {
        Self {
            selector,
            min_text_length,
        }
    }
}

const DEFAULT_MIN_TEXT: usize = 100;

pub const DEFAULT_RULES: &[CandidateRule] = &[
    CandidateRule::new("article", DEFAULT_MIN_TEXT),
    CandidateRule::new("main", DEFAULT_MIN_TEXT),
    CandidateRule::new("[class*='article-body']", DEFAULT_MIN_TEXT),
    CandidateRule::new("[class*='article-content']", DEFAULT_MIN_TEXT),
    CandidateRule::new("[class*='story-body']", DEFAULT_MIN_TEXT),
    CandidateRule::new("[class*='entry-content']", DEFAULT_MIN_TEXT),
    CandidateRule::new("[itemprop='articleBody']", DEFAULT_MIN_TEXT),
    CandidateRule::new("[class*='content']", DEFAULT_MIN_TEXT),
    CandidateRule::new("[class*='post']", DEFAULT_MIN_TEXT),
];

/// Which stage of the search produced the main node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    Rule(&'static str),
    LargestContainer,
    Body,
}

/// Ordered (selector, minimum length) pairs plus the container fallback.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    rules: Vec<CandidateRule>,
    container_min_text: usize,
}

impl Default for CandidateSet {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.to_vec(),
            container_min_text: DEFAULT_MIN_TEXT,
        }
    }
}

impl CandidateSet {
    pub fn new(rules: Vec<CandidateRule>, container_min_text: usize) -> Self {
        Self {
            rules,
            container_min_text,
        }
    }

    pub fn rules(&self) -> &[CandidateRule] {
        &self.rules
    }

    /// Pick the main content node of `doc`.
    ///
    /// Rules are tried in order and every match of a rule is considered in
    /// document order. Without a match the largest `div`/`section` by text
    /// wins, and failing that the body.
    ///
    /// A candidate is only taken when it actually discards something: if it
    /// holds nearly all of the body's text, or the body carries article
    /// blocks of its own beside it, the document is already just an article
    /// and the body is kept whole.
    pub fn select<'a>(&self, doc: &'a Document) -> (Selection<'a>, Selected) {
        let body = doc.select("body");
        let root = if body.exists() { body } else { doc.select("html") };

        match self.candidate(doc) {
            Some((candidate, how)) if !already_article(&root, &candidate) => (candidate, how),
            _ => (root, Selected::Body),
        }
    }

    fn candidate<'a>(&self, doc: &'a Document) -> Option<(Selection<'a>, Selected)> {
        for rule in &self.rules {
            let Some(matches) = doc.try_select(rule.selector) else {
                continue;
            };
            for node in matches.nodes() {
                let candidate = Selection::from((*node).clone());
                if visible_len(&candidate) > rule.min_text_length {
                    return Some((candidate, Selected::Rule(rule.selector)));
                }
            }
        }

        let mut best: Option<(usize, Selection<'a>)> = None;
        for node in doc.select("div, section").nodes() {
            let candidate = Selection::from((*node).clone());
            let len = visible_len(&candidate);
            if len > self.container_min_text && best.as_ref().map_or(true, |(l, _)| len > *l) {
                best = Some((len, candidate));
            }
        }
        best.map(|(_, container)| (container, Selected::LargestContainer))
    }
}

/// Block elements that only appear directly under `body` once a page has
/// been reduced to its article.
const LOOSE_BLOCKS: &str = "p, h1, h2, h3, h4, h5, h6, blockquote, ul, ol, pre, table, figure";

/// Text outside the candidate may be at most a tenth of the candidate's.
const DOMINANCE_SLACK: usize = 10;

fn already_article(root: &Selection, candidate: &Selection) -> bool {
    let Some(target) = candidate.nodes().first().map(|n| n.id) else {
        return true;
    };
    if root.nodes().iter().any(|n| n.id == target) {
        return true;
    }

    let root_len = visible_len(root);
    let candidate_len = visible_len(candidate);
    if root_len <= candidate_len + candidate_len / DOMINANCE_SLACK {
        return true;
    }

    root.children().nodes().iter().any(|child| {
        let child = Selection::from((*child).clone());
        let holds_candidate = child.nodes().iter().any(|n| n.id == target)
            || child.select("*").nodes().iter().any(|n| n.id == target);
        !holds_candidate && child.is(LOOSE_BLOCKS) && visible_len(&child) > 0
    })
}

/// Length of the whitespace-normalized text of a node, in characters.
pub fn visible_len(sel: &Selection) -> usize {
    let text = sel.text();
    let mut len = 0;
    for (i, word) in text.split_whitespace().enumerate() {
        if i > 0 {
            len += 1;
        }
        len += word.chars().count();
    }
    len
}

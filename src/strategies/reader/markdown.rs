//! Minimal converter for the lightweight markup reader proxies return.
//!
//! Covers what those services emit: ATX and setext headings, paragraphs,
//! emphasis, code spans and fences, links, images, lists, block quotes and
//! horizontal rules. Text is escaped before inline rules run, so nothing in
//! the payload can inject markup of its own.

use std::sync::LazyLock;

use regex::Regex;

static ATX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").unwrap());
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:\*\s*){3,}|(?:-\s*){3,}|(?:_\s*){3,})$").unwrap());
static SETEXT_H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^=+\s*$").unwrap());
static SETEXT_H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-+\s*$").unwrap());
static UNORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*+]\s+(.*)$").unwrap());
static ORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,9}[.)]\s+(.*)$").unwrap());

// Targets may hold one level of balanced parentheses, as wiki URLs do.
static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(((?:[^()\s]|\([^()\s]*\))+)(?:\s[^)]*)?\)").unwrap()
});
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(((?:[^()\s]|\([^()\s]*\))+)(?:\s[^)]*)?\)").unwrap()
});
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").unwrap());
static EMPHASIS_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\s][^*]*)\*").unwrap());
static EMPHASIS_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s(])_([^_\s][^_]*)_($|[\s).,!?:;])").unwrap());

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline rules for one line. Code spans are escaped but otherwise left alone.
fn inline(text: &str) -> String {
    let mut out = String::new();
    for (i, segment) in text.split('`').enumerate() {
        let escaped = escape_html(segment);
        if i % 2 == 1 {
            out.push_str("<code>");
            out.push_str(&escaped);
            out.push_str("</code>");
        } else {
            out.push_str(&inline_rules(&escaped));
        }
    }
    out
}

fn inline_rules(escaped: &str) -> String {
    let s = IMAGE.replace_all(escaped, r#"<img src="$2" alt="$1">"#);
    let s = LINK.replace_all(&s, r#"<a href="$2">$1</a>"#);
    let s = STRONG.replace_all(&s, "<strong>$1$2</strong>");
    let s = EMPHASIS_STAR.replace_all(&s, "<em>$1</em>");
    EMPHASIS_UNDERSCORE
        .replace_all(&s, "$1<em>$2</em>$3")
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Unordered => "ul",
            Self::Ordered => "ol",
        }
    }
}

#[derive(Default)]
struct Blocks {
    html: String,
    paragraph: Vec<String>,
    quote: Vec<String>,
    list: Option<(ListKind, Vec<String>)>,
    fence: Option<Vec<String>>,
}

impl Blocks {
    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            let text = self.paragraph.join(" ");
            self.html.push_str(&format!("<p>{}</p>\n", inline(&text)));
            self.paragraph.clear();
        }
    }

    fn flush_quote(&mut self) {
        if !self.quote.is_empty() {
            let text = self.quote.join(" ");
            self.html
                .push_str(&format!("<blockquote><p>{}</p></blockquote>\n", inline(&text)));
            self.quote.clear();
        }
    }

    fn flush_list(&mut self) {
        if let Some((kind, items)) = self.list.take() {
            self.html.push_str(&format!("<{}>\n", kind.tag()));
            for item in items {
                self.html.push_str(&format!("<li>{}</li>\n", inline(&item)));
            }
            self.html.push_str(&format!("</{}>\n", kind.tag()));
        }
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_quote();
        self.flush_list();
    }

    fn push_item(&mut self, kind: ListKind, item: &str) {
        self.flush_paragraph();
        self.flush_quote();
        match &mut self.list {
            Some((current, items)) if *current == kind => items.push(item.to_string()),
            _ => {
                self.flush_list();
                self.list = Some((kind, vec![item.to_string()]));
            }
        }
    }

    fn heading(&mut self, level: usize, text: &str) {
        self.flush();
        self.html
            .push_str(&format!("<h{level}>{}</h{level}>\n", inline(text.trim())));
    }
}

/// Convert reader markup to an HTML fragment.
pub fn to_html(markup: &str) -> String {
    let mut blocks = Blocks::default();

    for raw in markup.lines() {
        let line = raw.trim_end();

        if let Some(code) = blocks.fence.as_mut() {
            if line.trim_start().starts_with("```") {
                let body = escape_html(&code.join("\n"));
                blocks.fence = None;
                blocks.html.push_str(&format!("<pre><code>{}</code></pre>\n", body));
            } else {
                code.push(raw.to_string());
            }
            continue;
        }

        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            blocks.flush();
            continue;
        }

        if trimmed.starts_with("```") {
            blocks.flush();
            blocks.fence = Some(Vec::new());
            continue;
        }

        if !blocks.paragraph.is_empty() {
            let level = if SETEXT_H1.is_match(trimmed) {
                Some(1)
            } else if SETEXT_H2.is_match(trimmed) {
                Some(2)
            } else {
                None
            };
            if let Some(level) = level {
                let text = blocks.paragraph.join(" ");
                blocks.paragraph.clear();
                blocks.heading(level, &text);
                continue;
            }
        }

        if let Some(caps) = ATX_HEADING.captures(trimmed) {
            blocks.heading(caps[1].len(), &caps[2]);
        } else if HORIZONTAL_RULE.is_match(trimmed) {
            blocks.flush();
            blocks.html.push_str("<hr>\n");
        } else if let Some(quoted) = trimmed.strip_prefix('>') {
            blocks.flush_paragraph();
            blocks.flush_list();
            blocks.quote.push(quoted.trim().to_string());
        } else if let Some(caps) = UNORDERED_ITEM.captures(trimmed) {
            blocks.push_item(ListKind::Unordered, &caps[1]);
        } else if let Some(caps) = ORDERED_ITEM.captures(trimmed) {
            blocks.push_item(ListKind::Ordered, &caps[1]);
        } else {
            blocks.flush_quote();
            blocks.flush_list();
            blocks.paragraph.push(trimmed.to_string());
        }
    }

    if let Some(code) = blocks.fence.take() {
        let body = escape_html(&code.join("\n"));
        blocks.html.push_str(&format!("<pre><code>{}</code></pre>\n", body));
    }
    blocks.flush();
    blocks.html
}

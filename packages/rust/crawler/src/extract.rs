//! HTML → text extraction.
//!
//! [`page_text`] produces the readable body text handed to the summarizer.
//! [`messaging_lines`] picks out the short marketing lines (title, headings,
//! hero copy, calls to action) tracked by the landing-page watcher.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// Elements whose text is page chrome, not content.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "nav", "footer", "header", "aside",
];

/// Upper bound on tracked messaging lines per page.
const MAX_MESSAGING_LINES: usize = 60;

static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["main", "article", r#"[role="main"]"#, "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

static MESSAGING: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"title, h1, h2, h3, header p, [class*="hero"] p, button, a[class*="cta"]"#)
        .expect("static selector")
});

/// Extract readable text from the main content area, one text run per line.
pub fn page_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let Some(root) = CONTENT_ROOTS
        .iter()
        .find_map(|sel| doc.select(sel).next())
    else {
        return String::new();
    };

    let mut lines = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIP_TAGS.contains(&el.name()))
        });
        if skipped {
            continue;
        }
        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Extract the de-duplicated messaging lines of a landing page, in document order.
pub fn messaging_lines(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut lines: Vec<String> = Vec::new();

    for el in doc.select(&MESSAGING) {
        let line = element_text(el);
        if line.is_empty() || lines.contains(&line) {
            continue;
        }
        lines.push(line);
        if lines.len() == MAX_MESSAGING_LINES {
            break;
        }
    }

    lines
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

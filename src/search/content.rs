//! Visible-text extraction from fetched HTML pages.

use scraper::{Html, Node};

/// Elements whose text is never shown to a reader.
const HIDDEN_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "head",
];

/// Collect the visible text of `html`, one trimmed text run per line.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        lines.extend(text.lines().map(str::trim).filter(|line| !line.is_empty()));
    }

    lines.join("\n")
}

/// First `max_lines` lines of the page text, capped at `max_chars`.
pub fn excerpt(html: &str, max_lines: usize, max_chars: usize) -> String {
    let text = visible_text(html);
    let joined = text.lines().take(max_lines).collect::<Vec<_>>().join("\n");
    super::http::truncate_chars(&joined, max_chars)
}

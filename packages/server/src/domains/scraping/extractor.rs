//! HTML to structured page extraction.
//!
//! Strips site chrome (header/footer/nav, cookie banners, sidebars) and pulls
//! the metadata the chatbot stores alongside the page text. Extraction never
//! fails: anything missing from the document comes back as `None`.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Elements whose text never counts as page content
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Class-name fragments that mark boilerplate blocks
const BOILERPLATE_CLASS_MARKERS: &[&str] = &["cookie", "sidebar"];

/// A page after extraction, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub url: String,
    /// First `<h1>` on the page
    pub name: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    /// Visible text, one text node per line
    pub content: String,
}

impl ExtractedPage {
    /// Characters of extracted content (what the status counters track)
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Extract a page from raw HTML.
pub fn extract_page(raw_html: &str, source_url: &str) -> ExtractedPage {
    let mut document = Html::parse_document(raw_html);

    // H1 is read before boilerplate removal so a heading inside <header> still counts
    let name = first_text(&document, "h1");

    remove_boilerplate(&mut document);

    let meta_title = first_text(&document, "title");
    let meta_description = meta_content(&document, "description");
    let meta_keywords = meta_content(&document, "keywords");
    let content = visible_text(&document);

    ExtractedPage {
        url: source_url.to_string(),
        name,
        meta_title,
        meta_description,
        meta_keywords,
        content,
    }
}

/// Detach header/footer/nav, cookie/sidebar blocks and paragraphs mentioning cookies.
fn remove_boilerplate(document: &mut Html) {
    detach_matching(document, "header, footer, nav", |_| true);

    detach_matching(document, "[class]", |el| {
        let class = el.value().attr("class").unwrap_or_default().to_lowercase();
        BOILERPLATE_CLASS_MARKERS
            .iter()
            .any(|marker| class.contains(marker))
    });

    detach_matching(document, "p", |el| {
        el.text().collect::<String>().to_lowercase().contains("cookie")
    });
}

fn detach_matching<F>(document: &mut Html, selector: &str, predicate: F)
where
    F: Fn(&ElementRef) -> bool,
{
    let Ok(selector) = Selector::parse(selector) else {
        return;
    };

    let ids: Vec<_> = document
        .select(&selector)
        .filter(|el| predicate(el))
        .map(|el| el.id())
        .collect();

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Whitespace-collapsed text of the first element matching `selector`.
fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
}

/// `content` of `<meta name="...">`, name compared case-insensitively.
fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse("meta[name]").ok()?;
    document
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    root.descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
                    Node::Element(el) => INVISIBLE_ELEMENTS.contains(&el.name()),
                    _ => false,
                });
                if hidden {
                    None
                } else {
                    Some(text.trim())
                }
            }
            _ => None,
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

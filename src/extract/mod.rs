pub mod faq;
pub mod logo;


use crate::page::PageContent;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// Maximum number of characters of main-content text kept per page.
/// Bounds the size of the request sent to the AI API.
pub const MAX_CONTENT_CHARS: usize = 50_000;

/// Navigation and boilerplate elements removed before text extraction
const REMOVE_SELECTORS: &[&str] = &[
    "nav",
    "header",
    "footer",
    "[role=\"navigation\"]",
    "[role=\"banner\"]",
    "[role=\"contentinfo\"]",
    ".nav",
    ".navbar",
    ".navigation",
    ".menu",
    ".header",
    ".footer",
    "#nav",
    "#navbar",
    "#navigation",
    "#menu",
    "#header",
    "#footer",
    ".site-header",
    ".site-footer",
    ".page-header",
    ".page-footer",
    ".main-navigation",
    ".primary-navigation",
    ".secondary-navigation",
    ".sidebar",
    ".widget",
    ".cookie-banner",
    ".cookie-notice",
    "[class*=\"cookie\"]",
    "[id*=\"cookie\"]",
    ".breadcrumb",
    ".breadcrumbs",
];

/// Extracts a [`PageContent`] snapshot from raw HTML.
///
/// Never fails: any selector miss is treated as "field absent". The
/// document is parsed into a detached tree, so this is a read-only
/// operation from the caller's point of view.
pub fn extract(html: &str, page_url: &Url) -> PageContent {
    let mut doc = Html::parse_document(html);
    strip_boilerplate(&mut doc);

    let title = first_text(&doc, "title");
    let meta_description = meta_content(&doc, "meta[name=\"description\"]");
    let h1 = all_texts(&doc, "h1");

    let content = main_content_text(&doc);
    let faqs = faq::extract_faqs(&doc);
    let logo = logo::resolve_logo(&doc, page_url).unwrap_or_default();

    let json_ld = json_ld_blocks(&doc);
    let author = extract_author(&doc, &json_ld);
    let date_published = meta_property(&doc, "article:published_time")
        .or_else(|| json_ld_string(&json_ld, "datePublished"));
    let date_modified = meta_property(&doc, "article:modified_time")
        .or_else(|| json_ld_string(&json_ld, "dateModified"));

    ::log::debug!(
        "extracted page: title={:?} h1s={} content_chars={} faqs={} logo={:?}",
        title,
        h1.len(),
        content.len(),
        faqs.len(),
        logo
    );

    PageContent {
        title,
        meta_description,
        h1,
        content,
        faqs,
        logo,
        author,
        date_published,
        date_modified,
    }
}

/// Detaches all elements matching the boilerplate selector list
fn strip_boilerplate(doc: &mut Html) {
    let ids: Vec<_> = REMOVE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|sel| doc.select(&sel).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Flattens the primary content region's text, collapsing whitespace and
/// truncating to [`MAX_CONTENT_CHARS`]. Tries `<main>`, `<article>`,
/// `[role=main]`, then falls back to the body.
fn main_content_text(doc: &Html) -> String {
    let region_selectors = ["main", "article", "[role=\"main\"]", "body"];

    for raw in region_selectors {
        let sel = match Selector::parse(raw) {
            Ok(sel) => sel,
            Err(_) => continue,
        };
        if let Some(region) = doc.select(&sel).next() {
            let text = region
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() && raw != "body" {
                continue;
            }
            return truncate_chars(&text, MAX_CONTENT_CHARS);
        }
    }

    String::new()
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

/// Parses every `<script type="application/ld+json">` block, flattening
/// top-level arrays into individual items. Invalid JSON is skipped.
pub(crate) fn json_ld_blocks(doc: &Html) -> Vec<Value> {
    let sel = match Selector::parse("script[type=\"application/ld+json\"]") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    let mut items = Vec::new();
    for script in doc.select(&sel) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(arr)) => items.extend(arr),
            Ok(value) => items.push(value),
            Err(e) => ::log::trace!("skipping invalid JSON-LD block: {}", e),
        }
    }
    items
}

fn extract_author(doc: &Html, json_ld: &[Value]) -> Option<String> {
    let meta = meta_content(doc, "meta[name=\"author\"]");
    if !meta.is_empty() {
        return Some(meta);
    }

    for item in json_ld {
        match item.get("author") {
            Some(Value::String(name)) if !name.is_empty() => return Some(name.clone()),
            Some(Value::Object(obj)) => {
                if let Some(Value::String(name)) = obj.get("name") {
                    if !name.is_empty() {
                        return Some(name.clone());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn json_ld_string(json_ld: &[Value], key: &str) -> Option<String> {
    json_ld
        .iter()
        .filter_map(|item| item.get(key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First matching element's text content, trimmed
fn first_text(doc: &Html, selector: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| {
            doc.select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

/// All matching elements' texts, trimmed, non-empty only
fn all_texts(doc: &Html, selector: &str) -> Vec<String> {
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            doc.select(&sel)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// `content` attribute of the first element matching `selector`
fn meta_content(doc: &Html, selector: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| {
            doc.select(&sel)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|c| c.trim().to_string())
        })
        .unwrap_or_default()
}

fn meta_property(doc: &Html, property: &str) -> Option<String> {
    let selector = format!("meta[property=\"{}\"]", property);
    let content = meta_content(doc, &selector);
    if content.is_empty() { None } else { Some(content) }
}

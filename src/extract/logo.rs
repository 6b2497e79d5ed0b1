//! Organization logo resolution.
//!
//! Precedence: JSON-LD `Organization.logo`, then an `<img>` matched by
//! logo-related class/id/alt heuristics, then social-card images, then
//! apple-touch-icon, then favicon. Relative URLs are resolved against the
//! page's own address.

use super::json_ld_blocks;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

pub fn resolve_logo(doc: &Html, page_url: &Url) -> Option<String> {
    let candidate = logo_from_json_ld(doc)
        .or_else(|| logo_from_img(doc))
        .or_else(|| social_card_image(doc))
        .or_else(|| link_href(doc, "link[rel=\"apple-touch-icon\"]"))
        .or_else(|| link_href(doc, "link[rel=\"icon\"]"))
        .or_else(|| link_href(doc, "link[rel=\"shortcut icon\"]"))?;

    Some(absolutize(&candidate, page_url))
}

/// `Organization.logo` is either a plain URL string or an object with a
/// `url` property
fn logo_from_json_ld(doc: &Html) -> Option<String> {
    for item in json_ld_blocks(doc) {
        if item.get("@type").and_then(Value::as_str) != Some("Organization") {
            continue;
        }
        match item.get("logo") {
            Some(Value::String(url)) if !url.is_empty() => return Some(url.clone()),
            Some(Value::Object(obj)) => {
                if let Some(Value::String(url)) = obj.get("url") {
                    if !url.is_empty() {
                        return Some(url.clone());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// First `<img>` whose class, id, or alt text mentions a logo
fn logo_from_img(doc: &Html) -> Option<String> {
    let sel = Selector::parse("img").ok()?;
    doc.select(&sel)
        .find(|img| {
            ["class", "id", "alt"].iter().any(|attr| {
                img.value()
                    .attr(attr)
                    .map(|v| v.to_lowercase().contains("logo"))
                    .unwrap_or(false)
            })
        })
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

fn social_card_image(doc: &Html) -> Option<String> {
    meta_attr(doc, "meta[property=\"og:image\"]")
        .or_else(|| meta_attr(doc, "meta[name=\"twitter:image\"]"))
        .or_else(|| meta_attr(doc, "meta[property=\"twitter:image\"]"))
}

fn meta_attr(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn link_href(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

fn absolutize(candidate: &str, page_url: &Url) -> String {
    if candidate.starts_with("http") {
        return candidate.to_string();
    }
    match page_url.join(candidate) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => candidate.to_string(),
    }
}

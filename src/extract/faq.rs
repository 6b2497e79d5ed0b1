//! FAQ pair extraction.
//!
//! Three tiers, first non-empty wins:
//! 1. JSON-LD blocks typed `FAQPage`
//! 2. native `<details>`/`<summary>` disclosure widgets
//! 3. heuristic scan of accordion-like containers, scored by how strongly
//!    the surrounding markup suggests an FAQ section

use super::json_ld_blocks;
use crate::page::FaqPair;
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

/// Upper bound on pairs kept from any single page
pub const MAX_FAQ_PAIRS: usize = 20;

/// Answers shorter than this are treated as noise
const MIN_ANSWER_CHARS: usize = 20;

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

const INTERROGATIVES: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "which", "can", "do", "does", "is", "are",
    "should", "will",
];

pub fn extract_faqs(doc: &Html) -> Vec<FaqPair> {
    let from_json_ld = faqs_from_json_ld(doc);
    if !from_json_ld.is_empty() {
        return cap(from_json_ld);
    }

    let from_details = faqs_from_details(doc);
    if !from_details.is_empty() {
        return cap(from_details);
    }

    cap(faqs_from_accordions(doc))
}

fn cap(mut faqs: Vec<FaqPair>) -> Vec<FaqPair> {
    faqs.truncate(MAX_FAQ_PAIRS);
    faqs
}

/// Tier 1: `FAQPage` JSON-LD with a `mainEntity` list; each item must carry
/// both a `name` and an `acceptedAnswer.text`.
fn faqs_from_json_ld(doc: &Html) -> Vec<FaqPair> {
    let mut faqs = Vec::new();

    for item in json_ld_blocks(doc) {
        if item.get("@type").and_then(Value::as_str) != Some("FAQPage") {
            continue;
        }
        let Some(main_entity) = item.get("mainEntity") else {
            continue;
        };
        let questions: Vec<&Value> = match main_entity {
            Value::Array(arr) => arr.iter().collect(),
            other => vec![other],
        };
        for q in questions {
            let name = q.get("name").and_then(Value::as_str).unwrap_or_default();
            let answer = q
                .get("acceptedAnswer")
                .and_then(|a| a.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !name.is_empty() && !answer.is_empty() {
                faqs.push(FaqPair::new(name, answer));
            }
        }
    }

    faqs
}

/// Tier 2: `<details>` with a `<summary>` question; the rest of the
/// element's text is the answer.
fn faqs_from_details(doc: &Html) -> Vec<FaqPair> {
    let details_sel = match Selector::parse("details") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };
    let summary_sel = match Selector::parse("summary") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    let mut faqs = Vec::new();
    for details in doc.select(&details_sel) {
        let Some(summary) = details.select(&summary_sel).next() else {
            continue;
        };
        let question = collapsed_text(&summary);
        let answer = text_excluding_subtree(*details, summary.id());
        if !question.is_empty() && !answer.is_empty() {
            faqs.push(FaqPair::new(question, answer));
        }
    }
    faqs
}

/// Tier 3: scan elements whose class or id suggests an FAQ or accordion
/// container, score each candidate, and keep the best one's pairs.
fn faqs_from_accordions(doc: &Html) -> Vec<FaqPair> {
    let mut best: Option<(i32, Vec<FaqPair>)> = None;

    // Walk from the root so nodes detached by boilerplate stripping are
    // never considered.
    for node in doc.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if !attr_suggests_faq(&el) {
            continue;
        }

        let pairs = recover_pairs(&el);
        if pairs.is_empty() {
            continue;
        }

        let mut score = pairs.len() as i32;
        if preceded_by_faq_heading(&el) {
            score += 3;
        }
        if contains_faq_heading(&el) {
            score += 2;
        }

        ::log::trace!(
            "FAQ candidate <{}> scored {} with {} pairs",
            el.value().name(),
            score,
            pairs.len()
        );

        match &best {
            Some((best_score, _)) if *best_score >= score => {}
            _ => best = Some((score, pairs)),
        }
    }

    best.map(|(_, pairs)| pairs).unwrap_or_default()
}

/// Walks a container in document order treating heading-like elements and
/// `role="tab"` elements as questions; everything between a question and
/// the next one is its answer.
fn recover_pairs(container: &ElementRef) -> Vec<FaqPair> {
    let mut pairs = Vec::new();
    let mut question: Option<(ego_tree::NodeId, String)> = None;
    let mut answer = String::new();

    for node in container.descendants().skip(1) {
        if let Some((q_id, _)) = &question {
            // Text inside the question element belongs to the question
            if node.ancestors().any(|a| a.id() == *q_id) {
                continue;
            }
        }

        if let Some(el) = ElementRef::wrap(node) {
            if is_question_element(&el) {
                let text = collapsed_text(&el);
                if looks_like_question(&text) {
                    push_pair(&mut pairs, question.take(), &answer);
                    question = Some((node.id(), text));
                    answer.clear();
                }
            }
            continue;
        }

        if question.is_some() {
            if let Node::Text(text) = node.value() {
                answer.push_str(text);
                answer.push(' ');
            }
        }
    }
    push_pair(&mut pairs, question.take(), &answer);

    pairs
}

fn push_pair(pairs: &mut Vec<FaqPair>, question: Option<(ego_tree::NodeId, String)>, answer: &str) {
    if let Some((_, q)) = question {
        let a = collapse_whitespace(answer);
        if a.len() > MIN_ANSWER_CHARS {
            pairs.push(FaqPair::new(q, a));
        }
    }
}

fn is_question_element(el: &ElementRef) -> bool {
    let name = el.value().name();
    HEADING_TAGS.contains(&name)
        || name == "dt"
        || el.value().attr("role") == Some("tab")
        || attr_contains(el, &["class"], &["question"])
}

/// A question must end in "?" or contain an interrogative word
fn looks_like_question(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.ends_with('?') {
        return true;
    }
    trimmed
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .any(|w| INTERROGATIVES.contains(&w.as_str()))
}

fn attr_suggests_faq(el: &ElementRef) -> bool {
    attr_contains(el, &["class", "id"], &["faq", "accordion"])
}

fn attr_contains(el: &ElementRef, attrs: &[&str], needles: &[&str]) -> bool {
    attrs.iter().any(|attr| {
        el.value()
            .attr(attr)
            .map(|v| {
                let lower = v.to_lowercase();
                needles.iter().any(|n| lower.contains(n))
            })
            .unwrap_or(false)
    })
}

fn heading_mentions_faq(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("faq") || lower.contains("frequently asked")
}

/// True when the element immediately preceding the container is a heading
/// that mentions FAQs
fn preceded_by_faq_heading(el: &ElementRef) -> bool {
    el.prev_siblings()
        .find(|n| n.value().is_element())
        .and_then(ElementRef::wrap)
        .map(|prev| {
            HEADING_TAGS.contains(&prev.value().name()) && heading_mentions_faq(&collapsed_text(&prev))
        })
        .unwrap_or(false)
}

fn contains_faq_heading(el: &ElementRef) -> bool {
    el.descendants().skip(1).filter_map(ElementRef::wrap).any(|inner| {
        HEADING_TAGS.contains(&inner.value().name()) && heading_mentions_faq(&collapsed_text(&inner))
    })
}

fn collapsed_text(el: &ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated text of `root`'s subtree, excluding the subtree under
/// `excluded` (used to subtract a `<summary>` from its `<details>`)
fn text_excluding_subtree(root: NodeRef<'_, Node>, excluded: ego_tree::NodeId) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        if node.id() == excluded || node.ancestors().any(|a| a.id() == excluded) {
            continue;
        }
        if let Node::Text(text) = node.value() {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

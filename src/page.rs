use serde::{Deserialize, Serialize};

/// A question/answer pair recovered from a page's FAQ markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqPair {
    pub question: String,
    pub answer: String,
}

impl FaqPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Snapshot of a page's visible content, produced fresh per extraction.
///
/// Crosses the boundary between the fetching layer and the schema
/// generation pipeline; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContent {
    /// `<title>` text
    pub title: String,

    /// Content of the `description` meta tag
    pub meta_description: String,

    /// All non-empty `<h1>` texts
    pub h1: Vec<String>,

    /// Flattened main-content text, whitespace-collapsed and capped
    pub content: String,

    /// FAQ pairs from structured data or accordion-like markup
    pub faqs: Vec<FaqPair>,

    /// Best-effort organization logo URL (empty when none found)
    pub logo: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
}

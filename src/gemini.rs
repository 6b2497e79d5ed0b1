//! Client for the generative-AI text endpoint.
//!
//! Speaks the `generateContent` wire contract: a JSON body of
//! `{contents: [{parts: [{text}]}], systemInstruction: {parts: [{text}]}}`
//! with the credential passed as a query parameter, returning free text in
//! `candidates[0].content.parts[0].text`.

use crate::error::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Model used for all generation requests
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            model: model.into(),
        }
    }

    /// Sends a prompt with a system instruction and returns the model's
    /// raw text reply.
    pub async fn generate_text(
        &self,
        api_key: &str,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, Error> {
        if api_key.trim().is_empty() {
            return Err(Error::Validation(
                "Please provide your Google AI Studio API key".to_string(),
            ));
        }

        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            },
        };

        ::log::debug!("sending {} chars of prompt to {}", prompt.len(), self.model);

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Api(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let upstream = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|env| env.error)
                .and_then(|e| e.message);
            return Err(Error::Api(
                upstream.unwrap_or_else(|| format!("API error: {}", status.as_u16())),
            ));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("malformed API response: {}", e)))?;

        let text = reply
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default();

        Ok(text)
    }
}

/// The structured envelope the model is asked to return
#[derive(Debug, Default, Deserialize)]
pub struct ModelReply {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    keywords: Option<StringOrList>,

    #[serde(default, rename = "knowsAbout")]
    pub knows_about: Vec<TopicEntity>,

    #[serde(default)]
    pub publisher: Option<PublisherInfo>,

    #[serde(default)]
    pub schema_jsonld: String,
}

impl ModelReply {
    /// Keywords normalized to a list regardless of whether the model
    /// returned an array or a comma-separated string
    pub fn keyword_list(&self) -> Vec<String> {
        match &self.keywords {
            Some(StringOrList::Many(list)) => list
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            Some(StringOrList::One(joined)) => joined
                .split([',', ';'])
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicEntity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublisherInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default, rename = "knowsAbout")]
    pub knows_about: Vec<String>,
}

/// Extracts the first JSON object substring from free text, preferring one
/// fenced in a code block over the first brace-balanced object found by
/// greedy match.
pub fn extract_json_object(text: &str) -> Option<String> {
    let fenced = Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").ok()?;
    if let Some(caps) = fenced.captures(text) {
        return Some(caps[1].to_string());
    }

    let bare = Regex::new(r"(?s)(\{.*\})").ok()?;
    bare.captures(text).map(|caps| caps[1].to_string())
}

/// Parses the model's free-text reply into a [`ModelReply`]
pub fn parse_reply(text: &str) -> Result<ModelReply, Error> {
    let json = extract_json_object(text)
        .ok_or_else(|| Error::Parse("Model did not return valid JSON".to_string()))?;
    serde_json::from_str(&json)
        .map_err(|e| Error::Parse(format!("Model reply was not a valid envelope: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fenced_json() {
        let text = "Here you go:\n```json\n{\"description\": \"a page\"}\n```\nDone.";
        let json = extract_json_object(text).unwrap();
        assert_eq!(json, "{\"description\": \"a page\"}");
    }

    #[test]
    fn test_extract_bare_json() {
        let text = "Sure. {\"description\": \"plain\", \"keywords\": []} trailing";
        let json = extract_json_object(text).unwrap();
        assert!(json.starts_with("{\"description\""));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn test_extract_no_json() {
        assert!(extract_json_object("no braces here").is_none());
    }

    #[test]
    fn test_parse_reply_keywords_as_array() {
        let reply =
            parse_reply("{\"description\": \"d\", \"keywords\": [\"seo\", \" marketing \"]}")
                .unwrap();
        assert_eq!(reply.keyword_list(), vec!["seo", "marketing"]);
    }

    #[test]
    fn test_parse_reply_keywords_as_string() {
        let reply = parse_reply("{\"keywords\": \"seo, marketing; tools\"}").unwrap();
        assert_eq!(reply.keyword_list(), vec!["seo", "marketing", "tools"]);
    }

    #[test]
    fn test_parse_reply_missing_json_is_parse_error() {
        let err = parse_reply("I could not help with that.").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}

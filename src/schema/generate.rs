//! Orchestration of a single schema generation: prompt the model, parse its
//! envelope, fall back to a deterministic schema when its JSON-LD is
//! malformed, then enhance, overlay user values, and prune.

use super::prompt::{build_prompt, system_instruction};
use super::{FieldValues, GeneratedSchema, SchemaType};
use crate::error::Error;
use crate::gemini::{self, GeminiClient};
use crate::page::PageContent;
use url::Url;

pub struct SchemaGenerator {
    client: GeminiClient,
}

impl SchemaGenerator {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Generates a schema for an already-extracted page.
    ///
    /// Never fails on malformed model output alone: a reply whose
    /// `schema_jsonld` does not parse degrades to the deterministic
    /// fallback schema, still enhanced and overlaid.
    pub async fn generate(
        &self,
        api_key: &str,
        url: &str,
        page: &PageContent,
        schema_type: SchemaType,
        values: &FieldValues,
    ) -> Result<GeneratedSchema, Error> {
        let parsed =
            Url::parse(url).map_err(|_| Error::Validation("Please enter a valid URL".to_string()))?;
        let domain = parsed.host_str().unwrap_or_default().to_string();
        super::validate_field_values(schema_type, values)?;

        let prompt = build_prompt(url, &domain, page, schema_type, values);
        let instruction = system_instruction(schema_type);

        let text = self
            .client
            .generate_text(api_key, &prompt, &instruction)
            .await?;
        let reply = gemini::parse_reply(&text)?;

        let mut schema = match GeneratedSchema::from_jsonld(&reply.schema_jsonld) {
            Some(schema) => schema,
            None => {
                ::log::warn!(
                    "model returned unusable JSON-LD for {}, using fallback schema",
                    url
                );
                GeneratedSchema::default_for(url, schema_type, page, values)
            }
        };

        schema.enhance(url, &domain, schema_type, page, &reply);
        schema.overlay_field_values(values);
        schema.prune_empty();

        Ok(schema)
    }
}

// Re-export modules
pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod gemini;
pub mod history;
pub mod output;
pub mod page;
pub mod schema;

// Re-export commonly used types for convenience
pub use error::Error;
pub use page::PageContent;
pub use schema::{FieldValues, GeneratedSchema, SchemaType};

use batch::{BatchItem, ItemProcessor};
use fetch::PageSource;
use history::HistoryStore;
use schema::generate::SchemaGenerator;

/// End-to-end pipeline: fetch a page, generate its schema, and record the
/// result in history.
///
/// Generic over the page source so batch runs and tests can supply their
/// own. Doubles as the [`ItemProcessor`] for batch mode, where each row's
/// seed keywords feed the WebPage prompt.
pub struct SchemaPipeline<S: PageSource> {
    source: S,
    generator: SchemaGenerator,
    api_key: String,
    schema_type: SchemaType,
    history: Option<HistoryStore>,
}

impl<S: PageSource> SchemaPipeline<S> {
    /// Create a new pipeline over a page source
    pub fn new(source: S, generator: SchemaGenerator, api_key: impl Into<String>) -> Self {
        Self {
            source,
            generator,
            api_key: api_key.into(),
            schema_type: SchemaType::default(),
            history: None,
        }
    }

    /// Set the schema type to generate
    pub fn with_schema_type(mut self, schema_type: SchemaType) -> Self {
        self.schema_type = schema_type;
        self
    }

    /// Record every generated schema in a history store
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Fetch one page and generate its schema
    pub async fn generate(
        &self,
        url: &str,
        values: &FieldValues,
    ) -> Result<GeneratedSchema, Error> {
        let page = self.source.fetch(url).await?;
        ::log::debug!(
            "Extracted {} chars of content from {}",
            page.content.len(),
            url
        );

        let schema = self
            .generator
            .generate(&self.api_key, url, &page, self.schema_type, values)
            .await?;

        if let Some(history) = &self.history {
            history.append(url, self.schema_type, &schema, values);
        }
        Ok(schema)
    }
}

impl<S: PageSource> ItemProcessor for SchemaPipeline<S> {
    async fn process(&self, item: &BatchItem) -> Result<GeneratedSchema, Error> {
        let mut values = FieldValues::new();
        if self.schema_type == SchemaType::WebPage && !item.keywords.is_empty() {
            values.insert("keywords".to_string(), item.keywords.join(", "));
        }
        self.generate(&item.url, &values).await
    }
}

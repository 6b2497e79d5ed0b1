pub mod generate;
pub mod prompt;

use crate::error::Error;
use crate::gemini::ModelReply;
use crate::page::PageContent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// User-entered field values keyed by field identifier, immutable once
/// captured for a generation request
pub type FieldValues = BTreeMap<String, String>;

/// The schema.org types this tool can generate.
///
/// Each variant carries its own field definitions, prompt, system
/// instruction, and deterministic fallback schema, so adding a type means
/// adding one variant rather than editing shared conditionals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum SchemaType {
    #[default]
    WebPage,
    Article,
    Product,
    Event,
    HowTo,
    Recipe,
    Video,
    #[serde(rename = "FAQPage")]
    FaqPage,
    LocalBusiness,
    Organization,
    Person,
    Breadcrumbs,
    Review,
}

impl SchemaType {
    /// The schema.org vocabulary name used in `@type`
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::WebPage => "WebPage",
            SchemaType::Article => "Article",
            SchemaType::Product => "Product",
            SchemaType::Event => "Event",
            SchemaType::HowTo => "HowTo",
            SchemaType::Recipe => "Recipe",
            SchemaType::Video => "VideoObject",
            SchemaType::FaqPage => "FAQPage",
            SchemaType::LocalBusiness => "LocalBusiness",
            SchemaType::Organization => "Organization",
            SchemaType::Person => "Person",
            SchemaType::Breadcrumbs => "BreadcrumbList",
            SchemaType::Review => "Review",
        }
    }

    /// Fields shown to the user for this schema type
    pub fn fields(&self) -> &'static [FieldDef] {
        match self {
            SchemaType::WebPage => WEB_PAGE_FIELDS,
            SchemaType::Article => ARTICLE_FIELDS,
            SchemaType::Product => PRODUCT_FIELDS,
            SchemaType::Event => EVENT_FIELDS,
            SchemaType::HowTo => HOW_TO_FIELDS,
            SchemaType::Recipe => RECIPE_FIELDS,
            SchemaType::Video => VIDEO_FIELDS,
            SchemaType::FaqPage => FAQ_PAGE_FIELDS,
            SchemaType::LocalBusiness => LOCAL_BUSINESS_FIELDS,
            SchemaType::Organization => ORGANIZATION_FIELDS,
            SchemaType::Person => PERSON_FIELDS,
            SchemaType::Breadcrumbs => BREADCRUMBS_FIELDS,
            SchemaType::Review => REVIEW_FIELDS,
        }
    }
}

const WEB_PAGE_FIELDS: &[FieldDef] = &[
    FieldDef::optional("keywords", "Keywords"),
    FieldDef::optional("description", "Description"),
];

const ARTICLE_FIELDS: &[FieldDef] = &[
    FieldDef::required("headline", "Headline"),
    FieldDef::required("author", "Author Name"),
    FieldDef::required("datePublished", "Date Published"),
    FieldDef::optional("dateModified", "Date Modified"),
    FieldDef::optional("image", "Featured Image URL"),
    FieldDef::optional("description", "Description"),
];

const PRODUCT_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "Product Name"),
    FieldDef::required("description", "Description"),
    FieldDef::required("price", "Price"),
    FieldDef::required("currency", "Currency"),
    FieldDef::required("availability", "Availability"),
    FieldDef::optional("image", "Product Image URL"),
    FieldDef::optional("brand", "Brand"),
    FieldDef::optional("sku", "SKU"),
];

const EVENT_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "Event Name"),
    FieldDef::required("startDate", "Start Date"),
    FieldDef::optional("endDate", "End Date"),
    FieldDef::required("location", "Location Name"),
    FieldDef::optional("address", "Address"),
    FieldDef::optional("description", "Description"),
    FieldDef::optional("image", "Event Image URL"),
    FieldDef::optional("price", "Price"),
    FieldDef::optional("currency", "Currency"),
];

const HOW_TO_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "How-To Title"),
    FieldDef::required("description", "Description"),
    FieldDef::optional("totalTime", "Total Time"),
    FieldDef::optional("image", "Image URL"),
];

const RECIPE_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "Recipe Name"),
    FieldDef::required("description", "Description"),
    FieldDef::optional("prepTime", "Prep Time"),
    FieldDef::optional("cookTime", "Cook Time"),
    FieldDef::optional("totalTime", "Total Time"),
    FieldDef::optional("recipeYield", "Servings"),
    FieldDef::optional("image", "Recipe Image URL"),
    FieldDef::optional("author", "Author"),
];

const VIDEO_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "Video Title"),
    FieldDef::required("description", "Description"),
    FieldDef::required("thumbnailUrl", "Thumbnail URL"),
    FieldDef::required("uploadDate", "Upload Date"),
    FieldDef::optional("duration", "Duration"),
    FieldDef::optional("contentUrl", "Video URL"),
];

const FAQ_PAGE_FIELDS: &[FieldDef] = &[FieldDef::optional("description", "Page Description")];

const LOCAL_BUSINESS_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "Business Name"),
    FieldDef::optional("description", "Description"),
    FieldDef::required("address", "Street Address"),
    FieldDef::required("city", "City"),
    FieldDef::required("state", "State/Province"),
    FieldDef::required("postalCode", "Postal Code"),
    FieldDef::required("country", "Country"),
    FieldDef::optional("phone", "Phone"),
    FieldDef::optional("priceRange", "Price Range"),
    FieldDef::optional("openingHours", "Opening Hours"),
];

const ORGANIZATION_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "Organization Name"),
    FieldDef::optional("description", "Description"),
    FieldDef::optional("url", "Website URL"),
    FieldDef::optional("logo", "Logo URL"),
    FieldDef::optional("contactPoint", "Contact Email"),
];

const PERSON_FIELDS: &[FieldDef] = &[
    FieldDef::required("name", "Full Name"),
    FieldDef::optional("jobTitle", "Job Title"),
    FieldDef::optional("description", "Description"),
    FieldDef::optional("image", "Image URL"),
    FieldDef::optional("email", "Email"),
    FieldDef::optional("url", "Website URL"),
];

const BREADCRUMBS_FIELDS: &[FieldDef] = &[FieldDef::optional("description", "Description")];

const REVIEW_FIELDS: &[FieldDef] = &[
    FieldDef::required("itemReviewed", "Item Name"),
    FieldDef::required("reviewRating", "Rating (1-5)"),
    FieldDef::required("author", "Reviewer Name"),
    FieldDef::required("reviewBody", "Review Text"),
    FieldDef::optional("datePublished", "Date Published"),
];

/// Definition of a user-facing schema field
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub id: &'static str,
    pub label: &'static str,
    pub required: bool,
}

impl FieldDef {
    const fn required(id: &'static str, label: &'static str) -> Self {
        Self {
            id,
            label,
            required: true,
        }
    }

    const fn optional(id: &'static str, label: &'static str) -> Self {
        Self {
            id,
            label,
            required: false,
        }
    }
}

/// A JSON-LD object keyed by schema.org vocabulary.
///
/// Always carries `@context` and `@type`; empty properties are pruned
/// before the object is considered final.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedSchema(pub Map<String, Value>);

/// Field identifiers that map to a different (possibly nested) schema
/// property than their own name
const PROPERTY_MAP: &[(&str, &str)] = &[
    ("price", "offers.price"),
    ("currency", "offers.priceCurrency"),
    ("availability", "offers.availability"),
];

impl GeneratedSchema {
    /// Parses a JSON-LD string, returning `None` unless it is an object
    pub fn from_jsonld(text: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(Self(map)),
            _ => None,
        }
    }

    /// Deterministic fallback used when the model's JSON-LD is malformed:
    /// context, type, url, and type-specific required fields populated
    /// from field values where available.
    pub fn default_for(
        url: &str,
        schema_type: SchemaType,
        page: &PageContent,
        values: &FieldValues,
    ) -> Self {
        let mut schema = Self(Map::new());
        schema.set("@context", json!("https://schema.org"));
        schema.set("@type", json!(schema_type.as_str()));
        schema.set("url", json!(url));

        match schema_type {
            SchemaType::WebPage => {
                schema.set("mainEntityOfPage", json!(url));
                if !page.title.is_empty() {
                    schema.set("name", json!(page.title));
                }
            }
            SchemaType::Article => {
                if !page.title.is_empty() {
                    schema.set("headline", json!(page.title));
                }
                if let Some(author) = non_empty(values.get("author")) {
                    schema.set("author", json!({"@type": "Person", "name": author}));
                }
                if let Some(date) = non_empty(values.get("datePublished")) {
                    schema.set("datePublished", json!(date));
                }
            }
            SchemaType::FaqPage => {
                let main_entity: Vec<Value> = page
                    .faqs
                    .iter()
                    .map(|pair| {
                        json!({
                            "@type": "Question",
                            "name": pair.question,
                            "acceptedAnswer": {
                                "@type": "Answer",
                                "text": pair.answer,
                            },
                        })
                    })
                    .collect();
                if !main_entity.is_empty() {
                    schema.set("mainEntity", Value::Array(main_entity));
                }
            }
            SchemaType::Product => {
                if let Some(name) = non_empty(values.get("name")) {
                    schema.set("name", json!(name));
                }
                if let Some(price) = non_empty(values.get("price")) {
                    let currency = non_empty(values.get("currency")).unwrap_or("USD");
                    let availability = non_empty(values.get("availability")).unwrap_or("InStock");
                    schema.set(
                        "offers",
                        json!({
                            "@type": "Offer",
                            "price": price,
                            "priceCurrency": currency,
                            "availability": format!("https://schema.org/{}", availability),
                        }),
                    );
                }
            }
            _ => {}
        }

        schema
    }

    /// Fills common properties from the page and the model reply, and
    /// attaches the WebPage-specific keywords/about/publisher block.
    pub fn enhance(
        &mut self,
        url: &str,
        domain: &str,
        schema_type: SchemaType,
        page: &PageContent,
        reply: &ModelReply,
    ) {
        if !page.title.is_empty() && !self.0.contains_key("name") && !self.0.contains_key("headline")
        {
            self.set("name", json!(page.title));
        }

        if !reply.description.is_empty() {
            self.set("description", json!(reply.description));
        } else if !page.meta_description.is_empty() {
            self.set("description", json!(page.meta_description));
        }

        if schema_type == SchemaType::Article {
            if !self.0.contains_key("author") {
                if let Some(author) = &page.author {
                    self.set("author", json!({"@type": "Person", "name": author}));
                }
            }
            if !self.0.contains_key("datePublished") {
                if let Some(published) = &page.date_published {
                    self.set("datePublished", json!(published));
                }
            }
            if !self.0.contains_key("dateModified") {
                if let Some(modified) = &page.date_modified {
                    self.set("dateModified", json!(modified));
                }
            }
        }

        if schema_type != SchemaType::WebPage {
            return;
        }

        let keywords = reply.keyword_list();
        if !keywords.is_empty() {
            self.set("keywords", json!(keywords.join(", ")));
        }

        let about: Vec<Value> = reply
            .knows_about
            .iter()
            .filter(|entity| !entity.name.is_empty())
            .map(|entity| {
                json!({
                    "@type": "Thing",
                    "name": entity.name,
                    "description": entity.description,
                })
            })
            .collect();
        if !about.is_empty() {
            self.set("about", Value::Array(about));
        }

        if let Some(publisher) = &reply.publisher {
            let publisher_url = if publisher.url.is_empty() {
                format!("https://{}", domain)
            } else {
                publisher.url.clone()
            };
            let mut publisher_obj = Map::new();
            publisher_obj.insert("@type".to_string(), json!("Organization"));
            publisher_obj.insert("name".to_string(), json!(publisher.name));
            publisher_obj.insert("url".to_string(), json!(publisher_url));
            publisher_obj.insert("knowsAbout".to_string(), json!(publisher.knows_about));

            // Logo found on the page wins over one proposed by the model
            let logo = if !page.logo.trim().is_empty() {
                page.logo.trim()
            } else {
                publisher.logo.trim()
            };
            if !logo.is_empty() {
                publisher_obj.insert(
                    "logo".to_string(),
                    json!({"@type": "ImageObject", "url": logo}),
                );
            }

            self.set("publisher", Value::Object(publisher_obj));
        }

        if !self.0.contains_key("mainEntityOfPage") {
            self.set("mainEntityOfPage", json!(url));
        }
    }

    /// Overlays explicit field values onto the schema, overwriting any
    /// model-provided value for the same property. Some fields map to
    /// nested paths such as `offers.price`.
    pub fn overlay_field_values(&mut self, values: &FieldValues) {
        for (key, value) in values {
            if value.is_empty() {
                continue;
            }
            let property = PROPERTY_MAP
                .iter()
                .find(|(id, _)| id == key)
                .map(|(_, prop)| *prop)
                .unwrap_or(key.as_str());

            match property.split_once('.') {
                Some((parent, child)) => {
                    let entry = self
                        .0
                        .entry(parent.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(obj) = entry {
                        obj.insert(child.to_string(), json!(value));
                    }
                }
                None => {
                    self.set(property, json!(value));
                }
            }
        }
    }

    /// Removes top-level properties whose value is null or an empty
    /// string. Idempotent; applied uniformly to every schema type.
    pub fn prune_empty(&mut self) {
        self.0
            .retain(|_, v| !matches!(v, Value::Null) && v.as_str() != Some(""));
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Pretty-printed JSON representation
    pub fn to_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Checks user-supplied field ids against the type's field definitions.
/// Unknown ids are rejected; missing required fields are only warned about
/// since the model can usually infer them from page content.
pub fn validate_field_values(schema_type: SchemaType, values: &FieldValues) -> Result<(), Error> {
    let fields = schema_type.fields();
    for key in values.keys() {
        if !fields.iter().any(|f| f.id == key) {
            return Err(Error::Validation(format!(
                "Unknown field \"{}\" for {} (expected one of: {})",
                key,
                schema_type.as_str(),
                fields
                    .iter()
                    .map(|f| f.id)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }
    for field in fields.iter().filter(|f| f.required) {
        if !values.contains_key(field.id) {
            ::log::warn!(
                "{} ({}) not provided, the model will infer it",
                field.label,
                field.id
            );
        }
    }
    Ok(())
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_title(title: &str) -> PageContent {
        PageContent {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_schema_always_carries_context_and_type() {
        for ty in [
            SchemaType::WebPage,
            SchemaType::Article,
            SchemaType::Product,
            SchemaType::Review,
        ] {
            let schema = GeneratedSchema::default_for(
                "https://example.com",
                ty,
                &PageContent::default(),
                &FieldValues::new(),
            );
            assert_eq!(
                schema.get("@context").and_then(Value::as_str),
                Some("https://schema.org")
            );
            assert_eq!(schema.get("@type").and_then(Value::as_str), Some(ty.as_str()));
        }
    }

    #[test]
    fn test_default_product_builds_nested_offer() {
        let mut values = FieldValues::new();
        values.insert("price".to_string(), "19.99".to_string());
        values.insert("availability".to_string(), "OutOfStock".to_string());

        let schema = GeneratedSchema::default_for(
            "https://shop.example.com/widget",
            SchemaType::Product,
            &PageContent::default(),
            &values,
        );
        let offers = schema.get("offers").unwrap();
        assert_eq!(offers["price"], json!("19.99"));
        assert_eq!(offers["priceCurrency"], json!("USD"));
        assert_eq!(offers["availability"], json!("https://schema.org/OutOfStock"));
    }

    #[test]
    fn test_default_faq_page_built_from_extracted_pairs() {
        let page = PageContent {
            faqs: vec![
                crate::page::FaqPair::new("What is it?", "A tool for structured data."),
                crate::page::FaqPair::new("Is it free?", "Yes, for personal use."),
            ],
            ..Default::default()
        };
        let schema = GeneratedSchema::default_for(
            "https://example.com/faq",
            SchemaType::FaqPage,
            &page,
            &FieldValues::new(),
        );

        let main_entity = schema.get("mainEntity").and_then(Value::as_array).unwrap();
        assert_eq!(main_entity.len(), 2);
        assert_eq!(main_entity[0]["name"], json!("What is it?"));
        assert_eq!(
            main_entity[1]["acceptedAnswer"]["text"],
            json!("Yes, for personal use.")
        );
    }

    #[test]
    fn test_overlay_maps_price_to_nested_offer() {
        let mut schema = GeneratedSchema::default_for(
            "https://example.com",
            SchemaType::Product,
            &PageContent::default(),
            &FieldValues::new(),
        );
        let mut values = FieldValues::new();
        values.insert("price".to_string(), "42".to_string());
        values.insert("name".to_string(), "Widget".to_string());

        schema.overlay_field_values(&values);

        assert_eq!(schema.get("name"), Some(&json!("Widget")));
        assert_eq!(schema.get("offers").unwrap()["price"], json!("42"));
    }

    #[test]
    fn test_overlay_overwrites_model_value() {
        let mut schema = GeneratedSchema::from_jsonld(
            "{\"@context\": \"https://schema.org\", \"@type\": \"Article\", \"headline\": \"model says\"}",
        )
        .unwrap();
        let mut values = FieldValues::new();
        values.insert("headline".to_string(), "user says".to_string());

        schema.overlay_field_values(&values);

        assert_eq!(schema.get("headline"), Some(&json!("user says")));
    }

    #[test]
    fn test_prune_removes_null_and_empty() {
        let mut schema = GeneratedSchema::from_jsonld(
            "{\"@type\": \"WebPage\", \"name\": \"\", \"description\": null, \"url\": \"https://example.com\"}",
        )
        .unwrap();
        schema.prune_empty();

        assert!(schema.get("name").is_none());
        assert!(schema.get("description").is_none());
        assert!(schema.get("url").is_some());
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut schema = GeneratedSchema::from_jsonld(
            "{\"@type\": \"WebPage\", \"keywords\": \"\", \"about\": [], \"url\": \"https://example.com\"}",
        )
        .unwrap();
        schema.prune_empty();
        let once = schema.clone();
        schema.prune_empty();
        assert_eq!(once, schema);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut values = FieldValues::new();
        values.insert("author".to_string(), "Ada".to_string());
        let mut schema = GeneratedSchema::default_for(
            "https://example.com/post",
            SchemaType::Article,
            &page_with_title("A Post"),
            &values,
        );
        schema.prune_empty();

        let text = serde_json::to_string(&schema).unwrap();
        let parsed: GeneratedSchema = serde_json::from_str(&text).unwrap();
        assert_eq!(schema, parsed);
    }

    #[test]
    fn test_enhance_fills_name_and_description_from_page() {
        let mut schema = GeneratedSchema::default_for(
            "https://example.com",
            SchemaType::Article,
            &PageContent::default(),
            &FieldValues::new(),
        );
        let page = PageContent {
            title: "Fallback Title".to_string(),
            meta_description: "Fallback description".to_string(),
            ..Default::default()
        };
        schema.enhance(
            "https://example.com",
            "example.com",
            SchemaType::Article,
            &page,
            &crate::gemini::ModelReply::default(),
        );

        assert_eq!(schema.get("name"), Some(&json!("Fallback Title")));
        assert_eq!(schema.get("description"), Some(&json!("Fallback description")));
    }

    #[test]
    fn test_enhance_fills_article_author_and_dates_from_page() {
        let page = PageContent {
            author: Some("Ada Lovelace".to_string()),
            date_published: Some("2024-03-01T09:00:00Z".to_string()),
            date_modified: Some("2024-03-05T12:00:00Z".to_string()),
            ..Default::default()
        };
        let mut schema = GeneratedSchema::default_for(
            "https://example.com/post",
            SchemaType::Article,
            &page,
            &FieldValues::new(),
        );
        schema.enhance(
            "https://example.com/post",
            "example.com",
            SchemaType::Article,
            &page,
            &crate::gemini::ModelReply::default(),
        );

        assert_eq!(
            schema.get("author"),
            Some(&json!({"@type": "Person", "name": "Ada Lovelace"}))
        );
        assert_eq!(
            schema.get("datePublished"),
            Some(&json!("2024-03-01T09:00:00Z"))
        );
        assert_eq!(
            schema.get("dateModified"),
            Some(&json!("2024-03-05T12:00:00Z"))
        );
    }

    #[test]
    fn test_enhance_keeps_user_supplied_article_author() {
        let mut values = FieldValues::new();
        values.insert("author".to_string(), "Named By Hand".to_string());
        let page = PageContent {
            author: Some("Meta Tag Author".to_string()),
            ..Default::default()
        };
        let mut schema = GeneratedSchema::default_for(
            "https://example.com/post",
            SchemaType::Article,
            &page,
            &values,
        );
        schema.enhance(
            "https://example.com/post",
            "example.com",
            SchemaType::Article,
            &page,
            &crate::gemini::ModelReply::default(),
        );

        assert_eq!(
            schema.get("author"),
            Some(&json!({"@type": "Person", "name": "Named By Hand"}))
        );
    }

    #[test]
    fn test_field_validation_rejects_unknown_ids() {
        let mut values = FieldValues::new();
        values.insert("hedline".to_string(), "typo".to_string());
        let err = validate_field_values(SchemaType::Article, &values).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("hedline"));

        let mut ok = FieldValues::new();
        ok.insert("headline".to_string(), "Fine".to_string());
        assert!(validate_field_values(SchemaType::Article, &ok).is_ok());
    }

    #[test]
    fn test_field_validation_allows_missing_required() {
        // Required fields the user omits are filled by the model, not
        // rejected up front
        assert!(validate_field_values(SchemaType::Product, &FieldValues::new()).is_ok());
    }

    #[test]
    fn test_required_fields_defined_per_type() {
        assert!(
            SchemaType::Product
                .fields()
                .iter()
                .any(|f| f.id == "price" && f.required)
        );
        assert!(
            SchemaType::WebPage
                .fields()
                .iter()
                .all(|f| !f.required)
        );
    }
}

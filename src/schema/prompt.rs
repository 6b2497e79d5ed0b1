//! Prompt assembly for schema generation requests.
//!
//! WebPage gets a dedicated prompt that asks for keywords, topic entities,
//! and a publisher block; every other type shares a generic prompt that
//! embeds the user's field values.

use super::{FieldValues, SchemaType};
use crate::page::PageContent;

pub fn build_prompt(
    url: &str,
    domain: &str,
    page: &PageContent,
    schema_type: SchemaType,
    values: &FieldValues,
) -> String {
    let h1 = serde_json::to_string(&page.h1).unwrap_or_else(|_| "[]".to_string());

    if schema_type == SchemaType::WebPage {
        let seed_keywords: Vec<String> = values
            .get("keywords")
            .map(|raw| {
                raw.split([',', ';'])
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let seeds = serde_json::to_string(&seed_keywords).unwrap_or_else(|_| "[]".to_string());

        return format!(
            r#"URL: {url}
Domain: {domain}

Title: {title}
Meta Description: {meta}
H1: {h1}

Extracted content (truncated):
{content}

Seed keywords:
{seeds}

Task:
1) Write a one paragraph description of the page that fits the content.
2) Propose a clean list of 5 to 20 page-specific keywords. Include some of the seed keywords if relevant.
3) Propose a focused 'knowsAbout' list of 3 to 12 entities or topics. Each entity should have:
   - "name": the name of the entity
   - "description": a short 1-sentence description of the entity
4) Identify the publisher/organization from the domain and content. Create a publisher object with:
   - "name": the organization/brand name
   - "url": the organization's homepage URL
   - "logo": the organization's logo URL (use the logo from page metadata if available, otherwise construct a reasonable logo URL like https://domain.com/logo.png or https://domain.com/favicon.ico)
   - "knowsAbout": 3-8 topics/areas the organization specializes in (simple strings, no descriptions)
5) Produce a JSON-LD for schema.org 'WebPage' with:
   - '@context'
   - '@type': 'WebPage'
   - 'url'
   - 'name' if clear
   - 'description' from step 1
   - 'keywords' as a comma separated string from step 2
   - 'mainEntityOfPage' set to the URL
   - 'publisher' object in this exact format:
     {{
       "@type": "Organization",
       "name": "Organization Name",
       "url": "https://organization-url.com",
       "logo": {{
         "@type": "ImageObject",
         "url": "https://organization-logo-url.com"
       }},
       "knowsAbout": ["topic1", "topic2", "topic3"]
     }}
   - 'about' array with objects in this exact format:
     {{
       "@type": "Thing",
       "name": "name of entity",
       "description": "short description of entity"
     }}

Return JSON with keys: description, keywords (array of strings), knowsAbout (array of objects with 'name' and 'description'), publisher (object with 'name', 'url', 'logo' (URL string), and 'knowsAbout' array of strings), schema_jsonld (string).
Only return JSON. No commentary."#,
            url = url,
            domain = domain,
            title = page.title,
            meta = page.meta_description,
            h1 = h1,
            content = page.content,
            seeds = seeds,
        );
    }

    let faq_text = if schema_type == SchemaType::FaqPage && !page.faqs.is_empty() {
        let pairs: Vec<String> = page
            .faqs
            .iter()
            .map(|pair| format!("Q: {}\nA: {}", pair.question, pair.answer))
            .collect();
        format!("\n\nFAQ pairs found on the page:\n{}", pairs.join("\n\n"))
    } else {
        String::new()
    };

    let field_values_text = if values.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nAdditional Field Values:\n{}",
            serde_json::to_string_pretty(values).unwrap_or_else(|_| "{}".to_string())
        )
    };
    let type_name = schema_type.as_str();

    format!(
        r#"URL: {url}
Domain: {domain}

Title: {title}
Meta Description: {meta}
H1: {h1}

Extracted content (truncated):
{content}{faq_text}{field_values_text}

Task:
Generate a valid JSON-LD schema for schema.org type "{type_name}".

The schema must include all required properties for {type_name} and should be based on the page content and any provided field values.

Return JSON with keys: description, schema_jsonld (string containing the complete JSON-LD schema).

Only return JSON. No commentary."#,
        url = url,
        domain = domain,
        title = page.title,
        meta = page.meta_description,
        h1 = h1,
        content = page.content,
        faq_text = faq_text,
        field_values_text = field_values_text,
        type_name = type_name,
    )
}

pub fn system_instruction(schema_type: SchemaType) -> String {
    if schema_type == SchemaType::WebPage {
        return "You are an SEO and structured data assistant. Generate valid JSON-LD schemas for schema.org WebPage type.\n\
Create a complete, valid WebPage schema based on the provided page content.\n\
The schema_jsonld must be valid JSON-LD that follows schema.org WebPage specifications.\n\
Include all required properties: @context, @type, url, description, keywords, mainEntityOfPage, publisher (with logo), and about array.\n\
The publisher must include a logo as an ImageObject with @type and url properties.\n\
The about array must contain Thing objects with @type, name, and description properties."
            .to_string();
    }

    let type_name = schema_type.as_str();
    format!(
        "You are an SEO and structured data assistant. Generate valid JSON-LD schemas for schema.org.\n\
Create a complete, valid {type_name} schema based on the provided page content and field values.\n\
The schema_jsonld must be valid JSON-LD that follows schema.org specifications for {type_name}.\n\
Include all required properties and relevant optional properties."
    )
}

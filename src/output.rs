//! Rendering generated schemas for copy-paste and file export.

use crate::batch::BatchResult;
use crate::error::Error;
use crate::schema::GeneratedSchema;
use serde_json::Value;
use std::path::Path;

/// Wraps a schema in the `<script>` tag a page would embed
pub fn wrap_script_tag(schema: &GeneratedSchema) -> String {
    format!(
        "<script type=\"application/ld+json\">\n{}\n</script>",
        schema.to_pretty()
    )
}

/// Plain-text export of a batch: each successful URL followed by its
/// wrapped schema, blank-line separated. `None` when nothing succeeded.
pub fn batch_text(results: &[&BatchResult]) -> Option<String> {
    let blocks: Vec<String> = results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| {
            r.schema
                .as_ref()
                .map(|s| format!("{}\n{}", r.url, wrap_script_tag(s)))
        })
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

/// JSON export of a batch: an array of the successful schemas
pub fn batch_json(results: &[&BatchResult]) -> Option<String> {
    let schemas: Vec<Value> = results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.schema.as_ref())
        .map(|s| Value::Object(s.0.clone()))
        .collect();

    if schemas.is_empty() {
        return None;
    }
    Some(serde_json::to_string_pretty(&schemas).unwrap_or_else(|_| "[]".to_string()))
}

pub fn write_file(path: &Path, content: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    ::log::info!("Wrote {}", path.display());
    Ok(())
}

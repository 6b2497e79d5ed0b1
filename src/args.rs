use clap::{Parser, Subcommand};
use schema_forge::schema::SchemaType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "schema-forge")]
#[command(about = "Generates schema.org JSON-LD markup from live web pages")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Google AI Studio API key (falls back to GEMINI_API_KEY, then the
    /// saved key)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a schema for a single URL
    Generate {
        /// Page URL
        url: String,

        /// Schema type to generate
        #[arg(short = 't', long = "type", value_enum, default_value_t = SchemaType::WebPage)]
        schema_type: SchemaType,

        /// Seed keywords, comma or semicolon separated
        #[arg(short, long)]
        keywords: Option<String>,

        /// Field value as id=value, repeatable
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Print the schema wrapped in a <script> tag
        #[arg(short, long)]
        wrap: bool,

        /// Write the schema JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Process a CSV of URLs into schemas
    Batch {
        /// CSV file with a url column and optional keyword column
        file: PathBuf,

        /// Schema type to generate for every row
        #[arg(short = 't', long = "type", value_enum, default_value_t = SchemaType::WebPage)]
        schema_type: SchemaType,

        /// Write a plain-text export (URL + wrapped schema per page)
        #[arg(long)]
        out_text: Option<PathBuf>,

        /// Write a JSON export (array of schemas)
        #[arg(long)]
        out_json: Option<PathBuf>,

        /// After the run, retry every failed item once
        #[arg(long)]
        retry_failed: bool,
    },

    /// Inspect previously generated schemas
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Save the API key for later runs
    SetKey {
        /// Google AI Studio API key
        key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List history entries, newest first
    List,

    /// Print one entry's schema
    Show {
        id: String,

        /// Print the schema wrapped in a <script> tag
        #[arg(short, long)]
        wrap: bool,
    },

    /// Delete one entry
    Delete { id: String },

    /// Delete every entry
    Clear,

    /// Write one entry's schema to a file
    Export {
        id: String,
        output: PathBuf,

        /// Write the schema wrapped in a <script> tag
        #[arg(short, long)]
        wrap: bool,
    },
}

/// Parse a `--field id=value` argument
fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => {
            Ok((id.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected id=value, got \"{}\"", raw)),
    }
}

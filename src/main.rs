use clap::Parser;
use schema_forge::batch::{BatchController, BatchControls, BatchState, csv::parse_batch_csv};
use schema_forge::config::AppConfig;
use schema_forge::error::Error;
use schema_forge::fetch::{FetcherConfig, PageFetcher};
use schema_forge::gemini::GeminiClient;
use schema_forge::history::HistoryStore;
use schema_forge::output;
use schema_forge::schema::generate::SchemaGenerator;
use schema_forge::schema::{FieldValues, SchemaType};
use schema_forge::SchemaPipeline;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

mod args;
use args::{Args, Command, HistoryCommand};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Command::Generate {
            url,
            schema_type,
            keywords,
            fields,
            wrap,
            output,
        } => {
            run_generate(
                &config,
                args.api_key.as_deref(),
                &url,
                schema_type,
                keywords,
                fields,
                wrap,
                output,
            )
            .await
        }
        Command::Batch {
            file,
            schema_type,
            out_text,
            out_json,
            retry_failed,
        } => {
            run_batch(
                &config,
                args.api_key.as_deref(),
                &file,
                schema_type,
                out_text,
                out_json,
                retry_failed,
            )
            .await
        }
        Command::History { command } => run_history(&config, command),
        Command::SetKey { key } => config.save_api_key(&key),
    };

    if let Err(e) = result {
        ::log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn fetcher_config(config: &AppConfig) -> FetcherConfig {
    FetcherConfig {
        webdriver_url: config.webdriver_url.clone(),
        overall_timeout: Duration::from_secs(config.fetch_timeout_secs),
        ..Default::default()
    }
}

fn require_api_key(config: &AppConfig, explicit: Option<&str>) -> Result<String, Error> {
    config.resolve_api_key(explicit).ok_or_else(|| {
        Error::Validation(
            "Please provide your Google AI Studio API key (--api-key, GEMINI_API_KEY, or set-key)"
                .to_string(),
        )
    })
}

async fn build_pipeline(
    config: &AppConfig,
    api_key: &str,
    schema_type: SchemaType,
) -> Result<SchemaPipeline<PageFetcher>, Error> {
    println!("Note: fetching pages requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default {}",
        config.webdriver_url
    );

    let fetcher = PageFetcher::connect(fetcher_config(config)).await?;
    let generator = SchemaGenerator::new(GeminiClient::new(&config.model));
    Ok(SchemaPipeline::new(fetcher, generator, api_key)
        .with_schema_type(schema_type)
        .with_history(HistoryStore::new(config.history_path())))
}

#[allow(clippy::too_many_arguments)]
async fn run_generate(
    config: &AppConfig,
    api_key: Option<&str>,
    url: &str,
    schema_type: SchemaType,
    keywords: Option<String>,
    fields: Vec<(String, String)>,
    wrap: bool,
    output_path: Option<PathBuf>,
) -> Result<(), Error> {
    let api_key = require_api_key(config, api_key)?;

    let mut values: FieldValues = fields.into_iter().collect();
    if let Some(keywords) = keywords {
        values.insert("keywords".to_string(), keywords);
    }

    let pipeline = build_pipeline(config, &api_key, schema_type).await?;
    let result = pipeline.generate(url, &values).await;
    if let Err(e) = pipeline.into_source().close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }
    let schema = result?;

    let rendered = if wrap {
        output::wrap_script_tag(&schema)
    } else {
        schema.to_pretty()
    };
    match output_path {
        Some(path) => output::write_file(&path, &rendered)?,
        None => println!("{}", rendered),
    }
    Ok(())
}

async fn run_batch(
    config: &AppConfig,
    api_key: Option<&str>,
    file: &PathBuf,
    schema_type: SchemaType,
    out_text: Option<PathBuf>,
    out_json: Option<PathBuf>,
    retry_failed: bool,
) -> Result<(), Error> {
    let api_key = require_api_key(config, api_key)?;

    let csv = std::fs::read_to_string(file)?;
    let items = parse_batch_csv(&csv)?;
    if items.is_empty() {
        return Err(Error::Validation(
            "CSV contained no valid URLs".to_string(),
        ));
    }
    println!("Loaded {} URLs from {}", items.len(), file.display());

    let mut controller = BatchController::new();
    controller.load(items)?;
    spawn_interactive_controls(controller.controls());

    let pipeline = build_pipeline(config, &api_key, schema_type).await?;
    controller.start(&pipeline).await?;

    if retry_failed && controller.state() == BatchState::Completed {
        let failed: Vec<usize> = controller
            .results()
            .enumerate()
            .filter(|(_, r)| !r.success)
            .map(|(i, _)| i)
            .collect();
        for index in failed {
            if let Err(e) = controller.retry(index, &pipeline).await {
                ::log::warn!("Retry of item {} was rejected: {}", index, e);
            }
        }
    }

    if let Err(e) = pipeline.into_source().close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }

    for result in controller.results() {
        if result.success {
            println!("ok   {}", result.url);
        } else {
            println!(
                "FAIL {} ({})",
                result.url,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    let progress = controller.progress();
    println!(
        "{} of {} succeeded, {} failed",
        progress.succeeded, progress.total, progress.failed
    );

    let results: Vec<_> = controller.results().collect();
    if let Some(path) = out_text {
        match output::batch_text(&results) {
            Some(text) => output::write_file(&path, &text)?,
            None => println!("No successful schemas to export"),
        }
    }
    if let Some(path) = out_json {
        match output::batch_json(&results) {
            Some(text) => output::write_file(&path, &text)?,
            None => println!("No successful schemas to export"),
        }
    }
    Ok(())
}

/// First Ctrl-C pauses the batch, a second cancels it; Enter resumes a
/// paused batch.
fn spawn_interactive_controls(controls: BatchControls) {
    let signal_controls = controls.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if signal_controls.is_paused() || signal_controls.is_cancelled() {
                eprintln!("Cancelling batch, unfinished URLs will be marked failed");
                signal_controls.request_cancel();
                return;
            }
            signal_controls.pause();
            eprintln!("Batch paused. Ctrl-C again cancels, Enter resumes.");
        }
    });

    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if controls.is_paused() {
                eprintln!("Resuming batch");
                controls.resume();
            }
        }
    });
}

fn run_history(config: &AppConfig, command: HistoryCommand) -> Result<(), Error> {
    let store = HistoryStore::new(config.history_path());
    match command {
        HistoryCommand::List => {
            let entries = store.list();
            if entries.is_empty() {
                println!("History is empty");
                return Ok(());
            }
            for entry in entries {
                println!(
                    "{}  {:<12}  {}",
                    entry.id,
                    entry.schema_type.as_str(),
                    entry.url
                );
            }
            Ok(())
        }
        HistoryCommand::Show { id, wrap } => {
            let entry = lookup(&store, &id)?;
            if wrap {
                println!("{}", output::wrap_script_tag(&entry.schema));
            } else {
                println!("{}", entry.schema.to_pretty());
            }
            Ok(())
        }
        HistoryCommand::Delete { id } => {
            if store.delete(&id)? {
                println!("Deleted {}", id);
                Ok(())
            } else {
                Err(Error::Validation(format!("No history entry with id {}", id)))
            }
        }
        HistoryCommand::Clear => {
            store.clear()?;
            println!("History cleared");
            Ok(())
        }
        HistoryCommand::Export {
            id,
            output: path,
            wrap,
        } => {
            let entry = lookup(&store, &id)?;
            let rendered = if wrap {
                output::wrap_script_tag(&entry.schema)
            } else {
                entry.schema.to_pretty()
            };
            output::write_file(&path, &rendered)
        }
    }
}

fn lookup(store: &HistoryStore, id: &str) -> Result<schema_forge::history::HistoryEntry, Error> {
    store
        .get(id)
        .ok_or_else(|| Error::Validation(format!("No history entry with id {}", id)))
}

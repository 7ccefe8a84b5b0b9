//! # ZeroStack CLI (`zs`)
//!
//! Talks to a ZeroStack search service over HTTP.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `zs search "<query>"` | Search and print ranked documents |
//! | `zs get <id>` | Print one document |
//! | `zs docs` | List every document |
//! | `zs datasets` | List datasets |
//! | `zs upload --name <name> --file <path>` | Upload a dataset file |
//! | `zs upload --name <name> --text <data>` | Upload pasted text |
//! | `zs status` | Show the service banner |
//! | `zs shell` | Interactive session |
//!
//! ## Examples
//!
//! ```bash
//! zs search "apple" --dataset 3
//! cat notes.txt | zs upload --name "Meeting notes" --stdin
//! ZEROSTACK_URL=http://search.internal:8000 zs datasets
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zerostack::client::{SearchClient, SearchSubmit};
use zerostack::config::{self, Config};
use zerostack::models::DatasetId;
use zerostack::progress::{with_progress, Activity, ProgressMode};
use zerostack::render;
use zerostack::service::{HttpSearchService, SearchService};
use zerostack::session;
use zerostack::state::{OpState, UploadMode};

/// ZeroStack CLI: search documents and manage datasets on a ZeroStack
/// search service.
#[derive(Parser)]
#[command(
    name = "zs",
    about = "ZeroStack: search documents and upload datasets to a ZeroStack search service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means built-in defaults.
    #[arg(long, global = true, default_value = "./config/zs.toml")]
    config: PathBuf,

    /// Service base URL; overrides the config file and ZEROSTACK_URL.
    #[arg(long, global = true)]
    url: Option<String>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search documents.
    ///
    /// Prints results in ranked order. Results whose document cannot be
    /// fetched are skipped.
    Search {
        /// The search query string.
        query: String,

        /// Search within this dataset instead of the default one.
        #[arg(long)]
        dataset: Option<DatasetId>,

        /// Maximum number of results (defaults to `search.top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a document by id.
    Get {
        /// Document id.
        id: i64,
    },

    /// List every document known to the service.
    Docs,

    /// List datasets.
    Datasets,

    /// Upload a dataset from a file, inline text, or stdin.
    #[command(group(ArgGroup::new("payload").args(["file", "text", "stdin"]).multiple(false)))]
    Upload {
        /// Dataset display name.
        #[arg(long)]
        name: String,

        /// File to upload (CSV, JSON, plain text, ...).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Text to upload as-is.
        #[arg(long)]
        text: Option<String>,

        /// Read the text to upload from stdin.
        #[arg(long)]
        stdin: bool,
    },

    /// Show the service banner and version.
    Status,

    /// Start an interactive session.
    Shell,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zerostack={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let cfg = config::load_or_default(&cli.config)?;
    if let Some(url) = &cli.url {
        return cfg.with_base_url(url.as_str());
    }
    match std::env::var(config::URL_ENV) {
        Ok(url) if !url.trim().is_empty() => cfg
            .with_base_url(url.trim())
            .with_context(|| format!("invalid {}", config::URL_ENV)),
        _ => Ok(cfg),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = resolve_config(&cli)?;
    let http = HttpSearchService::new(&cfg)?;
    let base_url = http.base_url().to_string();
    let service: Arc<dyn SearchService> = Arc::new(http);
    let progress = ProgressMode::default_for_tty().reporter();

    match cli.command {
        Commands::Search {
            query,
            dataset,
            limit,
        } => {
            let top_k = limit.unwrap_or(cfg.search.top_k);
            if top_k == 0 {
                bail!("--limit must be >= 1");
            }
            let client = SearchClient::with_top_k(service, top_k);

            if dataset.is_some() {
                let loaded =
                    with_progress(&*progress, Activity::LoadingDatasets, client.mount()).await;
                if !loaded {
                    eprintln!("Error: could not load datasets from {}", base_url);
                    std::process::exit(1);
                }
                client.select_dataset(dataset)?;
            }

            let activity = Activity::Searching {
                query: query.trim().to_string(),
            };
            match with_progress(&*progress, activity, client.submit_search(&query)).await {
                SearchSubmit::Ignored => println!("No results."),
                SearchSubmit::Settled | SearchSubmit::Superseded => {
                    let state = client.search_state();
                    print!("{}", render::render_search_state(&state));
                    if let OpState::Failed(_) = state {
                        std::process::exit(1);
                    }
                }
            }
        }
        Commands::Get { id } => {
            let doc = match client_call(service.get_document(id)).await {
                Some(doc) => doc,
                None => std::process::exit(1),
            };
            print!("{}", render::render_document(&doc));
        }
        Commands::Docs => {
            if let Some(docs) = client_call(service.list_documents()).await {
                print!("{}", render::render_document_list(&docs));
            } else {
                std::process::exit(1);
            }
        }
        Commands::Datasets => {
            let client = SearchClient::new(service, &cfg);
            let loaded =
                with_progress(&*progress, Activity::LoadingDatasets, client.refresh_datasets())
                    .await;
            if !loaded {
                eprintln!("Error: could not load datasets from {}", base_url);
                std::process::exit(1);
            }
            print!("{}", render::render_datasets(&client.snapshot().catalog));
        }
        Commands::Upload {
            name,
            file,
            text,
            stdin,
        } => {
            let client = SearchClient::new(service, &cfg);
            client.set_dataset_name(name.as_str());
            if let Some(path) = file {
                client.select_file(path);
            } else if let Some(text) = text {
                client.set_upload_text(text);
            } else if stdin {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read upload text from stdin")?;
                client.set_upload_text(buf);
            } else {
                client.set_upload_mode(UploadMode::File);
            }

            let activity = Activity::Uploading {
                dataset_name: name.trim().to_string(),
            };
            match with_progress(&*progress, activity, client.submit_upload()).await {
                Some(Ok(result)) => print!("{}", render::render_upload_result(&result)),
                Some(Err(e)) => {
                    eprint!("{}", render::render_upload_error(&e));
                    std::process::exit(1);
                }
                None => bail!("an upload is already in progress"),
            }
        }
        Commands::Status => match client_call(service.status()).await {
            Some(status) => print!("{}", render::render_status(&base_url, &status)),
            None => std::process::exit(1),
        },
        Commands::Shell => {
            let client = SearchClient::new(service, &cfg);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            session::run(&client, stdin, &mut stdout).await?;
        }
    }

    Ok(())
}

/// Await a direct service call, printing the error on failure.
async fn client_call<T>(
    fut: impl std::future::Future<Output = zerostack::error::Result<T>>,
) -> Option<T> {
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

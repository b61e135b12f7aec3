use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod aggregator;
mod backend;
mod cache;
mod classifier;
mod cli_output;
mod config;
mod coordinator;
mod fixture;
mod http_backend;
mod normalize;
mod prefix;

use aggregator::ResultBuckets;
use backend::SearchBackend;
use cache::ResultCache;
use cli_output::{OutputMode, OutputWriter};
use config::CheckerConfig;
use coordinator::{BatchCoordinator, BatchError, BatchEvent, TERM_DELIMITER};
use fixture::FixtureBackend;
use http_backend::HttpBackend;

#[derive(Parser)]
#[command(name = "tmcheck")]
#[command(about = "Check terms against the trademark ID manual", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a batch of terms
    Check {
        /// Terms separated by semicolons
        #[arg(short, long, conflicts_with = "file")]
        terms: Option<String>,

        /// Read terms from a file (semicolons or newlines separate terms)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Serve registry pages from a JSON fixture instead of the network
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Maximum concurrent lookups (default: 20)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Registry gateway URL
        #[arg(long)]
        base_url: Option<String>,

        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show or initialize the configuration file
    Config {
        /// Action: show, init
        #[arg(default_value = "show")]
        action: String,
    },
}

/// Raw batch string from `--terms` or `--file`
fn read_batch(terms: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (terms, file) {
        (Some(terms), _) => Ok(terms),
        (None, Some(path)) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read terms from {}", path.display()))?;
            Ok(content.replace(['\r', '\n'], &TERM_DELIMITER.to_string()))
        }
        (None, None) => Err(anyhow!("Provide terms with --terms or --file")),
    }
}

async fn run_check(
    batch: String,
    config: CheckerConfig,
    backend: Arc<dyn SearchBackend>,
    mode: OutputMode,
) -> Result<()> {
    let mut output = OutputWriter::new(mode);
    let total = coordinator::parse_terms(&batch).len();
    if total == 0 {
        output.error("Please enter search terms");
        return Err(BatchError::EmptyInput.into());
    }

    let cache = Arc::new(ResultCache::new());
    let coordinator = BatchCoordinator::new(backend, cache, config.concurrency_limit);

    // Ctrl-C raises cancellation; in-flight queries finish their round trip
    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancelling search...");
            cancel.cancel();
        }
    });

    output.start_batch(total);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let run = tokio::spawn(async move { coordinator.run_batch(&batch, &tx).await });

    let mut results = Vec::new();
    while let Some(event) = rx.recv().await {
        output.on_event(&event);
        if let BatchEvent::Result { term, result } = event {
            results.push((term, result));
        }
    }

    match run.await? {
        Ok(_) => {
            output.report(&ResultBuckets::from_results(results));
            Ok(())
        }
        Err(e) => {
            output.error(&e.to_string());
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Check {
            terms,
            file,
            fixture,
            concurrency,
            base_url,
            json,
        } => {
            let config = CheckerConfig::load()?.apply_overrides(concurrency, base_url)?;
            let batch = read_batch(terms, file)?;
            let mode = if json {
                OutputMode::Json
            } else {
                OutputMode::auto()
            };

            let backend: Arc<dyn SearchBackend> = match fixture {
                Some(path) => {
                    info!("Using fixture {}", path.display());
                    Arc::new(FixtureBackend::load(&path)?)
                }
                None => {
                    let backend = HttpBackend::new(&config)?;
                    info!("Using registry gateway at {}", backend.base_url());
                    Arc::new(backend)
                }
            };

            run_check(batch, config, backend, mode).await
        }

        Commands::Config { action } => match action.as_str() {
            "show" => config::show_current_config(),
            "init" => {
                let path = config::init_config()?;
                println!("✅ Config written to: {}", path.display());
                Ok(())
            }
            other => Err(anyhow!("Unknown config action: {}. Use show or init", other)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_batch_from_terms() {
        let batch = read_batch(Some("boots; hats".to_string()), None).unwrap();
        assert_eq!(coordinator::parse_terms(&batch), vec!["boots", "hats"]);
    }

    #[test]
    fn test_read_batch_from_file_accepts_newlines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "running shoes; boots").unwrap();
        writeln!(file, "hats\r").unwrap();
        writeln!(file).unwrap();

        let batch = read_batch(None, Some(file.path().to_path_buf())).unwrap();
        assert_eq!(
            coordinator::parse_terms(&batch),
            vec!["running shoes", "boots", "hats"]
        );
    }

    #[test]
    fn test_read_batch_requires_input() {
        assert!(read_batch(None, None).is_err());
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from([
            "tmcheck",
            "check",
            "--terms",
            "boots;hats",
            "--concurrency",
            "4",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Check {
                terms,
                concurrency,
                json,
                ..
            } => {
                assert_eq!(terms.as_deref(), Some("boots;hats"));
                assert_eq!(concurrency, Some(4));
                assert!(json);
            }
            _ => panic!("expected check"),
        }
    }

    #[tokio::test]
    async fn test_run_check_with_fixture() {
        use crate::backend::{DescriptionRow, RawResultPage};

        let backend = FixtureBackend::new().with_page(
            "boots",
            RawResultPage::echo("boots", vec![DescriptionRow::new("Boots")]),
        );
        let result = run_check(
            "boots; zzz".to_string(),
            CheckerConfig::default(),
            Arc::new(backend),
            OutputMode::Plain,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_check_rejects_empty_batch_before_connecting() {
        let backend = Arc::new(FixtureBackend::new().refusing_connections());
        let err = run_check(
            " ; ;".to_string(),
            CheckerConfig::default(),
            backend.clone(),
            OutputMode::Plain,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BatchError>(),
            Some(BatchError::EmptyInput)
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_check_surfaces_session_failure() {
        let backend = FixtureBackend::new().refusing_connections();
        let result = run_check(
            "boots".to_string(),
            CheckerConfig::default(),
            Arc::new(backend),
            OutputMode::Plain,
        )
        .await;
        assert!(result.is_err());
    }
}

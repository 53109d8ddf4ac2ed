//! nodexport - export node collections to CSV
//!
//! # Usage
//!
//! ```bash
//! # Every node of a MongoDB collection
//! nodexport --uri mongodb://localhost:27017 --database facepager nodes.csv
//!
//! # Selected nodes and their children from a JSON Lines dump, tab separated
//! nodexport --input nodes.jsonl --select 12,40 --delimiter '\t' selection.csv
//! ```

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nodexport::cli::CliInterface;
use nodexport::error::{ExportError, Result};
use nodexport::export::{
    ExportResult, ExportScope, PagedQuery, ProgressTracker, Source, TreeModel, export,
    write_byte_order_mark,
};
use nodexport::store::{MemoryNodeStore, MongoNodeStore, NodeStore};

/// Buffer size for the destination file
const OUTPUT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run the export
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    run_export(&cli).await
}

/// Open the store, build the source and write the destination file
async fn run_export(cli: &CliInterface) -> Result<()> {
    let store = open_store(cli).await?;
    let columns = cli.custom_columns()?;

    let total = store.count().await?;
    let scope = cli.scope(total);
    let options = cli.export_options(scope);
    // Fail on a bad delimiter before the destination is touched
    options.resolved_delimiter()?;

    let model = TreeModel::new(store.as_ref(), &columns);
    let source = match scope {
        ExportScope::All => Source::paged(
            PagedQuery::new(store.as_ref(), &columns)
                .with_page_size(cli.config().export.page_size),
        ),
        ExportScope::Selected => {
            let ids = model.selected_with_children(&cli.args().select).await?;
            Source::fixed(&model, ids)
        }
    };

    let path = cli.output_path();
    let mut output = create_output(&path).await?;
    if options.use_byte_order_mark {
        write_byte_order_mark(&mut output).await?;
    }

    let cancel_token = CancellationToken::new();
    let ctrl_c_handle = spawn_ctrl_c_listener(cancel_token.clone());
    let mut tracker = ProgressTracker::new(cli.show_progress()).with_cancellation(cancel_token);

    let result = export(&mut output, &options, source, &mut tracker).await;
    ctrl_c_handle.abort();

    // The file is closed whatever the export outcome
    let closed = output.shutdown().await;
    let result = result?;
    closed.map_err(ExportError::Write)?;

    report(cli, &path, &result);
    Ok(())
}

/// Connect to MongoDB, or load the JSON Lines input when given
async fn open_store(cli: &CliInterface) -> Result<Box<dyn NodeStore>> {
    if let Some(input) = &cli.args().input {
        return Ok(Box::new(MemoryNodeStore::from_jsonl(input).await?));
    }

    let connection = &cli.config().connection;
    let store = MongoNodeStore::connect(
        &connection.uri,
        &connection.database,
        &connection.collection,
        cli.config().connection_timeout(),
    )
    .await?;
    Ok(Box::new(store))
}

/// Create or replace the destination file
async fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).await.map_err(|e| {
        ExportError::Io(io::Error::new(
            e.kind(),
            format!("Failed to create {}: {}", path.display(), e),
        ))
    })?;
    Ok(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file))
}

/// Cancel the export on Ctrl+C
fn spawn_ctrl_c_listener(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Cancellation requested");
                token.cancel();
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    })
}

/// Print the outcome of the export
fn report(cli: &CliInterface, path: &Path, result: &ExportResult) {
    info!("Export finished in {} ms", result.elapsed_ms);
    if cli.args().quiet {
        return;
    }
    if result.cancelled {
        println!(
            "Export cancelled: {} rows written to {}",
            result.rows_exported,
            path.display()
        );
    } else {
        println!(
            "Exported {} rows to {}",
            result.rows_exported,
            path.display()
        );
    }
}

/// Initialize logging system based on verbosity level
///
/// Logs go to stderr; `RUST_LOG` overrides the configured level.
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

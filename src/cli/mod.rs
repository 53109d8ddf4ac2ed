//! Command-line interface for nodexport
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and merging with arguments
//! - Building the immutable `ExportOptions` for a run
//! - Destination path selection

use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::error::Result;
use crate::export::{ExportOptions, ExportScope};
use crate::store::ColumnKey;

pub mod completion;

/// Export a node collection to CSV
#[derive(Parser, Debug)]
#[command(
    name = "nodexport",
    version,
    about = "Export tree-shaped node collections to CSV",
    long_about = "Export every node, or a selection of nodes with their children, from a \
MongoDB collection or a JSON Lines file to quoted, CRLF-terminated CSV."
)]
pub struct CliArgs {
    /// Destination file (`.csv` is appended when there is no extension)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// MongoDB connection URI
    #[arg(long, value_name = "URI")]
    pub uri: Option<String>,

    /// Database holding the nodes
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Collection holding the nodes
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,

    /// Read nodes from a JSON Lines file instead of MongoDB
    #[arg(short = 'i', long, value_name = "FILE", conflicts_with = "uri")]
    pub input: Option<PathBuf>,

    /// Export mode: all nodes (fast, by id) or selected nodes with children
    #[arg(long, value_name = "SCOPE")]
    pub scope: Option<ExportScope>,

    /// Selected node ids, exported with their children in tree order
    #[arg(short = 's', long = "select", value_name = "ID", value_delimiter = ',')]
    pub select: Vec<i64>,

    /// Field delimiter; escapes like \t are resolved
    #[arg(long, value_name = "DELIMITER")]
    pub delimiter: Option<String>,

    /// Do not write a byte order mark
    #[arg(long = "no-bom")]
    pub no_bom: bool,

    /// Keep line breaks inside cells
    #[arg(long = "keep-line-breaks")]
    pub keep_line_breaks: bool,

    /// Custom column extracted from node responses (`path` or `name=path`)
    #[arg(long = "column", value_name = "KEY")]
    pub columns: Vec<String>,

    /// Nodes fetched per page when exporting all nodes
    #[arg(long, value_name = "COUNT")]
    pub page_size: Option<u64>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (no progress bar, errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for nodexport
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = match Config::load_from_file(args.config_file.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to load configuration: {}", e);
                eprintln!("Using default configuration instead.");
                Config::default()
            }
        };

        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_args_to_config(&mut config, args);

        Ok(config)
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_connection_args(config, args);
        Self::apply_export_args(config, args);
        Self::apply_logging_args(config, args);
    }

    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if let Some(database) = &args.database {
            config.connection.database = database.clone();
        }
        if let Some(collection) = &args.collection {
            config.connection.collection = collection.clone();
        }
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }
    }

    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        if let Some(delimiter) = &args.delimiter {
            config.export.delimiter = delimiter.clone();
        }
        if args.no_bom {
            config.export.byte_order_mark = false;
        }
        if args.keep_line_breaks {
            config.export.strip_line_breaks = false;
        }
        if let Some(page_size) = args.page_size {
            config.export.page_size = page_size;
        }
        if !args.columns.is_empty() {
            config.export.custom_columns = args.columns.clone();
        }
    }

    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Export scope, suggested from the selection when not given explicitly
    ///
    /// # Arguments
    /// * `total` - Number of nodes in the store
    pub fn scope(&self, total: u64) -> ExportScope {
        self.args
            .scope
            .unwrap_or_else(|| ExportScope::suggest(self.args.select.len(), total))
    }

    /// Immutable export options for this run
    pub fn export_options(&self, scope: ExportScope) -> ExportOptions {
        self.config.export.to_options(scope)
    }

    /// Custom columns, parsed once for the whole export
    pub fn custom_columns(&self) -> Result<Vec<ColumnKey>> {
        ColumnKey::parse_all(&self.config.export.custom_columns)
    }

    /// Destination file path
    ///
    /// Uses a timestamped name when none was given and appends `.csv` to a
    /// path without extension.
    pub fn output_path(&self) -> PathBuf {
        match &self.args.output {
            Some(path) => with_default_extension(path),
            None => PathBuf::from(default_filename()),
        }
    }

    /// Whether to draw a progress bar
    pub fn show_progress(&self) -> bool {
        !self.args.quiet
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Completion { shell }) => {
                completion::generate_completion(shell)?;
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist");
            return;
        }

        match Config::from_file(&path) {
            Ok(config) => match config.validate() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration validation failed: {}", e),
            },
            Err(e) => println!("Failed to load configuration: {}", e),
        }
    }

    fn show_config(&self) -> Result<()> {
        println!("Configuration file: {}", self.get_config_path().display());
        println!();
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }
}

/// Timestamped default file name
pub fn default_filename() -> String {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("nodes-{}.csv", timestamp)
}

/// Append `.csv` when the path has no extension
pub fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliInterface {
        let mut argv = vec!["nodexport", "--config", "/nonexistent/nodexport.toml"];
        argv.extend_from_slice(args);
        CliInterface::from_args(CliArgs::try_parse_from(argv).unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&[]);
        let options = cli.export_options(cli.scope(100));
        assert_eq!(options, ExportOptions::default());
        assert!(cli.show_progress());
    }

    #[test]
    fn test_export_flags_override_config() {
        let cli = cli(&[
            "--delimiter",
            "\\t",
            "--no-bom",
            "--keep-line-breaks",
            "--column",
            "message",
            "--column",
            "author=from.name",
        ]);
        let options = cli.export_options(ExportScope::All);
        assert_eq!(options.resolved_delimiter().unwrap(), "\t");
        assert!(!options.use_byte_order_mark);
        assert!(!options.strip_line_breaks);
        let columns = cli.custom_columns().unwrap();
        assert_eq!(columns[1].name, "author");
    }

    #[test]
    fn test_scope_from_selection() {
        assert_eq!(cli(&[]).scope(10), ExportScope::All);
        assert_eq!(cli(&["--select", "1,2"]).scope(10), ExportScope::Selected);
        assert_eq!(cli(&["-s", "1", "-s", "2"]).scope(2), ExportScope::All);
        assert_eq!(cli(&["--scope", "all", "-s", "3"]).scope(10), ExportScope::All);
        assert_eq!(cli(&["--scope", "selected"]).scope(10), ExportScope::Selected);
    }

    #[test]
    fn test_input_conflicts_with_uri() {
        let parsed = CliArgs::try_parse_from(vec![
            "nodexport",
            "--input",
            "nodes.jsonl",
            "--uri",
            "mongodb://localhost",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_verbosity_sets_log_level() {
        assert_eq!(cli(&["-q"]).config().logging.level, LogLevel::Error);
        assert_eq!(cli(&["-v"]).config().logging.level, LogLevel::Debug);
        assert_eq!(cli(&["--vv"]).config().logging.level, LogLevel::Trace);
    }

    #[test]
    fn test_output_extension() {
        assert_eq!(
            with_default_extension(Path::new("out/nodes")),
            PathBuf::from("out/nodes.csv")
        );
        assert_eq!(
            with_default_extension(Path::new("nodes.txt")),
            PathBuf::from("nodes.txt")
        );
        let name = default_filename();
        assert!(name.starts_with("nodes-") && name.ends_with(".csv"));
    }
}

//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{load_config, Config, CONFIG_FILE};
use crate::models::MatchMode;
use crate::output;
use crate::query::QueryEngine;
use crate::server::run_server;
use crate::storage::Storage;

/// wscan: find which files contain a keyword
#[derive(Parser, Debug)]
#[command(
    name = "wscan",
    version,
    about = "Concurrent keyword search over a registry of text files",
    long_about = "wscan keeps a registry of text files and answers 'which files contain \
                  this keyword'. Answers come from an inverted index when it already knows \
                  the word, otherwise from a concurrent line-by-line scan whose results \
                  are then cached."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server
    ///
    /// Endpoints:
    ///   POST /upload              multipart field 'file'
    ///   GET  /files
    ///   GET  /search?keyword=<word>
    ///   GET  /stats
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Directory uploaded files are saved to
        #[arg(long, value_name = "DIR")]
        upload_dir: Option<PathBuf>,
    },

    /// Search files for a keyword once and print the matching paths
    ///
    /// Examples:
    ///   wscan search needle notes/*.txt
    ///   wscan search Needle a.txt b.txt --exact
    ///   wscan search needle a.txt --index --json
    Search {
        /// Keyword to look for
        keyword: String,

        /// Files to register before searching
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Index every file before searching
        #[arg(short, long)]
        index: bool,

        /// Case-sensitive matching (overrides the config)
        #[arg(long)]
        exact: bool,

        /// Maximum files scanned at once (0 = unbounded)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        let config = load_config(&self.config)?;

        match self.command {
            Command::Serve { port, host, upload_dir } => {
                handle_serve(config, port, host, upload_dir)
            }
            Command::Search { keyword, paths, index, exact, jobs, json } => {
                handle_search(config, keyword, paths, index, exact, jobs, json)
            }
        }
    }
}

/// Handle the `serve` subcommand
fn handle_serve(
    mut config: Config,
    port: Option<u16>,
    host: Option<String>,
    upload_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(upload_dir) = upload_dir {
        config.server.upload_dir = upload_dir;
    }

    log::info!(
        "Starting HTTP server on {}:{} (uploads in {:?})",
        config.server.host,
        config.server.port,
        config.server.upload_dir
    );

    println!("Starting wscan HTTP server...");
    println!("  Address: http://{}:{}", config.server.host, config.server.port);
    println!("\nEndpoints:");
    println!("  POST /upload");
    println!("  GET  /files");
    println!("  GET  /search?keyword=<word>");
    println!("  GET  /stats");
    println!("\nPress Ctrl+C to stop.");

    let storage = Arc::new(Storage::new());
    let engine = Arc::new(QueryEngine::new(storage, config.search.clone()));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(async { run_server(&config.server, engine).await })
}

/// Handle the `search` subcommand
fn handle_search(
    mut config: Config,
    keyword: String,
    paths: Vec<PathBuf>,
    index: bool,
    exact: bool,
    jobs: Option<usize>,
    as_json: bool,
) -> Result<()> {
    if exact {
        config.search.match_mode = MatchMode::Exact;
    }
    if let Some(jobs) = jobs {
        config.search.max_concurrent_scans = jobs;
    }

    let storage = Arc::new(Storage::new());
    let engine = QueryEngine::new(storage, config.search);
    for path in &paths {
        engine.register_file(path.to_string_lossy().into_owned());
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let files = runtime.block_on(async {
        if index {
            for path in &paths {
                let path = path.to_string_lossy();
                engine
                    .index_file(&path)
                    .await
                    .with_context(|| format!("Failed to index {}", path))?;
            }
        }
        engine
            .search(&keyword)
            .await
            .with_context(|| format!("Search for '{}' failed", keyword))
    })?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        output::warn(&format!("No files contain '{}'", keyword));
        return Ok(());
    }

    for file in &files {
        println!("{}", file);
    }
    output::success(&format!("Found '{}' in {} file(s)", keyword, files.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let cli = Cli::try_parse_from(["wscan", "-vv", "search", "needle", "a.txt", "b.txt", "--exact", "-j", "4"])
            .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
        match cli.command {
            Command::Search { keyword, paths, index, exact, jobs, json } => {
                assert_eq!(keyword, "needle");
                assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
                assert!(!index);
                assert!(exact);
                assert_eq!(jobs, Some(4));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_search_requires_paths() {
        assert!(Cli::try_parse_from(["wscan", "search", "needle"]).is_err());
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["wscan", "serve", "--port", "9001", "--upload-dir", "/tmp/up"]).unwrap();

        match cli.command {
            Command::Serve { port, host, upload_dir } => {
                assert_eq!(port, Some(9001));
                assert_eq!(host, None);
                assert_eq!(upload_dir, Some(PathBuf::from("/tmp/up")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tree_reader::{CompositeReader, ProviderConfig, UrlReader};
use tree_reader_bitbucket::BitbucketUrlReader;

#[derive(Parser)]
#[command(name = "tree-reader")]
#[command(about = "Fetch files and source trees from Bitbucket repositories")]
struct Cli {
    /// Log pipeline steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the tree a repository URL points at
    Tree {
        /// Repository, branch or directory URL
        url: String,
        /// Skip the download if the tree is still at this etag
        #[arg(long)]
        etag: Option<String>,
        /// Write the files into this directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print every file path and size
        #[arg(long)]
        list: bool,
    },
    /// Fetch the raw content of a single file
    Read {
        /// File URL
        url: String,
        /// Write to this path instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn bitbucket_token() -> Option<String> {
    std::env::var("BITBUCKET_TOKEN").ok()
}

fn build_providers() -> Result<Vec<ProviderConfig>> {
    let app_config = config::load_config();
    let token = bitbucket_token();

    app_config
        .providers
        .iter()
        .map(|entry| {
            entry
                .to_provider(token.as_deref())
                .with_context(|| format!("invalid provider entry for {}", entry.host))
        })
        .collect()
}

fn build_reader() -> Result<Arc<dyn UrlReader>> {
    let bitbucket = BitbucketUrlReader::new(build_providers()?);
    tracing::debug!(providers = %bitbucket, "configured reader");

    let readers: Vec<Arc<dyn UrlReader>> = vec![Arc::new(bitbucket)];
    Ok(Arc::new(CompositeReader::new(readers)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let reader = build_reader()?;

    match cli.command {
        Command::Tree {
            url,
            etag,
            out,
            list,
        } => {
            commands::tree::run(
                reader.as_ref(),
                &url,
                etag.as_deref(),
                out.as_deref(),
                list,
            )
            .await
        }
        Command::Read { url, out } => {
            commands::read::run(reader.as_ref(), &url, out.as_deref()).await
        }
    }
}

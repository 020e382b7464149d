mod config;
mod output;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};

use bundlelog_k8s::{IdentitySettings, build_resolver, prefetch};
use bundlelog_logs::{Annotator, SearchOptions, SortOrder, SubstringFilter, run_search};

use config::Config;

/// bundlelog - merge, sort and annotate log lines from a support bundle
#[derive(Parser, Debug)]
#[command(name = "bundlelog")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to $BUNDLELOG_CONFIG, then ./bundlelog.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search log files and emit matching lines in timestamp order
    Search(SearchArgs),
    /// Remove lines containing any listed substring and squeeze blank lines
    Strip(StripArgs),
}

#[derive(ClapArgs, Debug)]
struct SearchArgs {
    /// Directory to search recursively
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Literal string a line must contain
    #[arg(value_name = "PATTERN")]
    pattern: String,

    /// Output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Bundle root holding manifests and the pod inventory
    /// (defaults to ROOT, or its parent when ROOT is a `logs` directory)
    #[arg(long, value_name = "DIR")]
    bundle: Option<PathBuf>,

    /// Drop matching lines that contain this literal string
    #[arg(short = 'x', long)]
    exclude: Option<String>,

    /// Basename glob of files to search, repeatable
    #[arg(short, long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// Sort order: ascending or descending
    #[arg(long)]
    order: Option<SortOrder>,

    /// Do not annotate lines with pod owner and node
    #[arg(long)]
    no_annotate: bool,

    /// Namespace for the live cluster query
    #[arg(short = 'n', long)]
    namespace: Option<String>,

    /// Kubeconfig context for the live cluster query
    #[arg(long)]
    context: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct StripArgs {
    /// File to filter
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Comma-separated literal substrings to remove
    #[arg(value_name = "REMOVE_LIST")]
    remove: String,

    /// Output file (stdout when omitted; may equal INPUT)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Rewrite INPUT in place
    #[arg(long, conflicts_with = "output")]
    in_place: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    exit_code(run(args).await)
}

/// Report a failure once on stderr and map it to the process status
fn exit_code(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    match args.command {
        Command::Search(search) => run_search_command(search, config).await,
        Command::Strip(strip) => run_strip_command(strip),
    }
}

async fn run_search_command(args: SearchArgs, config: Config) -> Result<()> {
    let options = SearchOptions {
        include: if args.include.is_empty() {
            config.search.include
        } else {
            args.include
        },
        needle: args.pattern,
        exclude: args.exclude.unwrap_or(config.search.exclude),
        order: args.order.unwrap_or(config.search.sort_order),
        root: args.root,
    };

    let identity = config.identity;
    let settings = IdentitySettings {
        bundle_root: args
            .bundle
            .unwrap_or_else(|| default_bundle_root(&options.root)),
        sources: identity.sources,
        namespace: args.namespace.unwrap_or(identity.namespace),
        inventory_path: identity.inventory_path,
        context: args.context.or(identity.context),
    };

    // The root must exist before any prefetch blocks on the cluster
    if !options.root.is_dir() {
        anyhow::bail!(
            "Search root {} does not exist or is not a directory",
            options.root.display()
        );
    }

    let annotate = identity.annotate && !args.no_annotate;
    let mut setup = if annotate {
        let prefetched = prefetch(&settings).await;
        Some(build_resolver(&settings, prefetched))
    } else {
        info!("Annotation turned off");
        None
    };

    let mut annotator = match setup.as_mut() {
        Some(setup) if setup.annotate => Annotator::enabled(&mut setup.resolver),
        _ => Annotator::disabled(),
    };

    let summary = output::with_output(args.output.as_deref(), |out| {
        run_search(&options, &mut annotator, out).context("Search failed")
    })?;

    if summary.dropped_without_timestamp > 0 {
        warn!(
            "{} matched lines had no timestamp and were left out",
            summary.dropped_without_timestamp
        );
    }
    info!(
        "Wrote {} lines from {} files",
        summary.lines_written, summary.files
    );
    Ok(())
}

/// `bundle/logs` searches resolve against `bundle`
fn default_bundle_root(root: &Path) -> PathBuf {
    match (root.file_name(), root.parent()) {
        (Some(name), Some(parent)) if name == "logs" => parent.to_path_buf(),
        _ => root.to_path_buf(),
    }
}

fn run_strip_command(args: StripArgs) -> Result<()> {
    let filter = SubstringFilter::parse(&args.remove);
    if filter.needles().is_empty() {
        warn!("Removal list is empty; only blank lines will be squeezed");
    }

    let input = File::open(&args.input)
        .context(format!("Failed to open {}", args.input.display()))?;
    let target = if args.in_place {
        Some(args.input.as_path())
    } else {
        args.output.as_deref()
    };

    let written = output::with_output(target, |out| {
        filter
            .filter_stream(BufReader::new(input), out)
            .context(format!("Failed to filter {}", args.input.display()))
    })?;
    info!("Wrote {} lines", written);
    Ok(())
}

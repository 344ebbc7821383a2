//! The `switchyard` command-line tool.
//!
//! Inspects route manifests and path templates without writing code:
//!
//! ```text
//! switchyard match routes.yaml /posts/12.json --method GET --output json
//! switchyard compile "/posts/:id?" --strict
//! switchyard routes routes.yaml
//! ```
//!
//! Logging goes to stderr. It is controlled by `SWITCHYARD_LOG` (an
//! `EnvFilter` directive) or by repeating `-v`.

mod output;
mod report;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::executor::block_on;
use switchyard_dispatch::{RequestContext, RouteManifest, RouteTable};
use switchyard_pattern::{compile, CompileOptions};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub use output::{render, to_json, to_yaml, OutputMode, SerializeError};
pub use report::{CompileReport, MatchReport, RouteListing, RouteSummary};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SWITCHYARD_LOG";

/// Inspect route manifests and path templates
#[derive(Debug, Parser)]
#[command(name = "switchyard")]
#[command(version)]
#[command(about = "Inspect route manifests and path templates")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputMode::Text)]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Dispatch a path through a manifest and show the captured parameters
    Match(MatchArgs),

    /// Compile a path template and show the generated expression
    Compile(CompileArgs),

    /// List the routes of a manifest
    Routes(RoutesArgs),
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Route manifest (.yaml, .yml or .json)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Request path, optionally with a query string
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Only consider routes with this method
    #[arg(short, long)]
    pub method: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Path template, e.g. "/users/:id"
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Match letter case exactly
    #[arg(long)]
    pub sensitive: bool,

    /// Require the trailing slash to match exactly
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct RoutesArgs {
    /// Route manifest (.yaml, .yml or .json)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
}

/// Rendered command output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    /// False when the command ran but found nothing, e.g. an unmatched path.
    pub success: bool,
}

/// Installs the stderr log subscriber.
///
/// `SWITCHYARD_LOG` wins over `verbose` when it is set and valid.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs the selected command.
pub fn run(cli: &Cli) -> anyhow::Result<CommandOutput> {
    match &cli.command {
        Commands::Match(args) => run_match(args, cli.output),
        Commands::Compile(args) => run_compile(args, cli.output),
        Commands::Routes(args) => run_routes(args, cli.output),
    }
}

fn load_table(path: &Path) -> anyhow::Result<RouteTable> {
    let table = RouteManifest::load(path)?
        .into_table()
        .with_context(|| format!("invalid route in {}", path.display()))?;
    debug!(routes = table.len(), "route table built");
    Ok(table)
}

fn run_match(args: &MatchArgs, mode: OutputMode) -> anyhow::Result<CommandOutput> {
    let table = load_table(&args.manifest)?;

    let mut ctx = RequestContext::new(args.path.as_str());
    if let Some(method) = &args.method {
        ctx = ctx.with_method(method.as_str());
    }

    let outcome = block_on(table.run(&mut ctx))?;
    let report = MatchReport::new(&table, &ctx, &outcome);

    Ok(CommandOutput {
        text: render(&report, mode)?,
        success: report.is_success(),
    })
}

fn run_compile(args: &CompileArgs, mode: OutputMode) -> anyhow::Result<CommandOutput> {
    let options = CompileOptions::new()
        .sensitive(args.sensitive)
        .strict(args.strict);
    let pattern = compile(&args.template, options)?;

    Ok(CommandOutput {
        text: render(&CompileReport::from(&pattern), mode)?,
        success: true,
    })
}

fn run_routes(args: &RoutesArgs, mode: OutputMode) -> anyhow::Result<CommandOutput> {
    let table = load_table(&args.manifest)?;

    Ok(CommandOutput {
        text: render(&RouteListing::from(&table), mode)?,
        success: true,
    })
}

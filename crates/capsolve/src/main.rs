use std::path::PathBuf;

use anyhow::Context;
use capsolve::{ProbeRequest, explain, probe};
use capsolve_context::RunConfig;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "capsolve-probe")]
struct Cli {
    /// Run descriptor (toml/json). Defaults apply when omitted.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Repository index file (JSON); repeat in preference order.
    #[arg(long = "repo", value_name = "PATH")]
    repos: Vec<PathBuf>,

    /// Requirement clause to look up, e.g. `osgi.wiring.package;filter:="(osgi.wiring.package=com.x)"`.
    #[arg(long = "require", value_name = "CLAUSE")]
    requires: Vec<String>,

    /// Print the initialization report and exit.
    #[arg(long)]
    explain: bool,

    /// Emit the outcome as JSON.
    #[arg(long)]
    json: bool,

    /// Log at debug level.
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {err}");
    }

    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "probe failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RunConfig::from_path(path)?,
        None => RunConfig::default(),
    }
    .with_env_overrides();
    let request = ProbeRequest {
        config,
        indexes: cli.repos,
        requirements: cli.requires,
    };

    if cli.explain {
        print!("{}", explain(request)?);
        return Ok(());
    }

    let outcome = probe(request)?;
    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&outcome).context("failed to render probe outcome")?;
        println!("{rendered}");
    } else {
        println!("{outcome}");
    }
    Ok(())
}

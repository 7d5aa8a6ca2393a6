use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weaver::{run_check, run_generate, GenerateOptions};
use weaver_core::Diagnostics;

#[derive(Parser)]
#[command(name = "weaver")]
#[command(about = "Generate service registrations, injection constructors and value comparers", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all generators and write their files
    Generate {
        /// Program model (JSON format)
        #[arg(short, long)]
        model: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Config file (defaults to weaver.toml next to the model)
        #[arg(short, long, env = "WEAVER_CONFIG")]
        config: Option<PathBuf>,

        /// State file (defaults to .weaver-state.json in the output directory)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Extract and resolve only, printing diagnostics
    Check {
        /// Program model (JSON format)
        #[arg(short, long)]
        model: PathBuf,

        /// Config file (defaults to weaver.toml next to the model)
        #[arg(short, long, env = "WEAVER_CONFIG")]
        config: Option<PathBuf>,

        /// Print diagnostics as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug) // Show target module in debug mode
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            model,
            out,
            config,
            state,
            json,
        } => {
            let report = run_generate(&GenerateOptions {
                model,
                out,
                config,
                state,
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_diagnostics(&report.diagnostics);
            }
            info!(
                "{} written, {} unchanged, {} removed",
                report.written.len(),
                report.unchanged.len(),
                report.removed.len()
            );
            fail_on_errors(&report.diagnostics)
        }
        Commands::Check {
            model,
            config,
            json,
        } => {
            let diagnostics = run_check(&model, config.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            } else {
                print_diagnostics(&diagnostics);
            }
            fail_on_errors(&diagnostics)
        }
    }
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{}", diagnostic);
    }
    if !diagnostics.is_empty() {
        info!("{}", diagnostics.format_summary());
    }
}

fn fail_on_errors(diagnostics: &Diagnostics) -> Result<()> {
    let errors = diagnostics.errors().count();
    if errors > 0 {
        anyhow::bail!("{} error diagnostic(s) reported", errors);
    }
    Ok(())
}

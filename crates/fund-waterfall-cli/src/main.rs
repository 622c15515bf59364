mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::irr::IrrArgs;
use commands::waterfall::WaterfallArgs;

/// Private fund distribution waterfall calculations
#[derive(Parser)]
#[command(
    name = "fwf",
    version,
    about = "Private fund distribution waterfall calculations",
    long_about = "Runs LP/GP cash flows through a European waterfall (return of capital, \
                  compounding preferred return, GP catch-up, carried interest) with decimal \
                  precision, and solves IRR and MOIC for the resulting series."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Diagnostics on stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate a cash-flow schedule (or a target gross IRR) through the waterfall
    Waterfall(WaterfallArgs),
    /// Solve IRR and MOIC for a cash-flow series
    Irr(IrrArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fund_waterfall_core={default_level},fund_waterfall_cli={default_level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::Irr(args) => commands::irr::run_irr(args),
        Commands::Version => {
            println!("fwf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(commands::exit_code(e.as_ref()));
        }
    }
}

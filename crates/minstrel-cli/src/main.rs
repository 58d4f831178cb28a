//! `minstrel` runs the bundled demo library under call interception.
//!
//! `demo` loads the library module by module and prints every traced call,
//! `inspect` shows which methods a wrap would touch, and `validate` checks a
//! configuration file without running anything.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod library;

/// Trace method calls on the demo library's types
#[derive(Parser)]
#[command(name = "minstrel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML file with the instrument spec, trace format and deny rules
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// How reports are printed; trace lines follow --trace instead
    #[arg(short = 'f', long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Log engine activity to stderr; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print only the call summary and no error text
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Output format options.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl OutputFormat {
    /// Serialise `value` in this JSON flavour.
    pub fn to_json<T: serde::Serialize>(self, value: &T) -> serde_json::Result<String> {
        match self {
            OutputFormat::JsonCompact => serde_json::to_string(value),
            _ => serde_json::to_string_pretty(value),
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the bundled demo library under instrumentation
    Demo(commands::demo::DemoArgs),
    /// List the demo types, their methods and deny decisions
    Inspect(commands::inspect::InspectArgs),
    /// Validate a configuration file
    Validate(commands::validate::ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(cli.verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Demo(args) => commands::demo::execute(args, config, cli.format, cli.quiet),
        Commands::Inspect(args) => commands::inspect::execute(args, config, cli.format),
        Commands::Validate(args) => commands::validate::execute(args, cli.format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
///
/// Engine crates get more detail per `-v`; everything else stays at `warn`
/// until `-vvv`.
fn default_directives(verbose: u8) -> String {
    let engine = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => return "trace".to_string(),
    };
    ["minstrel", "minstrel_core", "minstrel_deny", "minstrel_intercept", "minstrel_observe"]
        .iter()
        .fold("warn".to_string(), |mut directives, target| {
            directives.push_str(&format!(",{target}={engine}"));
            directives
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_demo() {
        let cli = Cli::try_parse_from([
            "minstrel",
            "-vv",
            "demo",
            "--instrument",
            "Widget,:all:",
            "--trace",
            "json",
            "-f",
            "json-compact",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.format, OutputFormat::JsonCompact));
        match cli.command {
            Commands::Demo(args) => {
                assert_eq!(args.instrument.as_deref(), Some("Widget,:all:"));
                assert_eq!(args.trace, Some(minstrel_observe::TraceFormat::Json));
            }
            _ => panic!("expected demo"),
        }
    }

    #[test]
    fn test_default_directives() {
        let quiet = default_directives(0);
        assert!(quiet.starts_with("warn,"));
        assert!(quiet.contains("minstrel_intercept=warn"));

        let verbose = default_directives(2);
        for target in ["minstrel", "minstrel_deny", "minstrel_intercept"] {
            assert!(verbose.contains(&format!("{target}=debug")), "{target}");
        }
        assert!(EnvFilter::try_new(&verbose).is_ok());

        assert_eq!(default_directives(3), "trace");
        assert_eq!(default_directives(9), "trace");
    }

    #[test]
    fn test_compact_json() {
        let json = OutputFormat::JsonCompact.to_json(&vec![1, 2]).unwrap();
        assert_eq!(json, "[1,2]");
    }
}

//! Validate command - Validate a configuration file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use minstrel::prelude::*;

use crate::OutputFormat;
use crate::library;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the configuration file
    #[arg(required = true)]
    pub file: PathBuf,

    /// Also validate this instrument spec
    #[arg(short, long)]
    pub instrument: Option<String>,
}

/// Validation result.
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instrument: Option<String>,
    trace_format: Option<TraceFormat>,
    deny_rules: usize,
    warnings: Vec<String>,
    errors: Vec<String>,
}

/// Execute the validate command.
pub fn execute(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let mut result = ValidationResult {
        valid: true,
        path: args.file.display().to_string(),
        instrument: None,
        trace_format: None,
        deny_rules: 0,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    match MinstrelConfig::from_file(&args.file) {
        Ok(config) => {
            let engine = config.engine_config();
            result.trace_format = Some(config.trace.format);
            result.deny_rules = engine.deny.len();

            let known: BTreeSet<String> = library::modules()
                .iter()
                .flat_map(|module| module.type_names().map(String::from).collect::<Vec<_>>())
                .collect();
            for rule in &engine.deny {
                if !known.contains(&rule.type_name) {
                    result.warnings.push(format!(
                        "Deny rule names '{}', which the demo library does not define",
                        rule.type_name
                    ));
                }
            }

            let spec = args.instrument.or(config.instrument);
            match spec.as_deref().map(InstrumentSpec::parse) {
                Some(Ok(spec)) => {
                    if let InstrumentSpec::Names(names) = &spec {
                        for name in names.iter().filter(|name| !known.contains(*name)) {
                            result.warnings.push(format!(
                                "'{name}' is not defined by the demo library and would stay pending"
                            ));
                        }
                    }
                    result.instrument = Some(spec.to_string());
                }
                Some(Err(e)) => {
                    result.valid = false;
                    result.errors.push(e.to_string());
                }
                None => result
                    .warnings
                    .push("No instrument spec; nothing would be traced".to_string()),
            }
        }
        Err(e) => {
            result.valid = false;
            result.errors.push(e.to_string());
        }
    }

    // Output results
    match format {
        OutputFormat::Human => {
            if result.valid {
                println!("Configuration is valid: {}", args.file.display());
                if let Some(spec) = &result.instrument {
                    println!("  Instrument: {spec}");
                }
                if let Some(trace) = result.trace_format {
                    println!("  Trace format: {trace}");
                }
                println!("  Deny rules: {}", result.deny_rules);

                if !result.warnings.is_empty() {
                    println!("\nWarnings:");
                    for warning in &result.warnings {
                        println!("  - {warning}");
                    }
                }
            } else {
                println!("Configuration is INVALID: {}", args.file.display());
                for error in &result.errors {
                    println!("  Error: {error}");
                }
            }
        }
        OutputFormat::Json | OutputFormat::JsonCompact => println!("{}", format.to_json(&result)?),
    }

    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Validation failed"))
    }
}

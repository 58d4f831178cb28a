//! Demo command - Run the bundled library under instrumentation.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use minstrel::prelude::*;
use minstrel_core::{IntoShared, ModuleDef};
use minstrel_observe::CallSnapshot;

use crate::OutputFormat;
use crate::library::{self, StepOutcome};

/// Arguments for the demo command.
#[derive(Args)]
pub struct DemoArgs {
    /// Types to instrument: comma-separated names, or :all:
    #[arg(short, long, env = "MINSTREL_INSTRUMENT")]
    pub instrument: Option<String>,

    /// Trace line format (human or json)
    #[arg(long)]
    pub trace: Option<TraceFormat>,

    /// Count calls without printing the trace
    #[arg(long)]
    pub no_trace: bool,
}

/// One module load and the calls made after it.
#[derive(Debug, Serialize)]
struct ModuleRun {
    module: String,
    preloaded: bool,
    wrapped_on_load: Vec<String>,
    steps: Vec<StepOutcome>,
}

/// Demo result.
#[derive(Debug, Serialize)]
struct DemoReport {
    spec: Option<String>,
    wrapped: Vec<String>,
    pending: Vec<String>,
    modules: Vec<ModuleRun>,
    calls: CallSnapshot,
}

/// Execute the demo command.
pub fn execute(
    args: DemoArgs,
    config: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => MinstrelConfig::from_file(path).context("Failed to load configuration")?,
        None => MinstrelConfig::default(),
    };

    // Deny rules resolve when the engine is built, so modules they name load first.
    let denied: BTreeSet<String> = config
        .engine_config()
        .deny
        .iter()
        .map(|rule| rule.type_name.clone())
        .collect();
    let (preload, deferred): (Vec<ModuleDef>, Vec<ModuleDef>) = library::modules()
        .into_iter()
        .partition(|module| module.type_names().any(|name| denied.contains(name)));

    let registry = TypeRegistry::new().into_shared();
    let mut runs = Vec::new();
    for module in preload {
        let name = module.name().to_string();
        registry
            .load(module)
            .with_context(|| format!("Failed to load module '{name}'"))?;
        runs.push(ModuleRun {
            module: name,
            preloaded: true,
            wrapped_on_load: Vec::new(),
            steps: Vec::new(),
        });
    }

    let mut builder = Minstrel::builder()
        .with_registry(Arc::clone(&registry))
        .with_config(config);
    if let Some(trace) = args.trace {
        builder = builder.with_trace_format(trace);
    }
    let runtime = builder.build().context("Failed to create runtime")?;

    let counter = Arc::new(CallCounter::new());
    let mut observers = ObserverSet::new().with(counter.clone());
    if !args.no_trace {
        observers.push(runtime.trace_observer());
    }
    let observer = observers.into_shared();

    let spec = runtime
        .startup_spec(args.instrument)
        .context("Invalid instrument spec")?;
    match &spec {
        Some(spec) => {
            let report = runtime.instrument(spec, observer);
            if !quiet && matches!(format, OutputFormat::Human) {
                println!(
                    "Instrumenting {spec}: {} wrapped, {} deferred",
                    report.wrapped.len(),
                    report.deferred.len()
                );
            }
        }
        None => tracing::warn!("Nothing to instrument; set --instrument or MINSTREL_INSTRUMENT"),
    }

    // Preloaded modules run their script once instrumentation is in place.
    for run in &mut runs {
        run.steps = library::run_script(&run.module, &registry);
    }

    for module in deferred {
        let name = module.name().to_string();
        let before = wrapped_names(runtime.engine());
        registry
            .load(module)
            .with_context(|| format!("Failed to load module '{name}'"))?;
        let wrapped_on_load = wrapped_names(runtime.engine())
            .difference(&before)
            .cloned()
            .collect();

        let steps = library::run_script(&name, &registry);
        runs.push(ModuleRun {
            module: name,
            preloaded: false,
            wrapped_on_load,
            steps,
        });
    }

    let report = DemoReport {
        spec: spec.map(|s| s.to_string()),
        wrapped: wrapped_names(runtime.engine()).into_iter().collect(),
        pending: runtime
            .engine()
            .pending()
            .iter()
            .map(ToString::to_string)
            .collect(),
        modules: runs,
        calls: counter.snapshot(),
    };

    match format {
        OutputFormat::Human => print_human(&report, quiet),
        OutputFormat::Json | OutputFormat::JsonCompact => println!("{}", format.to_json(&report)?),
    }

    Ok(())
}

fn wrapped_names(engine: &Engine) -> BTreeSet<String> {
    engine
        .wrapped_types()
        .iter()
        .map(|ty| ty.name().to_string())
        .collect()
}

fn print_human(report: &DemoReport, quiet: bool) {
    if !quiet {
        for run in &report.modules {
            if run.preloaded {
                println!("Preloaded {}", run.module);
            } else if run.wrapped_on_load.is_empty() {
                println!("Loaded {}", run.module);
            } else {
                println!(
                    "Loaded {}: wrapped {}",
                    run.module,
                    run.wrapped_on_load.join(", ")
                );
            }

            for step in &run.steps {
                match (&step.value, &step.error) {
                    (_, Some(error)) => println!("  {} raised {}", step.call, error),
                    (Some(value), None) => println!("  {} => {}", step.call, value),
                    (None, None) => println!("  {}", step.call),
                }
            }
        }
        println!();
    }

    print!("{}", report.calls.to_text());
    if !report.pending.is_empty() {
        println!("Pending: {}", report.pending.join(", "));
    }
}

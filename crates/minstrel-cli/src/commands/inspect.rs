//! Inspect command - List the demo types and what would be wrapped.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use minstrel::prelude::*;
use minstrel_core::{IntoShared, MethodName};
use minstrel_deny::{DenyDecision, DenyList};

use crate::OutputFormat;
use crate::library;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Only show these types
    #[arg(long = "type")]
    pub types: Vec<String>,

    /// Show built-in types too
    #[arg(long, short)]
    pub all: bool,
}

/// Inspection result for one type.
#[derive(Debug, Serialize)]
struct TypeDisplay {
    name: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<String>,
    ancestors: Vec<String>,
    instance_methods: Vec<MethodDisplay>,
    static_methods: Vec<MethodDisplay>,
}

#[derive(Debug, Serialize)]
struct MethodDisplay {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    denied_by: Option<String>,
}

impl MethodDisplay {
    fn new(deny: &DenyList, ty: &TypeRef, scope: Scope, method: &MethodName) -> Self {
        let denied_by = match deny.evaluate(ty, scope, method.as_str()) {
            DenyDecision::Allowed => None,
            DenyDecision::Denied(reason) => Some(reason.denied_by_name),
        };
        Self {
            name: method.to_string(),
            denied_by,
        }
    }
}

impl TypeDisplay {
    fn new(deny: &DenyList, ty: &TypeRef) -> Self {
        Self {
            name: ty.name().to_string(),
            kind: format!("{:?}", ty.kind()).to_lowercase(),
            module: ty.module().map(String::from),
            ancestors: ty.ancestor_names(),
            instance_methods: ty
                .instance_method_names()
                .iter()
                .map(|m| MethodDisplay::new(deny, ty, Scope::Instance, m))
                .collect(),
            static_methods: ty
                .static_method_names()
                .iter()
                .map(|m| MethodDisplay::new(deny, ty, Scope::Static, m))
                .collect(),
        }
    }
}

/// Execute the inspect command.
pub fn execute(args: InspectArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = match config {
        Some(path) => MinstrelConfig::from_file(path).context("Failed to load configuration")?,
        None => MinstrelConfig::default(),
    };

    let registry = TypeRegistry::new().into_shared();
    for module in library::modules() {
        registry.load(module).context("Failed to load demo library")?;
    }

    let runtime = Minstrel::builder()
        .with_registry(Arc::clone(&registry))
        .with_config(config)
        .build()
        .context("Failed to create runtime")?;
    let deny = runtime.engine().deny_list();

    let types: Vec<TypeDisplay> = registry
        .types()
        .iter()
        .filter(|ty| {
            if !args.types.is_empty() {
                return args.types.iter().any(|name| name == ty.name());
            }
            args.all || ty.module().is_some()
        })
        .map(|ty| TypeDisplay::new(deny, ty))
        .collect();

    match format {
        OutputFormat::Human => {
            for ty in &types {
                match &ty.module {
                    Some(module) => println!("{} {} (module {})", ty.kind, ty.name, module),
                    None => println!("{} {}", ty.kind, ty.name),
                }
                println!("  Ancestors: {}", ty.ancestors.join(" < "));
                print_methods("Instance methods", &ty.instance_methods);
                print_methods("Static methods", &ty.static_methods);
                println!();
            }
        }
        OutputFormat::Json | OutputFormat::JsonCompact => println!("{}", format.to_json(&types)?),
    }

    Ok(())
}

fn print_methods(title: &str, methods: &[MethodDisplay]) {
    println!("  {} ({}):", title, methods.len());
    for method in methods {
        match &method.denied_by {
            Some(owner) => println!("    {} [skipped: denied by {}]", method.name, owner),
            None => println!("    {}", method.name),
        }
    }
}

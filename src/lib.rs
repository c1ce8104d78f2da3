// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod dynamic;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod value;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cache::MemoryCache;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dynamic::subtarget_trace;
use crate::engine::{Driver, IdentityBody, RunReport, Session};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (plus CLI overrides)
/// - an in-memory cache seeded with literal target values
/// - a session driven to completion with identity target bodies
/// - a summary of every dynamic target's sub-targets and traces
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;

    if let Some(n) = args.max_expand {
        if n == 0 {
            bail!("--max-expand must be >= 1 (got 0)");
        }
        cfg.config.max_expand = Some(n);
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let cache = Arc::new(MemoryCache::new());
    let session = Session::from_config(&cfg, cache)?;
    let report = Driver::new(&session, IdentityBody).run()?;
    info!(
        built = report.built.len(),
        aggregated = report.aggregated.len(),
        "expansion preview complete"
    );

    print_report(&session, &report)?;
    Ok(())
}

/// Print each registered dynamic target with its sub-targets and their
/// trace entries.
fn print_report(session: &Session, report: &RunReport) -> Result<()> {
    println!("branchdag expansion");
    for reg in report.registrations.iter() {
        let value = session.value_of(&reg.target)?;
        println!(
            "  {} ({} sub-targets, {} built)",
            reg.target,
            reg.subtargets.len(),
            reg.to_build.len()
        );
        let trace_names: Vec<String> = value
            .trace
            .as_ref()
            .map(|t| t.names().map(String::from).collect())
            .unwrap_or_default();
        for (ordinal, sub) in reg.subtargets.iter().enumerate() {
            let entries: Vec<String> = trace_names
                .iter()
                .filter_map(|name| {
                    subtarget_trace(&value, name, ordinal).map(|v| format!("{name}={v}"))
                })
                .collect();
            if entries.is_empty() {
                println!("      {sub}");
            } else {
                println!("      {sub}  [{}]", entries.join(", "));
            }
        }
    }
    Ok(())
}

/// Simple dry-run output: print settings and targets without expanding.
fn print_dry_run(cfg: &ConfigFile) {
    println!("branchdag dry-run");
    println!("  config.max_expand = {:?}", cfg.config.max_expand);
    println!("  config.hash_workers = {}", cfg.config.hash_workers);
    println!("  config.precheck = {}", cfg.config.precheck);
    println!("  config.recover = {}", cfg.config.recover);
    println!();

    println!("targets ({}):", cfg.target.len());
    for (name, target) in cfg.target.iter() {
        println!("  - {name}");
        if !target.after.is_empty() {
            println!("      after: {:?}", target.after);
        }
        if target.value.is_some() || target.table.is_some() || target.array.is_some() {
            println!("      literal: yes");
        }
        match target.dynamic_spec() {
            Ok(Some(spec)) => println!("      dynamic: {spec}"),
            Ok(None) => {}
            Err(e) => println!("      dynamic: invalid ({e})"),
        }
    }

    debug!("dry-run complete (no expansion)");
}

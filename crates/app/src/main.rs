mod config;

use std::collections::BTreeMap;
use std::path::Path;

use learn_core::model::{CourseId, Module};
use learn_core::progression::check_ordinals;
use serde_json::json;
use services::{Clock, ProgressService};
use storage::Snapshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Command, print_usage};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_snapshot(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read snapshot {}: {e}", path.display()))?;
    Ok(Snapshot::from_json(&raw)?)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Strict layout check per course; the engine itself stays permissive.
fn check_courses(modules: &[Module]) -> Vec<(CourseId, String)> {
    let mut by_course: BTreeMap<CourseId, Vec<Module>> = BTreeMap::new();
    for module in modules {
        by_course
            .entry(module.course_id)
            .or_default()
            .push(module.clone());
    }

    by_course
        .into_iter()
        .filter_map(|(course_id, modules)| {
            check_ordinals(&modules)
                .err()
                .map(|err| (course_id, err.to_string()))
        })
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
        .inspect_err(|_| print_usage())?;

    if config.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let snapshot = load_snapshot(&config.snapshot)?;
    let learner = snapshot.learner_id;

    if config.command == Command::Check {
        let problems = check_courses(&snapshot.modules);
        for (course_id, problem) in &problems {
            warn!(course = %course_id, "{problem}");
        }
        let report: Vec<_> = problems
            .iter()
            .map(|(course_id, problem)| json!({ "course_id": course_id, "problem": problem }))
            .collect();
        return print_json(&json!({ "valid": report.is_empty(), "problems": report }));
    }

    let storage = snapshot.into_storage().await?;
    let service = ProgressService::from_storage(Clock::default(), &storage);

    match config.command {
        Command::Course { course_id } => {
            let overview = service.course_overview(learner, course_id).await?;
            print_json(&overview)
        }
        Command::Dashboard => {
            let dashboard = service.dashboard(learner).await?;
            print_json(&dashboard)
        }
        Command::Complete {
            module_id,
            minutes,
            out,
        } => {
            let overview = service.complete_module(learner, module_id, minutes).await?;
            if let Some(out) = out {
                let updated = Snapshot::capture(&storage, learner).await?;
                std::fs::write(&out, updated.to_json()?)?;
                info!(path = %out.display(), "wrote updated snapshot");
            }
            print_json(&overview)
        }
        Command::Check | Command::Help => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

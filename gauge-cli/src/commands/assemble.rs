//! `gauge assemble`: run a blueprint against a catalog file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};
use gauge_assembly::{
    AssemblyOutcome, AssemblySettings, Blueprint, BlueprintAssembler, Severity,
    StaticBenchmarkLookup, StaticTeamProfileLookup,
};
use gauge_core::{EngineConfig, InMemoryCatalog, Inventory, RequestContext};
use tracing::debug;

use super::table;
use crate::input::read_blueprint;

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Catalog JSON (competencies, indicators, questions)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Blueprint TOML
    #[arg(long)]
    pub blueprint: PathBuf,

    /// Occupational benchmarks JSON (JOB_FIT)
    #[arg(long)]
    pub benchmarks: Option<PathBuf>,

    /// Team profiles JSON (TEAM_FIT)
    #[arg(long)]
    pub teams: Option<PathBuf>,

    /// Override the blueprint's selection seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: AssembleArgs, config: &EngineConfig) -> Result<()> {
    let catalog = Arc::new(InMemoryCatalog::load_json(&args.catalog)?);
    let mut blueprint = read_blueprint(&args.blueprint)?;
    if let Some(seed) = args.seed {
        settings_mut(&mut blueprint).seed = Some(seed);
    }
    debug!(strategy = %blueprint.strategy(), "Blueprint loaded");

    let mut assembler = BlueprintAssembler::new(catalog.clone(), config.assembly.clone());
    if let Some(path) = &args.benchmarks {
        assembler = assembler.with_benchmarks(Arc::new(StaticBenchmarkLookup::load_json(path)?));
    }
    if let Some(path) = &args.teams {
        assembler = assembler.with_team_profiles(Arc::new(StaticTeamProfileLookup::load_json(path)?));
    }

    let validated = assembler.validate(blueprint)?;
    let outcome = assembler
        .assemble(&validated, None, &RequestContext::new())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, catalog.as_ref());
    }
    Ok(())
}

fn settings_mut(blueprint: &mut Blueprint) -> &mut AssemblySettings {
    match blueprint {
        Blueprint::Overview(b) => &mut b.settings,
        Blueprint::JobFit(b) => &mut b.settings,
        Blueprint::TeamFit(b) => &mut b.settings,
    }
}

fn print_outcome(outcome: &AssemblyOutcome, inventory: &dyn Inventory) {
    println!(
        "{} assessment: {} questions",
        outcome.strategy,
        outcome.questions.len()
    );

    let mut questions = table(&["#", "Competency", "Indicator", "Difficulty", "Question"]);
    for (idx, question) in outcome.questions.iter().enumerate() {
        let indicator = inventory.indicator(&question.indicator_id);
        let competency = indicator
            .as_ref()
            .and_then(|i| inventory.competency(&i.competency_id))
            .map_or_else(|| "-".to_string(), |c| c.name);
        questions.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(competency),
            Cell::new(indicator.map_or_else(|| "-".to_string(), |i| i.title)),
            Cell::new(question.difficulty),
            Cell::new(&question.text),
        ]);
    }
    println!("{questions}");

    if !outcome.warnings.is_empty() {
        let mut warnings = table(&["Severity", "Code", "Message"]);
        for warning in &outcome.warnings {
            let color = match warning.severity {
                Severity::Info => Color::Reset,
                Severity::Warning => Color::Yellow,
                Severity::Error => Color::Red,
            };
            warnings.add_row(vec![
                Cell::new(warning.severity).fg(color),
                Cell::new(warning.code),
                Cell::new(&warning.message),
            ]);
        }
        println!();
        println!("{warnings}");
    }

    if !outcome.health.is_empty() {
        let mut health = table(&["Competency", "Difficulty", "Active", "Health"]);
        for entry in &outcome.health {
            let name = inventory
                .competency(&entry.competency_id)
                .map_or_else(|| entry.competency_id.to_string(), |c| c.name);
            health.add_row(vec![
                Cell::new(name),
                Cell::new(entry.difficulty),
                Cell::new(entry.active_questions),
                Cell::new(entry.health),
            ]);
        }
        println!();
        println!("{health}");
    }
}

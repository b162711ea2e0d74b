//! `gauge item-stats`: classical item statistics from a response dump.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use comfy_table::{Cell, Color};
use gauge_core::{EngineConfig, InMemoryCatalog, Inventory, ValidityStatus};
use gauge_psychometrics::{ItemStatistics, ItemStatisticsAnalyzer};

use super::{format_opt, table};
use crate::input::read_responses;

#[derive(Args, Debug)]
pub struct ItemStatsArgs {
    /// Responses JSON keyed by question id
    #[arg(long)]
    pub responses: PathBuf,

    /// Catalog JSON providing each item's current validity status
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ItemStatsArgs, config: &EngineConfig) -> Result<()> {
    let responses = read_responses(&args.responses)?;
    let catalog = args
        .catalog
        .as_deref()
        .map(InMemoryCatalog::load_json)
        .transpose()?;

    let analyzer = ItemStatisticsAnalyzer::new(
        config.psychometrics.clone(),
        config.scoring.correct_threshold,
    );
    let now = Utc::now();
    let stats: Vec<ItemStatistics> = responses
        .iter()
        .map(|(question_id, item)| {
            let current = catalog
                .as_ref()
                .and_then(|c| c.question(question_id))
                .map_or(ValidityStatus::Active, |q| q.validity);
            analyzer.analyze(*question_id, item, current, None, now)
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    if stats.is_empty() {
        println!("No responses recorded.");
        return Ok(());
    }

    let mut rows = table(&[
        "Question",
        "N",
        "p",
        "Difficulty",
        "r_pb",
        "Discrimination",
        "Status",
    ]);
    for item in &stats {
        let flagged = item.newly_flagged(
            catalog
                .as_ref()
                .and_then(|c| c.question(&item.question_id))
                .map_or(ValidityStatus::Active, |q| q.validity),
        );
        let status = if item.provisional {
            Cell::new("provisional").fg(Color::DarkGrey)
        } else if flagged {
            Cell::new(item.validity).fg(Color::Red)
        } else {
            Cell::new(item.validity)
        };
        rows.add_row(vec![
            Cell::new(item.question_id),
            Cell::new(item.response_count),
            Cell::new(format_opt(item.difficulty, 2)),
            Cell::new(item.difficulty_flag.map_or_else(|| "-".to_string(), |f| f.to_string())),
            Cell::new(format_opt(item.discrimination, 3)),
            Cell::new(
                item.discrimination_flag
                    .map_or_else(|| "-".to_string(), |f| f.to_string()),
            ),
            status,
        ]);
    }
    println!("{rows}");

    let flagged = stats
        .iter()
        .filter(|s| s.validity == ValidityStatus::FlaggedForReview)
        .count();
    if flagged > 0 {
        println!();
        println!("{flagged} item(s) need review.");
    }
    Ok(())
}

//! `gauge dif`: Mantel-Haenszel DIF between two respondent groups.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};
use gauge_core::EngineConfig;
use gauge_psychometrics::{DifAnalyzer, DifClassification, DifRequest, ScoreMatrix};
use tracing::info;

use super::{format_opt, table};
use crate::input::{parse_question_ids, read_session_ids};

#[derive(Args, Debug)]
pub struct DifArgs {
    /// Score matrix JSON
    #[arg(long)]
    pub matrix: PathBuf,

    /// Focal group session ids, one per line
    #[arg(long)]
    pub focal: PathBuf,

    /// Reference group session ids, one per line
    #[arg(long)]
    pub reference: PathBuf,

    /// Items to analyze (defaults to every item in the matrix)
    #[arg(long, value_delimiter = ',')]
    pub items: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: DifArgs, config: &EngineConfig) -> Result<()> {
    let matrix = ScoreMatrix::load_json(&args.matrix)?;
    let items = if args.items.is_empty() {
        matrix.items().into_iter().collect()
    } else {
        parse_question_ids(&args.items)?
    };
    let request = DifRequest {
        focal: read_session_ids(&args.focal)?,
        reference: read_session_ids(&args.reference)?,
        items,
    };
    info!(
        respondents = matrix.len(),
        focal = request.focal.len(),
        reference = request.reference.len(),
        items = request.items.len(),
        "Running DIF analysis"
    );

    let analyzer = DifAnalyzer::new(config.dif.clone(), config.scoring.correct_threshold);
    let report = analyzer.analyze(&matrix, &request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Focal: {}  Reference: {}  Strata: {}",
        report.focal_count, report.reference_count, report.strata
    );
    let mut rows = table(&[
        "Question",
        "Odds ratio",
        "ETS delta",
        "Chi-square",
        "p",
        "Class",
        "Favors",
    ]);
    for item in &report.items {
        let class = match item.classification {
            Some(c @ DifClassification::CLarge) => Cell::new(c).fg(Color::Red),
            Some(c @ DifClassification::BModerate) => Cell::new(c).fg(Color::Yellow),
            Some(c) => Cell::new(c),
            None => Cell::new("-"),
        };
        rows.add_row(vec![
            Cell::new(item.question_id),
            Cell::new(format_opt(item.odds_ratio, 3)),
            Cell::new(format_opt(item.ets_delta, 2)),
            Cell::new(format_opt(item.chi_square, 2)),
            Cell::new(format_opt(item.p_value, 4)),
            class,
            Cell::new(item.direction.map_or("-", |d| d.as_str())),
        ]);
    }
    println!("{rows}");

    let large = report.large().count();
    if large > 0 {
        println!();
        println!("{large} item(s) show large DIF.");
    }
    Ok(())
}

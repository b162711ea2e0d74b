//! gauge-psychometrics: Item quality statistics
//!
//! - [`ItemStatisticsAnalyzer`] - difficulty (p-value) and discrimination
//!   (point-biserial) per item, with flags and automatic review flagging
//! - [`ReviewWorkflow`] - manual retire/reinstate of flagged items
//! - [`DifAnalyzer`] - Mantel-Haenszel Differential Item Functioning between a
//!   focal and a reference group

pub mod dif;
pub mod error;
pub mod item_stats;
pub mod review;

pub use dif::{
    DifAnalyzer, DifClassification, DifDirection, DifItemResult, DifReport, DifRequest,
    RespondentScores, ScoreMatrix, chi_square_p_value, erfc,
};
pub use error::{PsychometricsError, Result};
pub use item_stats::{
    DifficultyFlag, DiscriminationFlag, ItemResponse, ItemStatistics, ItemStatisticsAnalyzer,
    classify_difficulty, classify_discrimination, pearson,
};
pub use review::{ReviewDecision, ReviewRecord, ReviewWorkflow};

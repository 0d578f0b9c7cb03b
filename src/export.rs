//! Tabular export view
//!
//! A read-only projection of a session for external report writers
//! (spreadsheet or PDF generators): one row per entered test and one summary
//! row per dimension. No document format is produced here.

use crate::analysis::{self, compare, DimensionComparison};
use crate::catalog::BatteryCatalog;
use crate::error::BatteryError;
use crate::session::Session;
use crate::types::{Dimension, ReferenceProfile, Subject, TestId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entered test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub test_id: TestId,
    /// Prompt from the catalog, when one is attached and knows the id
    pub prompt: Option<String>,
    pub dimension: Option<Dimension>,
    pub score: i64,
    pub note: Option<String>,
}

/// Aggregate for one dimension
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub dimension: Dimension,
    pub sum: i64,
    pub count: u32,
    /// `None` when count is zero
    pub average: Option<f64>,
}

/// Full export projection of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportView {
    pub subject: Subject,
    pub battery_name: String,
    pub session_notes: String,
    pub saved_at: Option<DateTime<Utc>>,
    pub results: Vec<ResultRow>,
    /// Whether a catalog was supplied to [`ExportView::build`]
    ///
    /// Without one, ids cannot be mapped to dimensions, so `summary` and both
    /// comparisons are empty and result rows carry no prompt or dimension.
    /// With one, `summary` always has five rows, even when nothing is scored.
    pub battery_attached: bool,
    /// One row per dimension when `battery_attached`, otherwise empty
    pub summary: Vec<SummaryRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ideal_comparison: Vec<DimensionComparison>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_comparison: Vec<DimensionComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<String>,
}

impl ExportView {
    /// Project `session`, enriching rows from `catalog` when available
    pub fn build(session: &Session, catalog: Option<&BatteryCatalog>) -> Result<Self, BatteryError> {
        let results = session
            .records()
            .iter()
            .map(|record| {
                let test = catalog.and_then(|c| c.get(record.test_id));
                ResultRow {
                    test_id: record.test_id,
                    prompt: test.map(|t| t.prompt.clone()),
                    dimension: test.map(|t| t.dimension),
                    score: record.score.value(),
                    note: record.note.clone(),
                }
            })
            .collect();

        let mut summary = Vec::new();
        let mut ideal_comparison = Vec::new();
        let mut owner_comparison = Vec::new();

        if catalog.is_some() {
            let profile = analysis::compute(session, catalog)?;
            summary = profile
                .iter()
                .map(|(dimension, totals)| SummaryRow {
                    dimension,
                    sum: totals.sum,
                    count: totals.count,
                    average: totals.average(),
                })
                .collect();

            let comparison = |reference: Option<&ReferenceProfile>| {
                reference
                    .map(|r| compare(&profile, r))
                    .unwrap_or_default()
            };
            ideal_comparison = comparison(session.ideal_profile());
            owner_comparison = comparison(session.owner_profile());
        }

        Ok(Self {
            subject: session.subject().clone(),
            battery_name: session.battery_name().to_string(),
            session_notes: session.session_notes().to_string(),
            saved_at: session.saved_at(),
            results,
            battery_attached: catalog.is_some(),
            summary,
            ideal_comparison,
            owner_comparison,
            assessment: session.assessment().map(str::to_string),
        })
    }

    pub fn to_json(&self) -> Result<String, BatteryError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BatteryError::Schema(format!("Failed to serialize export view: {}", e)))
    }
}

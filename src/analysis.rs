//! OCEAN profile aggregation
//!
//! Sums session scores per dimension using the catalog's test-to-dimension
//! mapping. The sum is the primary value; averages are derived on demand
//! because dimensions may carry different numbers of tests.

use crate::catalog::BatteryCatalog;
use crate::error::BatteryError;
use crate::session::Session;
use crate::types::{Dimension, ReferenceProfile};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sum and count of the records mapped to one dimension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionTotals {
    pub sum: i64,
    pub count: u32,
}

impl DimensionTotals {
    /// `sum / count`, or `None` when nothing was recorded
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum as f64 / self.count as f64)
        }
    }
}

/// Aggregated per-dimension totals for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profile {
    totals: [DimensionTotals; 5],
}

impl Profile {
    pub fn totals(&self, dimension: Dimension) -> DimensionTotals {
        self.totals[dimension.index()]
    }

    pub fn sum(&self, dimension: Dimension) -> i64 {
        self.totals(dimension).sum
    }

    pub fn count(&self, dimension: Dimension) -> u32 {
        self.totals(dimension).count
    }

    /// Iterate dimensions in O, C, E, A, N order
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, DimensionTotals)> + '_ {
        Dimension::ALL.into_iter().map(move |dim| (dim, self.totals(dim)))
    }

    /// Sums as a reference profile, e.g. to store a measured profile as a target
    pub fn to_reference(&self) -> ReferenceProfile {
        let mut reference = ReferenceProfile::default();
        for (dim, totals) in self.iter() {
            reference.set(dim, totals.sum);
        }
        reference
    }

    fn add(&mut self, dimension: Dimension, score: i64) {
        let totals = &mut self.totals[dimension.index()];
        totals.sum += score;
        totals.count += 1;
    }
}

/// Aggregate a session against a catalog.
///
/// Every record counts, zeros included. Records whose id the catalog does
/// not know are skipped.
pub fn compute(session: &Session, catalog: Option<&BatteryCatalog>) -> Result<Profile, BatteryError> {
    let catalog = catalog.ok_or(BatteryError::MissingBattery)?;

    let mut profile = Profile::default();
    for record in session.records() {
        match catalog.get(record.test_id) {
            Some(test) => profile.add(test.dimension, record.score.value()),
            None => debug!(
                test_id = record.test_id,
                battery = catalog.name(),
                "record not in battery, skipped"
            ),
        }
    }
    Ok(profile)
}

/// Average for one dimension of a profile; `None` when its count is zero
pub fn average(profile: &Profile, dimension: Dimension) -> Option<f64> {
    profile.totals(dimension).average()
}

/// Measured sum against a reference value for one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionComparison {
    pub dimension: Dimension,
    pub measured: i64,
    pub reference: i64,
    /// `measured - reference`
    pub delta: i64,
}

/// Compare a measured profile against an ideal or owner-reported reference
pub fn compare(measured: &Profile, reference: &ReferenceProfile) -> Vec<DimensionComparison> {
    measured
        .iter()
        .map(|(dimension, totals)| {
            let target = reference.get(dimension);
            DimensionComparison {
                dimension,
                measured: totals.sum,
                reference: target,
                delta: totals.sum - target,
            }
        })
        .collect()
}

//! OCEAN Battery - behavioral test scoring and personality dimension profiling
//!
//! Records structured behavioral test results for a dog, maps each test to one
//! of the five OCEAN dimensions and aggregates the recorded scores into
//! per-dimension profiles:
//! import rows → catalog; score entry → session; (session, catalog) → profile;
//! session ⇄ versioned JSON document.
//!
//! ## Modules
//!
//! - **Catalog**: immutable battery of test definitions, built all-or-nothing from raw rows
//! - **Session**: per-subject score entry with validation and lifecycle state
//! - **Analysis**: per-dimension sums, counts and averages
//! - **Codec**: `ocean.session.v1` persistence with lossless round trips
//! - **Export**: read-only tabular projection for report writers

pub mod analysis;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod session;
pub mod types;

pub use analysis::{average, compare, compute, DimensionComparison, DimensionTotals, Profile};
pub use catalog::{BatteryCatalog, RawTestRow};
pub use codec::{decode, decode_json, encode, encode_to_json, SessionDocument, SCHEMA_VERSION};
pub use crate::config::Settings;
pub use error::{BatteryError, ErrorKind, ValidationError};
pub use export::ExportView;
pub use session::{enter_score, set_score_checked, EntryPolicy, Session, SessionState};
pub use types::{Dimension, Gender, ReferenceProfile, Score, ScoreRecord, Subject, Test, TestId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Core data types for battery scoring
//!
//! These are the strict, typed values that flow through catalog construction,
//! score entry, aggregation and persistence. Loosely typed import rows are
//! converted into these at the catalog boundary and never travel further.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a test within a battery (always >= 1)
pub type TestId = u32;

/// The five OCEAN personality dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Dimension {
    /// All dimensions in canonical O, C, E, A, N order
    pub const ALL: [Dimension; 5] = [
        Dimension::Openness,
        Dimension::Conscientiousness,
        Dimension::Extraversion,
        Dimension::Agreeableness,
        Dimension::Neuroticism,
    ];

    /// Position in [`Dimension::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Dimension::Openness => 0,
            Dimension::Conscientiousness => 1,
            Dimension::Extraversion => 2,
            Dimension::Agreeableness => 3,
            Dimension::Neuroticism => 4,
        }
    }

    /// One-letter code
    pub fn code(&self) -> char {
        match self {
            Dimension::Openness => 'O',
            Dimension::Conscientiousness => 'C',
            Dimension::Extraversion => 'E',
            Dimension::Agreeableness => 'A',
            Dimension::Neuroticism => 'N',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Openness => "openness",
            Dimension::Conscientiousness => "conscientiousness",
            Dimension::Extraversion => "extraversion",
            Dimension::Agreeableness => "agreeableness",
            Dimension::Neuroticism => "neuroticism",
        }
    }

    /// Label used by the German battery sheets
    pub fn german_label(&self) -> &'static str {
        match self {
            Dimension::Openness => "Offenheit",
            Dimension::Conscientiousness => "Gewissenhaftigkeit",
            Dimension::Extraversion => "Extraversion",
            Dimension::Agreeableness => "Verträglichkeit",
            Dimension::Neuroticism => "Neurotizismus",
        }
    }

    /// Resolve a dimension label from an import row.
    ///
    /// Accepts the English name, the one-letter code or the German sheet
    /// label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Dimension> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_lowercase();
        Dimension::ALL.into_iter().find(|dim| {
            lower == dim.as_str()
                || lower == dim.german_label().to_lowercase()
                || (lower.chars().count() == 1
                    && lower.starts_with(dim.code().to_ascii_lowercase()))
        })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavioral score on the -2..=+2 scale.
///
/// Zero is a recorded neutral observation, never a stand-in for "not scored".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(i8);

impl Score {
    pub const MIN: i64 = -2;
    pub const MAX: i64 = 2;

    /// Create a score, rejecting anything outside -2..=+2
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Score(value as i8))
        } else {
            Err(ValidationError::out_of_range(
                "score",
                Self::MIN,
                Self::MAX,
                value,
            ))
        }
    }

    pub fn value(&self) -> i64 {
        self.0 as i64
    }

    pub fn is_neutral(&self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for Score {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for i64 {
    fn from(score: Score) -> Self {
        score.value()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 > 0 { "+" } else { "" };
        write!(f, "{}{}", sign, self.0)
    }
}

/// A single test definition from a battery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub id: TestId,
    /// Test name / instruction shown to the examiner
    pub prompt: String,
    pub dimension: Dimension,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub materials: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub role_figurant: String,
    #[serde(default)]
    pub observation_criteria: String,
    #[serde(default)]
    pub rating_scale: String,
}

/// One entered score for one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub test_id: TestId,
    pub score: Score,
    #[serde(default)]
    pub note: Option<String>,
}

/// Sex of the dog under assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Owner and dog metadata attached to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub owner_name: String,
    pub dog_name: String,
    pub age_years: u32,
    #[serde(default)]
    pub age_months: u32,
    pub gender: Gender,
    pub neutered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended_use: Option<String>,
}

impl Subject {
    /// Create validated subject metadata
    pub fn new(
        owner_name: impl Into<String>,
        dog_name: impl Into<String>,
        age_years: u32,
        age_months: u32,
        gender: Gender,
        neutered: bool,
    ) -> Result<Self, ValidationError> {
        let subject = Self {
            owner_name: owner_name.into(),
            dog_name: dog_name.into(),
            age_years,
            age_months,
            gender,
            neutered,
            breed: None,
            intended_use: None,
        };
        subject.validate()?;
        Ok(subject)
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = Some(breed.into());
        self
    }

    pub fn with_intended_use(mut self, intended_use: impl Into<String>) -> Self {
        self.intended_use = Some(intended_use.into());
        self
    }

    /// Check names are present and months stay below a year
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.owner_name.trim().is_empty() {
            return Err(ValidationError::empty_field("owner_name"));
        }
        if self.dog_name.trim().is_empty() {
            return Err(ValidationError::empty_field("dog_name"));
        }
        if self.age_months > 11 {
            return Err(ValidationError::out_of_range(
                "age_months",
                0,
                11,
                self.age_months as i64,
            ));
        }
        Ok(())
    }

    /// Human readable age, e.g. "4 years, 6 months"
    pub fn age_display(&self) -> String {
        let years = match self.age_years {
            1 => "1 year".to_string(),
            n => format!("{} years", n),
        };
        match self.age_months {
            0 => years,
            1 => format!("{}, 1 month", years),
            n => format!("{}, {} months", years, n),
        }
    }

    /// Dog name reduced to a single safe path component
    ///
    /// Anything other than letters, digits, `-` and `_` becomes `_`, runs of
    /// `_` collapse and edge underscores are trimmed. Falls back to `session`.
    pub fn file_stem(&self) -> String {
        let mut stem = String::with_capacity(self.dog_name.len());
        for c in self.dog_name.trim().chars() {
            let c = if c.is_alphanumeric() || c == '-' { c } else { '_' };
            if c == '_' && stem.ends_with('_') {
                continue;
            }
            stem.push(c);
        }
        let stem = stem.trim_matches('_');
        if stem.is_empty() {
            "session".to_string()
        } else {
            stem.to_string()
        }
    }
}

/// Per-dimension integer targets (ideal or owner-reported profile)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceProfile {
    #[serde(rename = "O")]
    pub openness: i64,
    #[serde(rename = "C")]
    pub conscientiousness: i64,
    #[serde(rename = "E")]
    pub extraversion: i64,
    #[serde(rename = "A")]
    pub agreeableness: i64,
    #[serde(rename = "N")]
    pub neuroticism: i64,
}

impl ReferenceProfile {
    pub fn get(&self, dimension: Dimension) -> i64 {
        match dimension {
            Dimension::Openness => self.openness,
            Dimension::Conscientiousness => self.conscientiousness,
            Dimension::Extraversion => self.extraversion,
            Dimension::Agreeableness => self.agreeableness,
            Dimension::Neuroticism => self.neuroticism,
        }
    }

    pub fn set(&mut self, dimension: Dimension, value: i64) {
        match dimension {
            Dimension::Openness => self.openness = value,
            Dimension::Conscientiousness => self.conscientiousness = value,
            Dimension::Extraversion => self.extraversion = value,
            Dimension::Agreeableness => self.agreeableness = value,
            Dimension::Neuroticism => self.neuroticism = value,
        }
    }
}

//! Per-subject scoring session
//!
//! A session holds the scores entered for one dog against one battery. It has
//! no dependency on a catalog: ids are recorded as given, and aggregation
//! decides later how each id maps to a dimension. Every mutating call either
//! succeeds completely or leaves the session untouched.

use crate::catalog::BatteryCatalog;
use crate::error::{BatteryError, ValidationError};
use crate::types::{ReferenceProfile, Score, ScoreRecord, Subject, TestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Freshly created, nothing entered yet
    Empty,
    /// Has changes that are not persisted
    InProgress,
    /// Matches the last encoded document
    Saved,
}

/// Whether score entry should check ids against a catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPolicy {
    /// Record any positive id; unknown ids are skipped at aggregation time
    #[default]
    Lenient,
    /// Reject ids the catalog does not know
    Strict,
}

/// One subject's entered scores against a battery
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    subject: Subject,
    battery_name: String,
    /// Kept in entry order; at most one record per test id
    records: Vec<ScoreRecord>,
    session_notes: String,
    ideal_profile: Option<ReferenceProfile>,
    owner_profile: Option<ReferenceProfile>,
    assessment: Option<String>,
    saved_at: Option<DateTime<Utc>>,
    state: SessionState,
}

/// Everything a decoded document carries, used to rebuild a session
pub(crate) struct SessionParts {
    pub id: Uuid,
    pub subject: Subject,
    pub battery_name: String,
    pub records: Vec<ScoreRecord>,
    pub session_notes: String,
    pub ideal_profile: Option<ReferenceProfile>,
    pub owner_profile: Option<ReferenceProfile>,
    pub assessment: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session for `subject` against the named battery
    pub fn create(subject: Subject, battery_name: impl Into<String>) -> Result<Self, BatteryError> {
        subject.validate()?;
        let battery_name = battery_name.into();
        if battery_name.trim().is_empty() {
            return Err(ValidationError::empty_field("battery_name").into());
        }

        Ok(Self {
            id: Uuid::new_v4(),
            subject,
            battery_name,
            records: Vec::new(),
            session_notes: String::new(),
            ideal_profile: None,
            owner_profile: None,
            assessment: None,
            saved_at: None,
            state: SessionState::Empty,
        })
    }

    pub(crate) fn from_parts(parts: SessionParts) -> Self {
        Self {
            id: parts.id,
            subject: parts.subject,
            battery_name: parts.battery_name,
            records: parts.records,
            session_notes: parts.session_notes,
            ideal_profile: parts.ideal_profile,
            owner_profile: parts.owner_profile,
            assessment: parts.assessment,
            saved_at: Some(parts.saved_at),
            state: SessionState::Saved,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn battery_name(&self) -> &str {
        &self.battery_name
    }

    pub fn session_notes(&self) -> &str {
        &self.session_notes
    }

    pub fn ideal_profile(&self) -> Option<&ReferenceProfile> {
        self.ideal_profile.as_ref()
    }

    pub fn owner_profile(&self) -> Option<&ReferenceProfile> {
        self.owner_profile.as_ref()
    }

    pub fn assessment(&self) -> Option<&str> {
        self.assessment.as_deref()
    }

    /// Timestamp of the last successful encode, if any
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True when there are changes not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.state == SessionState::InProgress
    }

    fn touch(&mut self) {
        self.state = SessionState::InProgress;
    }

    pub(crate) fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.saved_at = Some(at);
        self.state = SessionState::Saved;
    }

    /// Insert or fully replace the record for `test_id`.
    ///
    /// A `None` note replaces any note the previous record carried.
    pub fn set_score(
        &mut self,
        test_id: TestId,
        score: i64,
        note: Option<String>,
    ) -> Result<(), BatteryError> {
        if test_id == 0 {
            return Err(ValidationError::out_of_range("test_id", 1, TestId::MAX as i64, 0).into());
        }
        let score = Score::new(score)?;
        let record = ScoreRecord {
            test_id,
            score,
            note,
        };

        match self.records.iter_mut().find(|r| r.test_id == test_id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        debug!(test_id, score = score.value(), "score recorded");
        self.touch();
        Ok(())
    }

    /// Delete the record for `test_id`
    pub fn remove_score(&mut self, test_id: TestId) -> Result<ScoreRecord, BatteryError> {
        let pos = self
            .records
            .iter()
            .position(|r| r.test_id == test_id)
            .ok_or_else(|| BatteryError::NotFound(format!("no score recorded for test {}", test_id)))?;
        let removed = self.records.remove(pos);
        self.touch();
        Ok(removed)
    }

    pub fn record(&self, test_id: TestId) -> Option<&ScoreRecord> {
        self.records.iter().find(|r| r.test_id == test_id)
    }

    pub fn score_of(&self, test_id: TestId) -> Option<Score> {
        self.record(test_id).map(|r| r.score)
    }

    pub fn has_record(&self, test_id: TestId) -> bool {
        self.record(test_id).is_some()
    }

    /// Records in entry order
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of tests scored away from neutral. Progress only; aggregation
    /// counts every record including zeros.
    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.score.is_neutral()).count()
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.session_notes = notes.into();
        self.touch();
    }

    pub fn set_ideal_profile(&mut self, profile: Option<ReferenceProfile>) {
        self.ideal_profile = profile;
        self.touch();
    }

    pub fn set_owner_profile(&mut self, profile: Option<ReferenceProfile>) {
        self.owner_profile = profile;
        self.touch();
    }

    pub fn set_assessment(&mut self, assessment: Option<String>) {
        self.assessment = assessment;
        self.touch();
    }

    /// Discard all entered content, keeping subject and battery
    pub fn reset(&mut self) {
        self.records.clear();
        self.session_notes.clear();
        self.ideal_profile = None;
        self.owner_profile = None;
        self.assessment = None;
        self.saved_at = None;
        self.state = SessionState::Empty;
    }

    fn sorted_records(&self) -> Vec<&ScoreRecord> {
        let mut sorted: Vec<&ScoreRecord> = self.records.iter().collect();
        sorted.sort_by_key(|r| r.test_id);
        sorted
    }
}

/// Value equality over content. Save timestamp and lifecycle state are
/// excluded; records compare as a set keyed by test id.
impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.subject == other.subject
            && self.battery_name == other.battery_name
            && self.session_notes == other.session_notes
            && self.ideal_profile == other.ideal_profile
            && self.owner_profile == other.owner_profile
            && self.assessment == other.assessment
            && self.sorted_records() == other.sorted_records()
    }
}

/// Record a score, optionally checking the id against a catalog first
pub fn set_score_checked(
    session: &mut Session,
    catalog: &BatteryCatalog,
    policy: EntryPolicy,
    test_id: TestId,
    score: i64,
    note: Option<String>,
) -> Result<(), BatteryError> {
    if policy == EntryPolicy::Strict {
        catalog.lookup(test_id)?;
    }
    session.set_score(test_id, score, note)
}

/// Record a score, loading a catalog only when `policy` needs one
///
/// Under `Lenient` the loader is never called, so an unreadable or missing
/// battery cannot block entry. Under `Strict` a loader returning `None` is a
/// `MissingBattery` error.
pub fn enter_score<F>(
    session: &mut Session,
    policy: EntryPolicy,
    load_catalog: F,
    test_id: TestId,
    score: i64,
    note: Option<String>,
) -> Result<(), BatteryError>
where
    F: FnOnce() -> Result<Option<BatteryCatalog>, BatteryError>,
{
    match policy {
        EntryPolicy::Lenient => session.set_score(test_id, score, note),
        EntryPolicy::Strict => {
            let catalog = load_catalog()?.ok_or(BatteryError::MissingBattery)?;
            set_score_checked(session, &catalog, policy, test_id, score, note)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RawTestRow;
    use crate::types::{Dimension, Gender};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn subject() -> Subject {
        Subject::new("Anna", "Max", 4, 6, Gender::Male, true).unwrap()
    }

    fn new_session() -> Session {
        Session::create(subject(), "Standard").unwrap()
    }

    #[test]
    fn test_create_is_empty() {
        let session = new_session();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.is_empty());
        assert_eq!(session.session_notes(), "");
        assert!(session.saved_at().is_none());
    }

    #[test]
    fn test_create_rejects_blank_battery_name() {
        let err = Session::create(subject(), "   ").unwrap_err();
        assert!(matches!(err, BatteryError::Validation(_)));
    }

    #[test]
    fn test_zero_score_is_a_record() {
        let mut session = new_session();
        session.set_score(7, 0, None).unwrap();

        assert!(session.has_record(7));
        assert_eq!(session.score_of(7).map(|s| s.value()), Some(0));
        assert!(!session.has_record(8));
    }

    #[test]
    fn test_upsert_replaces_note() {
        let mut session = new_session();
        session
            .set_score(1, 2, Some("calm approach".to_string()))
            .unwrap();
        session.set_score(1, -1, None).unwrap();

        assert_eq!(session.len(), 1);
        let record = session.record(1).unwrap();
        assert_eq!(record.score.value(), -1);
        assert_eq!(record.note, None);
    }

    #[test]
    fn test_upsert_keeps_entry_position() {
        let mut session = new_session();
        session.set_score(3, 1, None).unwrap();
        session.set_score(1, 1, None).unwrap();
        session.set_score(3, 2, None).unwrap();

        let ids: Vec<TestId> = session.records().iter().map(|r| r.test_id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_invalid_inputs_leave_session_unchanged() {
        let mut session = new_session();
        session.set_score(1, 1, None).unwrap();
        let before = session.clone();

        assert!(matches!(
            session.set_score(2, 3, None),
            Err(BatteryError::Validation(_))
        ));
        assert!(matches!(
            session.set_score(0, 1, None),
            Err(BatteryError::Validation(_))
        ));
        assert_eq!(session, before);
        assert_eq!(session.records(), before.records());
    }

    #[test]
    fn test_remove_score() {
        let mut session = new_session();
        session.set_score(1, 2, None).unwrap();

        let removed = session.remove_score(1).unwrap();
        assert_eq!(removed.test_id, 1);
        assert!(session.is_empty());

        let err = session.remove_score(1).unwrap_err();
        assert!(matches!(err, BatteryError::NotFound(_)));
    }

    #[test]
    fn test_completed_count_excludes_neutral() {
        let mut session = new_session();
        session.set_score(1, 0, None).unwrap();
        session.set_score(2, 2, None).unwrap();
        session.set_score(3, -1, None).unwrap();

        assert_eq!(session.completed_count(), 2);
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_state_transitions() {
        let mut session = new_session();
        assert_eq!(session.state(), SessionState::Empty);

        session.set_score(1, 1, None).unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
        assert!(session.is_dirty());

        session.mark_saved(Utc::now());
        assert_eq!(session.state(), SessionState::Saved);
        assert!(!session.is_dirty());

        session.remove_score(1).unwrap();
        assert_eq!(session.state(), SessionState::InProgress);

        session.mark_saved(Utc::now());
        session.set_notes("windy day");
        assert_eq!(session.state(), SessionState::InProgress);
    }

    #[test]
    fn test_failed_call_does_not_change_state() {
        let mut session = new_session();
        assert!(session.remove_score(4).is_err());
        assert!(session.set_score(4, 9, None).is_err());
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn test_reset() {
        let mut session = new_session();
        session.set_score(1, 1, None).unwrap();
        session.set_notes("notes");
        session.set_assessment(Some("good".to_string()));
        session.reset();

        assert!(session.is_empty());
        assert_eq!(session.session_notes(), "");
        assert_eq!(session.assessment(), None);
        assert_eq!(session.state(), SessionState::Empty);
        assert_eq!(session.battery_name(), "Standard");
    }

    #[test]
    fn test_equality_ignores_record_order() {
        let mut a = new_session();
        a.set_score(1, 1, None).unwrap();
        a.set_score(2, -2, None).unwrap();

        let mut b = a.clone();
        b.reset();
        b.set_score(2, -2, None).unwrap();
        b.set_score(1, 1, None).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_strict_entry_policy() {
        let catalog = BatteryCatalog::build(
            "Standard",
            vec![RawTestRow::new(1, "Novel object", Dimension::Openness.as_str())],
        )
        .unwrap();
        let mut session = new_session();

        set_score_checked(&mut session, &catalog, EntryPolicy::Strict, 1, 2, None).unwrap();
        let err =
            set_score_checked(&mut session, &catalog, EntryPolicy::Strict, 9, 2, None).unwrap_err();
        assert!(matches!(err, BatteryError::NotFound(_)));
        assert!(!session.has_record(9));

        set_score_checked(&mut session, &catalog, EntryPolicy::Lenient, 9, 2, None).unwrap();
        assert!(session.has_record(9));
    }

    #[test]
    fn test_lenient_entry_never_loads_battery() {
        let mut session = new_session();
        let unreadable = || -> Result<Option<BatteryCatalog>, BatteryError> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "battery.json").into())
        };

        enter_score(&mut session, EntryPolicy::Lenient, unreadable, 7, -1, None).unwrap();
        assert_eq!(session.score_of(7).map(|s| s.value()), Some(-1));
    }

    #[test]
    fn test_strict_entry_loads_battery() {
        let mut session = new_session();

        let err = enter_score(&mut session, EntryPolicy::Strict, || Ok(None), 1, 2, None).unwrap_err();
        assert!(matches!(err, BatteryError::MissingBattery));

        let unreadable = || -> Result<Option<BatteryCatalog>, BatteryError> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "battery.json").into())
        };
        let err = enter_score(&mut session, EntryPolicy::Strict, unreadable, 1, 2, None).unwrap_err();
        assert!(err.is_io());
        assert!(session.is_empty());

        let load = || {
            BatteryCatalog::build(
                "Standard",
                vec![RawTestRow::new(1, "Novel object", Dimension::Openness.as_str())],
            )
            .map(Some)
        };
        enter_score(&mut session, EntryPolicy::Strict, load, 1, 2, None).unwrap();
        let err = enter_score(&mut session, EntryPolicy::Strict, load, 9, 2, None).unwrap_err();
        assert!(matches!(err, BatteryError::NotFound(_)));
        assert_eq!(session.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_valid_scores_read_back(id in 1u32..500, score in -2i64..=2) {
            let mut session = new_session();
            session.set_score(id, score, None).unwrap();
            prop_assert_eq!(session.score_of(id).map(|s| s.value()), Some(score));
        }

        #[test]
        fn prop_out_of_range_scores_rejected(
            id in 1u32..500,
            score in prop_oneof![i64::MIN..-2i64, 3i64..i64::MAX],
        ) {
            let mut session = new_session();
            session.set_score(1, 1, None).unwrap();
            let before = session.records().to_vec();

            let result = session.set_score(id, score, None);
            prop_assert!(matches!(result, Err(BatteryError::Validation(_))));
            prop_assert_eq!(session.records(), before.as_slice());
        }
    }
}

//! Test battery catalog
//!
//! Converts loosely typed import rows (as produced by a spreadsheet or JSON
//! export) into an immutable catalog of [`Test`] definitions indexed by id and
//! by OCEAN dimension. Construction is all-or-nothing: one bad row aborts the
//! build and no catalog is produced.

use crate::error::BatteryError;
use crate::types::{Dimension, Test, TestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// One raw import row, cells still untyped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTestRow {
    #[serde(default, alias = "number", alias = "test_id")]
    pub id: Option<Value>,
    #[serde(default, alias = "name")]
    pub prompt: Option<Value>,
    #[serde(default, alias = "ocean_dimension")]
    pub dimension: Option<Value>,
    #[serde(default)]
    pub setting: Option<Value>,
    #[serde(default)]
    pub materials: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub role_figurant: Option<Value>,
    #[serde(default)]
    pub observation_criteria: Option<Value>,
    #[serde(default)]
    pub rating_scale: Option<Value>,
}

impl RawTestRow {
    /// Convenience constructor for the three required cells
    pub fn new(id: impl Into<Value>, prompt: &str, dimension: &str) -> Self {
        Self {
            id: Some(id.into()),
            prompt: Some(Value::String(prompt.to_string())),
            dimension: Some(Value::String(dimension.to_string())),
            ..Self::default()
        }
    }

    fn cells(&self) -> [&Option<Value>; 9] {
        [
            &self.id,
            &self.prompt,
            &self.dimension,
            &self.setting,
            &self.materials,
            &self.duration,
            &self.role_figurant,
            &self.observation_criteria,
            &self.rating_scale,
        ]
    }

    /// True when every cell is empty, as with trailing spreadsheet rows
    pub fn is_blank(&self) -> bool {
        self.cells().iter().all(|cell| cell_text(cell).is_empty())
    }

    /// Convert this row into a strict [`Test`]
    fn to_test(&self, row_num: usize) -> Result<Test, BatteryError> {
        let id = parse_id(self.id.as_ref())
            .map_err(|reason| BatteryError::Import(format!("row {}: {}", row_num, reason)))?;

        let prompt = cell_text(&self.prompt);
        if prompt.is_empty() {
            return Err(BatteryError::Import(format!(
                "row {}: missing prompt for test {}",
                row_num, id
            )));
        }

        let label = cell_text(&self.dimension);
        if label.is_empty() {
            return Err(BatteryError::Import(format!(
                "row {}: missing dimension for test {}",
                row_num, id
            )));
        }
        let dimension = Dimension::from_label(&label).ok_or_else(|| {
            BatteryError::Import(format!(
                "row {}: unknown OCEAN dimension '{}'",
                row_num, label
            ))
        })?;

        Ok(Test {
            id,
            prompt,
            dimension,
            setting: cell_text(&self.setting),
            materials: cell_text(&self.materials),
            duration: cell_text(&self.duration),
            role_figurant: cell_text(&self.role_figurant),
            observation_criteria: cell_text(&self.observation_criteria),
            rating_scale: cell_text(&self.rating_scale),
        })
    }
}

/// Render a cell as trimmed text; null and absent cells are empty
fn cell_text(cell: &Option<Value>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// Parse a test id cell. Spreadsheet cells may hold `3`, `3.0` or `"3"`.
fn parse_id(cell: Option<&Value>) -> Result<TestId, String> {
    let raw = match cell {
        None | Some(Value::Null) => return Err("missing test id".to_string()),
        Some(v) => v,
    };

    let parsed: Option<i64> = match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) if s.trim().is_empty() => return Err("missing test id".to_string()),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 1 && n <= TestId::MAX as i64 => Ok(n as TestId),
        Some(n) => Err(format!("test id must be positive, got {}", n)),
        None => Err(format!("invalid test id {}", raw)),
    }
}

/// Parse a JSON array of rows
pub fn parse_rows_json(json: &str) -> Result<Vec<RawTestRow>, BatteryError> {
    serde_json::from_str(json)
        .map_err(|e| BatteryError::Import(format!("Failed to parse battery rows: {}", e)))
}

/// Parse NDJSON rows (one object per line, blank lines skipped)
pub fn parse_rows_ndjson(ndjson: &str) -> Result<Vec<RawTestRow>, BatteryError> {
    let mut rows = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawTestRow>(trimmed) {
            Ok(row) => rows.push(row),
            Err(e) => {
                return Err(BatteryError::Import(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(rows)
}

/// Read rows from a file; `.ndjson`/`.jsonl` are line delimited, anything else is a JSON array
pub fn load_rows(path: &Path) -> Result<Vec<RawTestRow>, BatteryError> {
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("ndjson") | Some("jsonl") => parse_rows_ndjson(&data),
        _ => parse_rows_json(&data),
    }
}

/// Immutable collection of tests for one battery
#[derive(Debug, Clone)]
pub struct BatteryCatalog {
    name: String,
    tests: Vec<Test>,
    by_id: HashMap<TestId, usize>,
    by_dimension: [Vec<usize>; 5],
}

impl BatteryCatalog {
    /// Build a catalog from raw import rows.
    ///
    /// Blank rows are skipped. Any other malformed row, a duplicate id, or a
    /// batch with no tests at all fails with [`BatteryError::Import`].
    pub fn build<I>(name: impl Into<String>, rows: I) -> Result<Self, BatteryError>
    where
        I: IntoIterator<Item = RawTestRow>,
    {
        let mut tests = Vec::new();
        for (idx, row) in rows.into_iter().enumerate() {
            let row_num = idx + 1;
            if row.is_blank() {
                debug!(row = row_num, "skipping blank battery row");
                continue;
            }
            tests.push(row.to_test(row_num)?);
        }
        Self::from_tests(name, tests)
    }

    /// Build a catalog from already typed tests
    pub fn from_tests(name: impl Into<String>, tests: Vec<Test>) -> Result<Self, BatteryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BatteryError::Import(
                "battery name cannot be empty".to_string(),
            ));
        }
        if tests.is_empty() {
            return Err(BatteryError::Import(format!(
                "battery '{}' contains no tests",
                name
            )));
        }

        let mut by_id = HashMap::with_capacity(tests.len());
        let mut by_dimension: [Vec<usize>; 5] = Default::default();

        for (pos, test) in tests.iter().enumerate() {
            if test.id == 0 {
                return Err(BatteryError::Import(
                    "test id must be positive, got 0".to_string(),
                ));
            }
            if test.prompt.trim().is_empty() {
                return Err(BatteryError::Import(format!(
                    "missing prompt for test {}",
                    test.id
                )));
            }
            if by_id.insert(test.id, pos).is_some() {
                return Err(BatteryError::Import(format!(
                    "duplicate test id {}",
                    test.id
                )));
            }
            by_dimension[test.dimension.index()].push(pos);
        }

        info!(battery = %name, tests = tests.len(), "built battery catalog");

        Ok(Self {
            name,
            tests,
            by_id,
            by_dimension,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a test by id
    pub fn lookup(&self, id: TestId) -> Result<&Test, BatteryError> {
        self.get(id)
            .ok_or_else(|| BatteryError::NotFound(format!("test {} is not in battery '{}'", id, self.name)))
    }

    pub fn get(&self, id: TestId) -> Option<&Test> {
        self.by_id.get(&id).map(|&pos| &self.tests[pos])
    }

    pub fn contains(&self, id: TestId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Tests classified under `dimension`, in import order
    pub fn tests_for(&self, dimension: Dimension) -> Vec<&Test> {
        self.by_dimension[dimension.index()]
            .iter()
            .map(|&pos| &self.tests[pos])
            .collect()
    }

    /// All tests in import order
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_rows() -> Vec<RawTestRow> {
        vec![
            RawTestRow::new(1, "Novel object", "Openness"),
            RawTestRow::new(2, "Wait at door", "C"),
            RawTestRow::new(3, "Greeting stranger", "Extraversion"),
            RawTestRow::new(4, "Unfamiliar surface", "Offenheit"),
            RawTestRow::new(5, "Shared bowl", "Verträglichkeit"),
        ]
    }

    #[test]
    fn test_build_and_lookup() {
        let catalog = BatteryCatalog::build("Standard", sample_rows()).unwrap();

        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.name(), "Standard");
        assert_eq!(catalog.lookup(2).unwrap().dimension, Dimension::Conscientiousness);
        assert_eq!(catalog.lookup(4).unwrap().prompt, "Unfamiliar surface");
    }

    #[test]
    fn test_lookup_unknown_id() {
        let catalog = BatteryCatalog::build("Standard", sample_rows()).unwrap();
        let err = catalog.lookup(99).unwrap_err();
        assert!(matches!(err, BatteryError::NotFound(_)));
    }

    #[test]
    fn test_tests_for_preserves_input_order() {
        let catalog = BatteryCatalog::build("Standard", sample_rows()).unwrap();

        let ids: Vec<TestId> = catalog
            .tests_for(Dimension::Openness)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 4]);
        assert!(catalog.tests_for(Dimension::Neuroticism).is_empty());
    }

    #[test]
    fn test_duplicate_id_fails_whole_build() {
        let mut rows = sample_rows();
        rows.push(RawTestRow::new(3, "Repeat", "Neuroticism"));

        let result = BatteryCatalog::build("Standard", rows);
        match result {
            Err(BatteryError::Import(msg)) => assert!(msg.contains("duplicate test id 3")),
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_dimension_fails() {
        let rows = vec![
            RawTestRow::new(1, "Novel object", "Openness"),
            RawTestRow::new(2, "Mystery", "Charisma"),
        ];
        let err = BatteryCatalog::build("Standard", rows).unwrap_err();
        match err {
            BatteryError::Import(msg) => {
                assert!(msg.contains("row 2"));
                assert!(msg.contains("Charisma"));
            }
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_id_formats() {
        let rows = vec![
            RawTestRow::new(json!(1.0), "Float id", "O"),
            RawTestRow::new(json!(" 2 "), "String id", "C"),
        ];
        let catalog = BatteryCatalog::build("Standard", rows).unwrap();
        assert!(catalog.contains(1));
        assert!(catalog.contains(2));

        for bad in [json!(1.5), json!("abc"), json!(0), json!(-4), json!(true)] {
            let rows = vec![RawTestRow::new(bad.clone(), "Bad", "O")];
            assert!(
                matches!(BatteryCatalog::build("Standard", rows), Err(BatteryError::Import(_))),
                "id {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_missing_fields() {
        let missing_id = RawTestRow {
            prompt: Some(json!("No id")),
            dimension: Some(json!("O")),
            ..RawTestRow::default()
        };
        assert!(BatteryCatalog::build("B", vec![missing_id]).is_err());

        let missing_prompt = RawTestRow {
            id: Some(json!(1)),
            dimension: Some(json!("O")),
            ..RawTestRow::default()
        };
        assert!(BatteryCatalog::build("B", vec![missing_prompt]).is_err());

        let missing_dimension = RawTestRow {
            id: Some(json!(1)),
            prompt: Some(json!("No dimension")),
            ..RawTestRow::default()
        };
        assert!(BatteryCatalog::build("B", vec![missing_dimension]).is_err());
    }

    #[test]
    fn test_blank_rows_skipped_but_empty_batch_fails() {
        let mut rows = sample_rows();
        rows.insert(2, RawTestRow::default());
        rows.push(RawTestRow {
            id: Some(Value::Null),
            prompt: Some(json!("  ")),
            ..RawTestRow::default()
        });
        assert_eq!(BatteryCatalog::build("Standard", rows).unwrap().len(), 5);

        let err = BatteryCatalog::build("Standard", vec![RawTestRow::default()]).unwrap_err();
        assert!(matches!(err, BatteryError::Import(_)));
    }

    #[test]
    fn test_parse_rows_json_with_sheet_columns() {
        let json = r#"[
            {"number": 1, "ocean_dimension": "Offenheit", "name": "Neues Objekt",
             "setting": "Indoor", "materials": "Box", "duration": "2 min",
             "role_figurant": "", "observation_criteria": "Approach", "rating_scale": "-2..+2",
             "extra_column": "ignored"},
            {"id": 2, "prompt": "Wait", "dimension": "conscientiousness"}
        ]"#;

        let rows = parse_rows_json(json).unwrap();
        let catalog = BatteryCatalog::build("Sheet1", rows).unwrap();
        let first = catalog.lookup(1).unwrap();
        assert_eq!(first.prompt, "Neues Objekt");
        assert_eq!(first.setting, "Indoor");
        assert_eq!(first.rating_scale, "-2..+2");
        assert_eq!(first.dimension, Dimension::Openness);
        assert_eq!(catalog.lookup(2).unwrap().materials, "");
    }

    #[test]
    fn test_parse_rows_ndjson_reports_line() {
        let ndjson = "{\"id\": 1, \"prompt\": \"A\", \"dimension\": \"O\"}\n\nnot json\n";
        match parse_rows_ndjson(ndjson) {
            Err(BatteryError::Import(msg)) => assert!(msg.contains("line 3")),
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rows_missing_file_is_io() {
        let err = load_rows(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_catalogs_are_independent() {
        let a = BatteryCatalog::build("A", sample_rows()).unwrap();
        let b = BatteryCatalog::build("B", vec![RawTestRow::new(1, "Other", "N")]).unwrap();
        assert_eq!(a.lookup(1).unwrap().dimension, Dimension::Openness);
        assert_eq!(b.lookup(1).unwrap().dimension, Dimension::Neuroticism);
    }
}

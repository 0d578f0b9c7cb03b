//! ocean.session.v1 persistence codec
//!
//! Encodes a [`Session`] as a versioned JSON document and decodes it back.
//! Decoding is strict about required fields and the version tag but ignores
//! fields it does not know, so newer writers stay readable.

use crate::error::BatteryError;
use crate::session::{Session, SessionParts};
use crate::types::{ReferenceProfile, ScoreRecord, Subject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Current session document schema version
pub const SCHEMA_VERSION: &str = "ocean.session.v1";

const KNOWN_FIELDS: [&str; 10] = [
    "schema_version",
    "session_id",
    "subject",
    "battery_name",
    "results",
    "session_notes",
    "saved_at",
    "ideal_profile",
    "owner_profile",
    "assessment",
];

/// Persisted shape of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    pub subject: Subject,
    pub battery_name: String,
    /// Results in session entry order
    pub results: Vec<ScoreRecord>,
    pub session_notes: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal_profile: Option<ReferenceProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_profile: Option<ReferenceProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<String>,
}

/// Build the document for `session` as of `saved_at` without touching its state
pub fn to_document(session: &Session, saved_at: DateTime<Utc>) -> SessionDocument {
    SessionDocument {
        schema_version: SCHEMA_VERSION.to_string(),
        session_id: Some(session.id()),
        subject: session.subject().clone(),
        battery_name: session.battery_name().to_string(),
        results: session.records().to_vec(),
        session_notes: session.session_notes().to_string(),
        saved_at,
        ideal_profile: session.ideal_profile().copied(),
        owner_profile: session.owner_profile().copied(),
        assessment: session.assessment().map(str::to_string),
    }
}

/// Encode a session, stamping it and moving it to the saved state
pub fn encode(session: &mut Session) -> SessionDocument {
    let saved_at = Utc::now();
    let document = to_document(session, saved_at);
    session.mark_saved(saved_at);
    document
}

/// Encode a session to pretty-printed JSON
pub fn encode_to_json(session: &mut Session) -> Result<String, BatteryError> {
    let document = to_document(session, Utc::now());
    let json = document_to_json(&document)?;
    session.mark_saved(document.saved_at);
    Ok(json)
}

fn document_to_json(document: &SessionDocument) -> Result<String, BatteryError> {
    serde_json::to_string_pretty(document)
        .map_err(|e| BatteryError::Schema(format!("Failed to serialize session: {}", e)))
}

/// Rebuild a session from a typed document
pub fn decode(document: SessionDocument) -> Result<Session, BatteryError> {
    if document.schema_version != SCHEMA_VERSION {
        return Err(BatteryError::Schema(format!(
            "unsupported schema version: expected {}, got {}",
            SCHEMA_VERSION, document.schema_version
        )));
    }

    document
        .subject
        .validate()
        .map_err(|e| BatteryError::Schema(format!("invalid subject: {}", e)))?;

    if document.battery_name.trim().is_empty() {
        return Err(BatteryError::Schema("battery_name cannot be empty".to_string()));
    }

    let mut seen = HashSet::with_capacity(document.results.len());
    for record in &document.results {
        if record.test_id == 0 {
            return Err(BatteryError::Schema(
                "result test_id must be positive".to_string(),
            ));
        }
        if !seen.insert(record.test_id) {
            return Err(BatteryError::Schema(format!(
                "duplicate result for test {}",
                record.test_id
            )));
        }
    }

    Ok(Session::from_parts(SessionParts {
        id: document.session_id.unwrap_or_else(Uuid::new_v4),
        subject: document.subject,
        battery_name: document.battery_name,
        records: document.results,
        session_notes: document.session_notes,
        ideal_profile: document.ideal_profile,
        owner_profile: document.owner_profile,
        assessment: document.assessment,
        saved_at: document.saved_at,
    }))
}

/// Decode a session from JSON text
pub fn decode_json(json: &str) -> Result<Session, BatteryError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| BatteryError::Schema(format!("Invalid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| BatteryError::Schema("session document must be a JSON object".to_string()))?;

    match object.get("schema_version") {
        None => {
            return Err(BatteryError::Schema(
                "Missing required field: schema_version".to_string(),
            ))
        }
        Some(Value::String(v)) if v == SCHEMA_VERSION => {}
        Some(other) => {
            return Err(BatteryError::Schema(format!(
                "unsupported schema version: expected {}, got {}",
                SCHEMA_VERSION, other
            )))
        }
    }

    let unknown: Vec<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|k| !KNOWN_FIELDS.contains(k))
        .collect();
    if !unknown.is_empty() {
        warn!(fields = ?unknown, "ignoring unknown session document fields");
    }

    let document: SessionDocument = serde_json::from_value(value)
        .map_err(|e| BatteryError::Schema(format!("Failed to parse session document: {}", e)))?;
    decode(document)
}

/// Write a session to a storage medium. The session is only marked saved
/// once the write succeeded.
pub fn write_session<W: Write>(session: &mut Session, mut writer: W) -> Result<(), BatteryError> {
    let document = to_document(session, Utc::now());
    let json = document_to_json(&document)?;
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    session.mark_saved(document.saved_at);
    Ok(())
}

/// Read a session from a storage medium
pub fn read_session<R: Read>(mut reader: R) -> Result<Session, BatteryError> {
    let mut buffer = String::new();
    reader.read_to_string(&mut buffer)?;
    decode_json(&buffer)
}

/// Save a session to a file, creating parent directories as needed
pub fn save_to_path(session: &mut Session, path: &Path) -> Result<(), BatteryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_session(session, file)?;
    info!(path = %path.display(), records = session.len(), "session saved");
    Ok(())
}

/// Load a session from a file
pub fn load_from_path(path: &Path) -> Result<Session, BatteryError> {
    let file = File::open(path)?;
    let session = read_session(file)?;
    info!(path = %path.display(), records = session.len(), "session loaded");
    Ok(session)
}

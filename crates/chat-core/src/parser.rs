//! Record parser for decoded stream lines.
//!
//! Only `data: ` lines carry records. Each holds a JSON object whose `type`
//! field selects the record kind.

use serde::Deserialize;

use chat_types::error::DecodeWarning;

/// Marker that prefixes every record line
pub const DATA_PREFIX: &str = "data: ";

const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

/// A classified record, before session-level interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Start,
    /// Empty content is a no-op for the session
    Chunk { content: String },
    End { full_content: Option<String> },
    Error { error: String },
    /// A well-formed record of a type this client does not handle
    Unknown { kind: String },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    full_content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RawRecord {
    fn classify(self) -> Record {
        match self.kind.as_deref() {
            Some("start") => Record::Start,
            Some("chunk") => Record::Chunk {
                content: self.content.unwrap_or_default(),
            },
            Some("end") => Record::End {
                full_content: self.full_content.filter(|s| !s.is_empty()),
            },
            Some("error") => Record::Error {
                error: self
                    .error
                    .unwrap_or_else(|| UNKNOWN_SERVER_ERROR.to_string()),
            },
            // The backend reports a missing chat or API key as a bare `{"error": ...}`.
            None if self.error.is_some() => Record::Error {
                error: self.error.unwrap_or_default(),
            },
            Some(other) => Record::Unknown {
                kind: other.to_string(),
            },
            None => Record::Unknown {
                kind: String::new(),
            },
        }
    }
}

/// Parse one line. Non-record lines yield `Ok(None)`; a record line whose
/// payload is not a JSON object yields a warning.
pub fn decode_line(line: &str) -> Result<Option<Record>, DecodeWarning> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    if payload.trim().is_empty() {
        return Ok(None);
    }

    let raw: RawRecord =
        serde_json::from_str(payload).map_err(|e| DecodeWarning::MalformedJson {
            line: line.to_string(),
            reason: e.to_string(),
        })?;
    Ok(Some(raw.classify()))
}

/// Parse one line, logging and dropping malformed records.
pub fn parse_line(line: &str) -> Option<Record> {
    match decode_line(line) {
        Ok(record) => record,
        Err(warning) => {
            log::warn!("Discarding stream line: {}", warning);
            None
        }
    }
}

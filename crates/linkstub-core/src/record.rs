use crate::error::RecordError;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hash field names under which a [`LinkRecord`] is persisted.
pub mod field {
    pub const ID: &str = "id";
    pub const URL: &str = "url";
    pub const EXPIRES_AT: &str = "expires_at";
    pub const VISITS: &str = "visits";
}

/// A stored short link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Internal identifier, unique within the keyspace.
    pub id: u64,
    /// The original URL to redirect to. Immutable after creation.
    pub url: String,
    /// Absolute instant at which the record becomes unreachable.
    pub expires_at: Timestamp,
    /// Number of successful resolutions so far.
    pub visits: u64,
}

impl LinkRecord {
    /// Creates a fresh record with a zeroed visit counter.
    pub fn new(id: u64, url: impl Into<String>, expires_at: Timestamp) -> Self {
        Self {
            id,
            url: url.into(),
            expires_at,
            visits: 0,
        }
    }

    /// Flattens the record into the field-map shape stored by the backend.
    ///
    /// `expires_at` is rendered in the RFC 3339 display form of
    /// [`Timestamp`], which `from_fields` parses back.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (field::ID, self.id.to_string()),
            (field::URL, self.url.clone()),
            (field::EXPIRES_AT, self.expires_at.to_string()),
            (field::VISITS, self.visits.to_string()),
        ]
    }

    /// Rebuilds a record from the stored field map.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, RecordError> {
        Ok(Self {
            id: parse_field(fields, field::ID)?,
            url: require_field(fields, field::URL)?.to_owned(),
            expires_at: parse_field(fields, field::EXPIRES_AT)?,
            visits: parse_field(fields, field::VISITS)?,
        })
    }
}

fn require_field<'a>(
    fields: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, RecordError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or(RecordError::MissingField(name))
}

fn parse_field<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    name: &'static str,
) -> Result<T, RecordError> {
    let raw = require_field(fields, name)?;
    raw.parse().map_err(|_| RecordError::InvalidValue {
        field: name,
        value: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_map(fields: Vec<(&'static str, String)>) -> HashMap<String, String> {
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    #[test]
    fn field_map_round_trip() {
        let expires_at: Timestamp = "2026-08-07T12:00:00Z".parse().unwrap();
        let record = LinkRecord::new(42, "https://example.com", expires_at);

        let restored = LinkRecord::from_fields(&as_map(record.to_fields())).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn round_trip_preserves_visits() {
        let expires_at: Timestamp = "2026-08-07T12:00:00Z".parse().unwrap();
        let mut record = LinkRecord::new(7, "https://example.com", expires_at);
        record.visits = 13;

        let restored = LinkRecord::from_fields(&as_map(record.to_fields())).unwrap();
        assert_eq!(restored.visits, 13);
    }

    #[test]
    fn missing_field_is_rejected() {
        let expires_at: Timestamp = "2026-08-07T12:00:00Z".parse().unwrap();
        let record = LinkRecord::new(42, "https://example.com", expires_at);

        let mut fields = as_map(record.to_fields());
        fields.remove(field::URL);

        let err = LinkRecord::from_fields(&fields).unwrap_err();
        assert_eq!(err, RecordError::MissingField(field::URL));
    }

    #[test]
    fn invalid_value_is_rejected() {
        let expires_at: Timestamp = "2026-08-07T12:00:00Z".parse().unwrap();
        let record = LinkRecord::new(42, "https://example.com", expires_at);

        let mut fields = as_map(record.to_fields());
        fields.insert(field::VISITS.to_string(), "not-a-number".to_string());

        let err = LinkRecord::from_fields(&fields).unwrap_err();
        assert!(matches!(
            err,
            RecordError::InvalidValue {
                field: field::VISITS,
                ..
            }
        ));
    }

    #[test]
    fn new_record_starts_with_zero_visits() {
        let expires_at: Timestamp = "2026-08-07T12:00:00Z".parse().unwrap();
        let record = LinkRecord::new(1, "https://example.com", expires_at);
        assert_eq!(record.visits, 0);
    }
}

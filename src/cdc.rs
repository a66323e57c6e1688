//! Change-data-capture reduction.
//!
//! Loans, applications and vouches are stored as append-only version logs:
//! every state change is a brand-new record carrying a writer-assigned
//! nanosecond `created` timestamp, and nothing is ever updated or deleted in
//! place (closure/withdrawal is a flag on a newer record). Reading "current
//! state" therefore means reducing the log: partition by a group key and keep
//! the most recent record of each partition.
//!
//! [`reduce_records`] is pure. Output depends only on input, so it is safe to
//! call concurrently and repeatedly, and reapplying it to its own output is a
//! no-op.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::ReduceError;

/// One immutable version of an entity's state.
///
/// A thin wrapper over the stored JSON object. The reducer only interprets
/// two fields: the caller-named group key and `created`; everything else is
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VersionedRecord(pub Map<String, Value>);

/// Field holding the version timestamp on every record.
pub const CREATED_FIELD: &str = "created";

impl VersionedRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn require(&self, field: &str) -> Result<&Value, ReduceError> {
        self.0.get(field).ok_or_else(|| ReduceError::MissingField {
            field: field.to_string(),
        })
    }

    /// Normalized `created` timestamp for ordering.
    pub fn created(&self) -> Result<i128, ReduceError> {
        normalize_timestamp(CREATED_FIELD, self.require(CREATED_FIELD)?)
    }
}

/// Normalize a `created` value to a single integer timestamp.
///
/// Writers have historically emitted the nanosecond timestamp as a JSON
/// integer, a stringified integer, or (via one serializer) a float with zero
/// fraction. All three normalize to the same `i128`. Anything else cannot be
/// ordered and is a `TypeMismatch`: comparing across incompatible encodings
/// must fail loudly, never produce a silently-wrong ordering.
fn normalize_timestamp(field: &str, value: &Value) -> Result<i128, ReduceError> {
    let mismatch = || ReduceError::TypeMismatch {
        field: field.to_string(),
        found: value.to_string(),
    };

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i as i128);
            }
            if let Some(u) = n.as_u64() {
                return Ok(u as i128);
            }
            // Integral floats only. Fractional or non-finite values have no
            // exact nanosecond meaning.
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i128),
                _ => Err(mismatch()),
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i128>() {
                return Ok(i);
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i128),
                _ => Err(mismatch()),
            }
        }
        _ => Err(mismatch()),
    }
}

/// Stable string form of a group-key value, used to partition records.
fn group_key_string(value: &Value) -> String {
    match value {
        // Unquoted so "a" and a hypothetical numeric key render distinctly
        // from their JSON forms only where it matters.
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reduce a CDC record set.
///
/// * `recent_only = false`: the full history view. Input is returned
///   unchanged; an empty input yields an empty output.
/// * `recent_only = true`: records are partitioned by the value of
///   `group_key_field`; within each partition the record with the maximum
///   normalized `created` wins. Partitions are emitted sorted by group-key
///   value, so output order is deterministic regardless of input order.
///
/// Ties on `created` within a partition are broken by comparing the records'
/// canonical JSON serialization and keeping the greater string. Arrival order
/// never influences the result, which keeps the function pure and idempotent.
pub fn reduce_records(
    records: &[VersionedRecord],
    group_key_field: &str,
    recent_only: bool,
) -> Result<Vec<VersionedRecord>, ReduceError> {
    if !recent_only {
        return Ok(records.to_vec());
    }

    // BTreeMap keyed by group value: sorted, deterministic emission order.
    let mut latest: BTreeMap<String, (i128, &VersionedRecord)> = BTreeMap::new();

    for record in records {
        let key = group_key_string(record.require(group_key_field)?);
        let created = record.created()?;

        let replaces = match latest.get(&key) {
            None => true,
            Some((current_created, current)) => {
                created > *current_created
                    || (created == *current_created
                        && canonical_form(record) > canonical_form(current))
            }
        };
        if replaces {
            latest.insert(key, (created, record));
        }
    }

    tracing::debug!(
        input = records.len(),
        partitions = latest.len(),
        group_key = group_key_field,
        "reduced CDC records"
    );

    Ok(latest.into_values().map(|(_, r)| r.clone()).collect())
}

/// Canonical serialization used as the deterministic tie-breaker.
///
/// `serde_json`'s map is ordered by key, so two records with the same content
/// always serialize identically.
fn canonical_form(record: &VersionedRecord) -> String {
    // Serialization of Map<String, Value> cannot fail.
    serde_json::to_string(&record.0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> VersionedRecord {
        match value {
            Value::Object(map) => VersionedRecord::new(map),
            _ => panic!("test records must be JSON objects"),
        }
    }

    #[test]
    fn recent_only_keeps_latest_per_group() {
        let records = vec![
            record(json!({"id": "a", "created": 100, "closed": false})),
            record(json!({"id": "a", "created": 200, "closed": true})),
        ];

        let reduced = reduce_records(&records, "id", true).unwrap();
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].fields()["created"], json!(200));
        assert_eq!(reduced[0].fields()["closed"], json!(true));
    }

    #[test]
    fn full_history_returns_input_unchanged() {
        let records = vec![
            record(json!({"id": "a", "created": 200})),
            record(json!({"id": "a", "created": 100})),
        ];

        let out = reduce_records(&records, "id", false).unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(reduce_records(&[], "id", true).unwrap(), vec![]);
        assert_eq!(reduce_records(&[], "id", false).unwrap(), vec![]);
    }

    #[test]
    fn one_record_per_distinct_group_key() {
        let records = vec![
            record(json!({"loan_id": "l1", "created": 10})),
            record(json!({"loan_id": "l2", "created": 30})),
            record(json!({"loan_id": "l1", "created": 20})),
            record(json!({"loan_id": "l3", "created": 5})),
        ];

        let reduced = reduce_records(&records, "loan_id", true).unwrap();
        assert_eq!(reduced.len(), 3);
        for r in &reduced {
            let key = r.fields()["loan_id"].as_str().unwrap();
            let created = r.created().unwrap();
            let max = records
                .iter()
                .filter(|o| o.fields()["loan_id"].as_str().unwrap() == key)
                .map(|o| o.created().unwrap())
                .max()
                .unwrap();
            assert_eq!(created, max);
        }
    }

    #[test]
    fn reduction_is_idempotent() {
        let records = vec![
            record(json!({"id": "a", "created": 100, "amount": 5})),
            record(json!({"id": "a", "created": 200, "amount": 7})),
            record(json!({"id": "b", "created": 50})),
        ];

        let once = reduce_records(&records, "id", true).unwrap();
        let twice = reduce_records(&once, "id", true).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn heterogeneous_created_encodings_compare_correctly() {
        let records = vec![
            record(json!({"id": "a", "created": "150"})),
            record(json!({"id": "a", "created": 100})),
            record(json!({"id": "a", "created": 125.0})),
        ];

        let reduced = reduce_records(&records, "id", true).unwrap();
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].fields()["created"], json!("150"));
    }

    #[test]
    fn non_numeric_created_is_type_mismatch() {
        let records = vec![
            record(json!({"id": "a", "created": 100})),
            record(json!({"id": "a", "created": "yesterday"})),
        ];

        let err = reduce_records(&records, "id", true).unwrap_err();
        assert!(matches!(err, ReduceError::TypeMismatch { ref field, .. } if field == "created"));
    }

    #[test]
    fn fractional_created_is_type_mismatch() {
        let records = vec![record(json!({"id": "a", "created": 100.5}))];
        let err = reduce_records(&records, "id", true).unwrap_err();
        assert!(matches!(err, ReduceError::TypeMismatch { .. }));
    }

    #[test]
    fn missing_group_key_is_loud() {
        let records = vec![record(json!({"created": 100}))];
        let err = reduce_records(&records, "id", true).unwrap_err();
        assert_eq!(
            err,
            ReduceError::MissingField {
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn equal_created_breaks_ties_by_content_not_order() {
        let first = record(json!({"id": "a", "created": 100, "note": "x"}));
        let second = record(json!({"id": "a", "created": 100, "note": "y"}));

        let forwards = reduce_records(&[first.clone(), second.clone()], "id", true).unwrap();
        let backwards = reduce_records(&[second, first], "id", true).unwrap();
        assert_eq!(forwards, backwards);
        assert_eq!(forwards[0].fields()["note"], json!("y"));
    }

    #[test]
    fn partitions_emit_in_sorted_key_order() {
        let records = vec![
            record(json!({"id": "z", "created": 1})),
            record(json!({"id": "a", "created": 1})),
            record(json!({"id": "m", "created": 1})),
        ];

        let reduced = reduce_records(&records, "id", true).unwrap();
        let keys: Vec<_> = reduced
            .iter()
            .map(|r| r.fields()["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }
}

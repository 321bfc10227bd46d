use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Key of the week-start field in InfoDengue records (epoch milliseconds)
pub const WEEK_START_KEY: &str = "data_iniSE";
/// Key of the epidemiological-week field (e.g. 202513)
pub const EPIWEEK_KEY: &str = "SE";
/// Entity columns appended to every normalized row
pub const MUNICIPALITY_KEY: &str = "cidade";
pub const GEOCODE_KEY: &str = "geocode";

/// Per-municipality normalization failure, recorded as a `Failure`
/// outcome by the sweep loop.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("expected a JSON array of weekly records, got {0}")]
    NotAnArray(&'static str),

    #[error("weekly record #{0} is not a JSON object")]
    RecordNotAnObject(usize),
}

/// One weekly record in uniform tabular shape: the entity columns and the
/// recognized temporal fields are typed, everything else the API sent
/// passes through verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRow {
    pub municipality: String,
    pub geocode: u32,
    /// Start of the epidemiological week, converted from epoch milliseconds
    pub week_start: Option<NaiveDate>,
    /// Epidemiological week number, e.g. 202513
    pub epiweek: Option<u32>,
    pub extra: BTreeMap<String, Value>,
}

impl AlertRow {
    /// Build a row from one raw record, attaching the entity columns.
    pub fn from_record(record: &Map<String, Value>, municipality: &str, geocode: u32) -> Self {
        let mut week_start = None;
        let mut epiweek = None;
        let mut extra = BTreeMap::new();

        for (key, value) in record {
            match key.as_str() {
                WEEK_START_KEY => week_start = parse_week_start(value),
                EPIWEEK_KEY => epiweek = parse_epiweek(value),
                // Entity columns are always taken from the arguments, so
                // re-normalizing an emitted record cannot duplicate them.
                MUNICIPALITY_KEY | GEOCODE_KEY => {}
                _ => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }

        Self {
            municipality: municipality.to_string(),
            geocode,
            week_start,
            epiweek,
            extra,
        }
    }

    /// Render the row back into the record shape `from_record` accepts.
    /// The date goes out as `YYYY-MM-DD`, which `parse_week_start` also
    /// reads, making normalize ∘ to_record a no-op.
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert(
            MUNICIPALITY_KEY.to_string(),
            Value::String(self.municipality.clone()),
        );
        record.insert(GEOCODE_KEY.to_string(), Value::from(self.geocode));
        if let Some(date) = self.week_start {
            record.insert(
                WEEK_START_KEY.to_string(),
                Value::String(date.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(week) = self.epiweek {
            record.insert(EPIWEEK_KEY.to_string(), Value::from(week));
        }
        for (key, value) in &self.extra {
            record.insert(key.clone(), value.clone());
        }
        Value::Object(record)
    }
}

/// Result of normalizing one raw response: rows, or a valid "no data"
/// answer. Unparseable responses are errors, never Empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Rows(Vec<AlertRow>),
    Empty,
}

/// Convert a raw InfoDengue response into uniform rows tagged with the
/// municipality identity.
pub fn normalize(
    raw: &Value,
    municipality: &str,
    geocode: u32,
) -> Result<Normalized, NormalizeError> {
    let records = match raw {
        Value::Array(records) => records,
        Value::Null => return Ok(Normalized::Empty),
        other => return Err(NormalizeError::NotAnArray(json_type_name(other))),
    };

    if records.is_empty() {
        return Ok(Normalized::Empty);
    }

    let mut rows = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let record = record
            .as_object()
            .ok_or(NormalizeError::RecordNotAnObject(idx))?;
        rows.push(AlertRow::from_record(record, municipality, geocode));
    }
    Ok(Normalized::Rows(rows))
}

/// Read the week-start field as epoch milliseconds or as an already
/// converted `YYYY-MM-DD` string.
fn parse_week_start(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn parse_epiweek(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|w| u32::try_from(w).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CURITIBA: u32 = 4106902;

    fn sample_response() -> Value {
        json!([
            {
                "data_iniSE": 1704585600000i64,
                "SE": 202402,
                "casos": 10,
                "casos_est": 12.5,
                "nivel": 1,
            },
            {
                "data_iniSE": 1705190400000i64,
                "SE": "202403",
                "casos": 7,
                "Rt": 0.93,
            },
        ])
    }

    #[test]
    fn test_normalize_attaches_entity_columns_and_converts_dates() {
        let rows = match normalize(&sample_response(), "Curitiba", CURITIBA).unwrap() {
            Normalized::Rows(rows) => rows,
            Normalized::Empty => panic!("expected rows"),
        };

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.municipality, "Curitiba");
            assert_eq!(row.geocode, CURITIBA);
        }

        assert_eq!(
            rows[0].week_start,
            Some(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap())
        );
        assert_eq!(rows[0].epiweek, Some(202402));
        assert_eq!(rows[0].extra.get("casos"), Some(&json!(10)));
        assert_eq!(rows[0].extra.get("casos_est"), Some(&json!(12.5)));

        // The week number also converts from a string field
        assert_eq!(rows[1].epiweek, Some(202403));
        assert_eq!(rows[1].extra.get("Rt"), Some(&json!(0.93)));
        // Typed fields do not leak into the passthrough map
        assert!(!rows[1].extra.contains_key("data_iniSE"));
        assert!(!rows[1].extra.contains_key("SE"));
    }

    #[test]
    fn test_normalize_empty_is_not_failure() {
        assert_eq!(
            normalize(&json!([]), "Curitiba", CURITIBA).unwrap(),
            Normalized::Empty
        );
        assert_eq!(
            normalize(&Value::Null, "Curitiba", CURITIBA).unwrap(),
            Normalized::Empty
        );
    }

    #[test]
    fn test_normalize_rejects_non_tabular_payloads() {
        let err = normalize(&json!({"detail": "rate limited"}), "Curitiba", CURITIBA).unwrap_err();
        assert!(matches!(err, NormalizeError::NotAnArray("object")));

        let err = normalize(&json!([1, 2, 3]), "Curitiba", CURITIBA).unwrap_err();
        assert!(matches!(err, NormalizeError::RecordNotAnObject(0)));
    }

    #[test]
    fn test_normalize_tolerates_missing_fields() {
        let raw = json!([{"casos": 3}]);
        let rows = match normalize(&raw, "Sarandi", 4126256).unwrap() {
            Normalized::Rows(rows) => rows,
            Normalized::Empty => panic!("expected rows"),
        };
        assert_eq!(rows[0].week_start, None);
        assert_eq!(rows[0].epiweek, None);
        assert_eq!(rows[0].extra.get("casos"), Some(&json!(3)));
    }

    #[test]
    fn test_renormalizing_emitted_records_is_a_no_op() {
        let first = match normalize(&sample_response(), "Curitiba", CURITIBA).unwrap() {
            Normalized::Rows(rows) => rows,
            Normalized::Empty => panic!("expected rows"),
        };

        let emitted = Value::Array(first.iter().map(AlertRow::to_record).collect());
        let second = match normalize(&emitted, "Curitiba", CURITIBA).unwrap() {
            Normalized::Rows(rows) => rows,
            Normalized::Empty => panic!("expected rows"),
        };

        assert_eq!(first, second);
    }
}

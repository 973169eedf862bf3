use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

use crate::errors::GenerationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
    Date,
    Time,
    Timestamp,
    /// Non-empty JSON array.
    Array,
    /// Any JSON value, including null.
    Any,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn new(key: &'static str, kind: ParamKind, required: bool) -> Self {
        Self {
            key,
            kind,
            required,
        }
    }
}

/// Validated view over a generator's JSON params.
pub struct ParamMap<'a> {
    map: Option<&'a Map<String, Value>>,
}

/// Check `params` against `specs`: unknown keys, wrong kinds and missing
/// required keys are rejected.
pub fn validate_params<'a>(
    params: Option<&'a Value>,
    specs: &[ParamSpec],
    generator: &str,
) -> Result<ParamMap<'a>, GenerationError> {
    let map = match params {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            return Err(GenerationError::invalid_params(
                generator,
                "params must be a JSON object",
            ));
        }
    };

    if let Some(map) = map {
        for (key, value) in map {
            let Some(spec) = specs.iter().find(|spec| spec.key == key.as_str()) else {
                return Err(GenerationError::invalid_params(
                    generator,
                    format!("unknown param '{key}'"),
                ));
            };
            validate_kind(generator, key, spec.kind, value)?;
        }
    }

    for spec in specs {
        if spec.required && !map.is_some_and(|map| map.contains_key(spec.key)) {
            return Err(GenerationError::invalid_params(
                generator,
                format!("missing required param '{}'", spec.key),
            ));
        }
    }

    Ok(ParamMap { map })
}

impl<'a> ParamMap<'a> {
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(key))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_array(&self, key: &str) -> Option<&'a [Value]> {
        self.get(key).and_then(Value::as_array).map(Vec::as_slice)
    }

    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        self.get_str(key).and_then(parse_date_value)
    }

    pub fn get_time(&self, key: &str) -> Option<NaiveTime> {
        self.get_str(key).and_then(parse_time_value)
    }

    pub fn get_timestamp(&self, key: &str) -> Option<NaiveDateTime> {
        self.get_str(key).and_then(parse_timestamp_value)
    }
}

fn validate_kind(
    generator: &str,
    key: &str,
    kind: ParamKind,
    value: &Value,
) -> Result<(), GenerationError> {
    let valid = match kind {
        ParamKind::Bool => value.is_boolean(),
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Float => value.as_f64().is_some(),
        ParamKind::String => value.is_string(),
        ParamKind::Date => value.as_str().and_then(parse_date_value).is_some(),
        ParamKind::Time => value.as_str().and_then(parse_time_value).is_some(),
        ParamKind::Timestamp => value.as_str().and_then(parse_timestamp_value).is_some(),
        ParamKind::Array => value.as_array().is_some_and(|items| !items.is_empty()),
        ParamKind::Any => true,
    };

    if valid {
        Ok(())
    } else {
        Err(GenerationError::invalid_params(
            generator,
            format!("invalid value for param '{key}'"),
        ))
    }
}

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_time_value(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(value, "%H:%M:%S%.f").ok())
}

pub fn parse_timestamp_value(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPECS: &[ParamSpec] = &[
        ParamSpec::new("min", ParamKind::Int, false),
        ParamSpec::new("values", ParamKind::Array, true),
    ];

    #[test]
    fn rejects_unknown_and_missing_params() {
        let unknown = json!({"values": [1], "other": 1});
        assert!(validate_params(Some(&unknown), SPECS, "test").is_err());

        let missing = json!({"min": 1});
        assert!(validate_params(Some(&missing), SPECS, "test").is_err());
    }

    #[test]
    fn rejects_wrong_kinds() {
        let params = json!({"values": [], "min": "one"});
        let err = validate_params(Some(&params), SPECS, "test").err();
        assert!(matches!(err, Some(GenerationError::InvalidParams { .. })));
    }

    #[test]
    fn reads_typed_values() {
        let params = json!({"values": ["a", "b"], "min": 3});
        let map = validate_params(Some(&params), SPECS, "test").expect("valid");
        assert_eq!(map.get_i64("min"), Some(3));
        assert_eq!(map.get_array("values").map(<[Value]>::len), Some(2));
    }

    #[test]
    fn parses_timestamps_in_several_formats() {
        assert!(parse_timestamp_value("2024-01-02T03:04:05Z").is_some());
        assert!(parse_timestamp_value("2024-01-02T03:04:05").is_some());
        assert!(parse_timestamp_value("2024-01-02 03:04:05").is_some());
        assert!(parse_timestamp_value("yesterday").is_none());
    }
}

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Value produced for a single column of a generated row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    /// Whether the value counts as "present" for `null_if_no` evaluation.
    ///
    /// NULL and `false` are absent; everything else is present.
    pub fn is_present(&self) -> bool {
        !matches!(self, GeneratedValue::Null | GeneratedValue::Bool(false))
    }

    /// Textual rendering used for CSV output and uniqueness keys.
    pub fn to_text(&self) -> String {
        match self {
            GeneratedValue::Null => String::new(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.clone(),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Time(value) => value.format("%H:%M:%S").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Stable key that distinguishes values of different variants.
    pub fn key(&self) -> String {
        match self {
            GeneratedValue::Null => "<null>".to_string(),
            GeneratedValue::Bool(_) => format!("b:{}", self.to_text()),
            GeneratedValue::Int(_) => format!("i:{}", self.to_text()),
            GeneratedValue::Float(_) => format!("f:{}", self.to_text()),
            GeneratedValue::Text(_) | GeneratedValue::Uuid(_) => format!("s:{}", self.to_text()),
            GeneratedValue::Date(_) | GeneratedValue::Time(_) | GeneratedValue::Timestamp(_) => {
                format!("t:{}", self.to_text())
            }
        }
    }

    /// Rough number of bytes the value occupies inside an INSERT payload.
    pub fn approx_size(&self) -> usize {
        match self {
            GeneratedValue::Null => 4,
            GeneratedValue::Bool(_) => 5,
            GeneratedValue::Int(_) | GeneratedValue::Float(_) => 20,
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.len() + 2,
            GeneratedValue::Date(_) => 12,
            GeneratedValue::Time(_) => 10,
            GeneratedValue::Timestamp(_) => 21,
        }
    }

    /// Interpret a textual value read back from a column of type `kind`.
    ///
    /// Keys loaded from existing tables then bind with the type they would
    /// have had if generated. Integer or UUID text that does not parse stays
    /// text.
    pub fn from_db_text(value: Option<&str>, kind: KeyKind) -> Self {
        let Some(value) = value else {
            return GeneratedValue::Null;
        };
        match kind {
            KeyKind::Integer => value
                .parse::<i64>()
                .map(GeneratedValue::Int)
                .unwrap_or_else(|_| GeneratedValue::Text(value.to_string())),
            KeyKind::Uuid if uuid::Uuid::parse_str(value).is_ok() => {
                GeneratedValue::Uuid(value.to_string())
            }
            KeyKind::Uuid | KeyKind::Text => GeneratedValue::Text(value.to_string()),
        }
    }
}

/// How values of a database column are bound back, from its catalog type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyKind {
    Integer,
    Uuid,
    #[default]
    Text,
}

impl KeyKind {
    /// Map an `information_schema.columns.data_type` value.
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type.trim().to_ascii_lowercase().as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "int2"
            | "int4" | "int8" | "smallserial" | "serial" | "bigserial" => KeyKind::Integer,
            "uuid" => KeyKind::Uuid,
            _ => KeyKind::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_treats_false_and_null_as_absent() {
        assert!(!GeneratedValue::Null.is_present());
        assert!(!GeneratedValue::Bool(false).is_present());
        assert!(GeneratedValue::Bool(true).is_present());
        assert!(GeneratedValue::Int(0).is_present());
        assert!(GeneratedValue::Text(String::new()).is_present());
    }

    #[test]
    fn keys_do_not_collide_across_variants() {
        assert_ne!(
            GeneratedValue::Int(1).key(),
            GeneratedValue::Text("1".to_string()).key()
        );
    }

    #[test]
    fn db_text_follows_column_type() {
        assert_eq!(
            GeneratedValue::from_db_text(Some("42"), KeyKind::Integer),
            GeneratedValue::Int(42)
        );
        assert_eq!(
            GeneratedValue::from_db_text(Some("007"), KeyKind::Text),
            GeneratedValue::Text("007".to_string())
        );
        assert_eq!(
            GeneratedValue::from_db_text(Some("+5"), KeyKind::Text).to_text(),
            "+5"
        );
        assert_eq!(GeneratedValue::from_db_text(None, KeyKind::Integer), GeneratedValue::Null);
        assert!(matches!(
            GeneratedValue::from_db_text(Some("9f1c0a3e-5a9b-4a8e-8d3c-1b2e3f4a5b6c"), KeyKind::Uuid),
            GeneratedValue::Uuid(_)
        ));
    }

    #[test]
    fn data_types_map_to_key_kinds() {
        assert_eq!(KeyKind::from_data_type("bigint"), KeyKind::Integer);
        assert_eq!(KeyKind::from_data_type("INT"), KeyKind::Integer);
        assert_eq!(KeyKind::from_data_type("uuid"), KeyKind::Uuid);
        assert_eq!(KeyKind::from_data_type("character varying"), KeyKind::Text);
        assert_eq!(KeyKind::from_data_type("char"), KeyKind::Text);
    }
}

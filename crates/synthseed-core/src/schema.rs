use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constraints::{ConstraintSet, ForeignKey};
use crate::types::GeneratedValue;

/// Ordered column → value mapping for one generated row.
pub type GeneratedRow = BTreeMap<String, GeneratedValue>;

/// Column name → generation rule, in declaration order.
pub type FakerSchema = IndexMap<String, GenerationRule>;

/// Every table of a run keyed by table name.
pub type TableConfigurations = BTreeMap<String, TableConfiguration>;

/// Reference from a child column to a parent column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Child-to-parent row-count multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParentTableRatio {
    pub table: String,
    pub ratio: f64,
}

/// Declarative rule describing how one column is synthesized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GenerationRule {
    /// Generator id, e.g. `int.sequence` or `faker.name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    /// Generator parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Parent column the value must be taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
    /// Sibling columns whose absence forces this column to NULL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub null_if_no: Vec<String>,
}

impl GenerationRule {
    pub fn has_null_condition(&self) -> bool {
        !self.null_if_no.is_empty()
    }
}

/// One per-table configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TableDocument {
    /// Column name → generation rule.
    #[serde(default)]
    pub faker_schema: FakerSchema,
    /// Fixed number of rows to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    /// Size this table relative to a parent table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_table_ratio: Option<ParentTableRatio>,
    /// The table is filled outside this tool; only its keys are used.
    #[serde(default)]
    pub populated_by_migration: bool,
}

/// Per-table state for a run.
#[derive(Debug, Clone, Default)]
pub struct TableConfiguration {
    pub name: String,
    pub faker_schema: FakerSchema,
    /// Declared amount, replaced by the resolved amount before generation.
    pub amount: Option<u64>,
    pub parent_table_ratio: Option<ParentTableRatio>,
    pub primary_key: Option<Vec<String>>,
    pub unique_indexes: BTreeSet<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
    pub columns_order: Vec<String>,
    pub data: Vec<GeneratedRow>,
    pub is_populated: bool,
    pub is_populated_by_migration: bool,
}

impl TableConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_document(name: impl Into<String>, doc: TableDocument) -> Self {
        Self {
            name: name.into(),
            faker_schema: doc.faker_schema,
            amount: doc.amount,
            parent_table_ratio: doc.parent_table_ratio,
            is_populated_by_migration: doc.populated_by_migration,
            ..Self::default()
        }
    }

    pub fn with_rule(mut self, column: impl Into<String>, rule: GenerationRule) -> Self {
        self.faker_schema.insert(column.into(), rule);
        self
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_ratio(mut self, table: impl Into<String>, ratio: f64) -> Self {
        self.parent_table_ratio = Some(ParentTableRatio {
            table: table.into(),
            ratio,
        });
        self
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_unique_index(mut self, columns: &[&str]) -> Self {
        self.unique_indexes
            .insert(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn populated_by_migration(mut self) -> Self {
        self.is_populated_by_migration = true;
        self
    }

    /// Merge introspected constraints into this table.
    ///
    /// Foreign keys are copied onto the matching faker rules when none of
    /// their columns already declares one. A composite key links each of its
    /// columns to the referenced column at the same position.
    pub fn merge_constraints(&mut self, constraints: ConstraintSet) {
        if constraints.primary_key.is_some() {
            self.primary_key = constraints.primary_key;
        }
        self.unique_indexes.extend(constraints.unique_indexes);

        for fk in constraints.foreign_keys {
            let linkable = !fk.columns.is_empty()
                && fk.columns.len() == fk.referenced_columns.len()
                && fk.columns.iter().all(|column| {
                    self.faker_schema
                        .get(column)
                        .is_some_and(|rule| rule.foreign_key.is_none())
                });
            if linkable {
                for (column, referenced) in fk.columns.iter().zip(&fk.referenced_columns) {
                    if let Some(rule) = self.faker_schema.get_mut(column) {
                        rule.foreign_key = Some(ForeignKeyRef {
                            table: fk.referenced_table.clone(),
                            column: referenced.clone(),
                        });
                    }
                }
            }
            if !self.foreign_keys.contains(&fk) {
                self.foreign_keys.push(fk);
            }
        }
    }

    /// Multi-column foreign keys whose every column is generated from the
    /// matching referenced column. Such columns must be filled together
    /// from a single parent row.
    pub fn composite_foreign_keys(&self) -> Vec<&ForeignKey> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.columns.len() > 1 && fk.columns.len() == fk.referenced_columns.len())
            .filter(|fk| {
                fk.columns
                    .iter()
                    .zip(&fk.referenced_columns)
                    .all(|(column, referenced)| {
                        self.faker_schema
                            .get(column)
                            .and_then(|rule| rule.foreign_key.as_ref())
                            .is_some_and(|target| {
                                target.table == fk.referenced_table && target.column == *referenced
                            })
                    })
            })
            .collect()
    }

    /// Tables this table must wait for, self-references excluded.
    pub fn parent_tables(&self) -> BTreeSet<String> {
        let mut parents = BTreeSet::new();
        for rule in self.faker_schema.values() {
            if let Some(fk) = &rule.foreign_key {
                parents.insert(fk.table.clone());
            }
        }
        for fk in &self.foreign_keys {
            if fk.columns.iter().any(|column| self.faker_schema.contains_key(column)) {
                parents.insert(fk.referenced_table.clone());
            }
        }
        if let Some(ratio) = &self.parent_table_ratio {
            parents.insert(ratio.table.clone());
        }
        parents.remove(&self.name);
        parents
    }

    /// Column tuples that must be distinct across generated rows.
    ///
    /// Only tuples fully covered by the faker schema are returned; columns
    /// filled by the database (auto-increment keys, defaults) cannot collide
    /// within generated data.
    pub fn unique_tuples(&self) -> Vec<Vec<String>> {
        let mut tuples: Vec<Vec<String>> = Vec::new();
        let candidates = self.primary_key.iter().chain(self.unique_indexes.iter());
        for tuple in candidates {
            if tuple.is_empty()
                || !tuple.iter().all(|column| self.faker_schema.contains_key(column))
            {
                continue;
            }
            if !tuples.contains(tuple) {
                tuples.push(tuple.clone());
            }
        }
        tuples
    }

    /// Values of one column across generated rows.
    pub fn column_values(&self, column: &str) -> Vec<GeneratedValue> {
        self.data
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_null())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk_rule(table: &str, column: &str) -> GenerationRule {
        GenerationRule {
            foreign_key: Some(ForeignKeyRef {
                table: table.to_string(),
                column: column.to_string(),
            }),
            ..GenerationRule::default()
        }
    }

    #[test]
    fn parses_table_document() {
        let doc: TableDocument = serde_json::from_str(
            r#"{
                "amount": 5,
                "faker_schema": {
                    "id": {"generator": "int.sequence"},
                    "country_id": {"foreign_key": {"table": "countries", "column": "id"}},
                    "note": {"generator": "faker.sentence", "null_if_no": ["country_id"]}
                }
            }"#,
        )
        .expect("parse document");
        let table = TableConfiguration::from_document("cities", doc);
        assert_eq!(table.amount, Some(5));
        assert_eq!(table.parent_tables(), BTreeSet::from(["countries".to_string()]));
        assert!(table.faker_schema["note"].has_null_condition());
    }

    #[test]
    fn rejects_unknown_rule_fields() {
        let result: Result<TableDocument, _> =
            serde_json::from_str(r#"{"faker_schema": {"id": {"generatr": "uuid"}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn merge_fills_missing_foreign_key_rules() {
        let mut table = TableConfiguration::new("orders")
            .with_rule("user_id", GenerationRule::default())
            .with_rule("id", GenerationRule::default());

        table.merge_constraints(ConstraintSet {
            primary_key: Some(vec!["id".to_string()]),
            unique_indexes: BTreeSet::new(),
            foreign_keys: vec![ForeignKey {
                name: Some("fk_orders_user".to_string()),
                columns: vec!["user_id".to_string()],
                referenced_table: "users".to_string(),
                referenced_columns: vec!["id".to_string()],
            }],
        });

        assert_eq!(
            table.faker_schema["user_id"].foreign_key,
            Some(ForeignKeyRef {
                table: "users".to_string(),
                column: "id".to_string()
            })
        );
        assert_eq!(table.unique_tuples(), vec![vec!["id".to_string()]]);
        assert!(table.parent_tables().contains("users"));
    }

    #[test]
    fn merge_links_composite_foreign_keys() {
        let mut table = TableConfiguration::new("shipments")
            .with_rule("warehouse_region", GenerationRule::default())
            .with_rule("warehouse_code", GenerationRule::default())
            .with_rule("id", GenerationRule::default());

        table.merge_constraints(ConstraintSet {
            primary_key: Some(vec!["id".to_string()]),
            unique_indexes: BTreeSet::new(),
            foreign_keys: vec![ForeignKey {
                name: Some("fk_shipments_warehouse".to_string()),
                columns: vec!["warehouse_region".to_string(), "warehouse_code".to_string()],
                referenced_table: "warehouses".to_string(),
                referenced_columns: vec!["region".to_string(), "code".to_string()],
            }],
        });

        assert_eq!(
            table.faker_schema["warehouse_code"].foreign_key,
            Some(ForeignKeyRef {
                table: "warehouses".to_string(),
                column: "code".to_string()
            })
        );
        let composite = table.composite_foreign_keys();
        assert_eq!(composite.len(), 1);
        assert_eq!(composite[0].referenced_columns, vec!["region", "code"]);
    }

    #[test]
    fn composite_key_with_declared_column_stays_unlinked() {
        let mut table = TableConfiguration::new("shipments")
            .with_rule("warehouse_region", fk_rule("regions", "name"))
            .with_rule("warehouse_code", GenerationRule::default());

        table.merge_constraints(ConstraintSet {
            primary_key: None,
            unique_indexes: BTreeSet::new(),
            foreign_keys: vec![ForeignKey {
                name: None,
                columns: vec!["warehouse_region".to_string(), "warehouse_code".to_string()],
                referenced_table: "warehouses".to_string(),
                referenced_columns: vec!["region".to_string(), "code".to_string()],
            }],
        });

        assert!(table.faker_schema["warehouse_code"].foreign_key.is_none());
        assert!(table.composite_foreign_keys().is_empty());
    }

    #[test]
    fn self_reference_is_not_a_parent() {
        let table = TableConfiguration::new("employees").with_rule("manager_id", fk_rule("employees", "id"));
        assert!(table.parent_tables().is_empty());
    }

    #[test]
    fn unique_tuples_skip_columns_outside_faker_schema() {
        let table = TableConfiguration::new("users")
            .with_rule("email", GenerationRule::default())
            .with_primary_key(&["id"])
            .with_unique_index(&["email"]);
        assert_eq!(table.unique_tuples(), vec![vec!["email".to_string()]]);
    }
}

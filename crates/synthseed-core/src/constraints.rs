use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Foreign key definition preserving column ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    pub fn is_self_reference(&self, table: &str) -> bool {
        self.referenced_table == table
    }
}

/// Relational constraints read from the live schema for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub primary_key: Option<Vec<String>>,
    pub unique_indexes: BTreeSet<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl ConstraintSet {
    pub fn is_empty(&self) -> bool {
        self.primary_key.is_none() && self.unique_indexes.is_empty() && self.foreign_keys.is_empty()
    }
}

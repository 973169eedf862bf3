use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_UNIQUE_RETRIES: u32 = 50;

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Run seed; each table derives its own RNG stream from it.
    pub seed: u64,
    /// Regeneration attempts allowed for one row's unique collisions.
    pub max_unique_retries: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            max_unique_retries: DEFAULT_MAX_UNIQUE_RETRIES,
        }
    }
}

/// Summary of a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub retries: u64,
}

/// Report for a generation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub tables: Vec<TableReport>,
    pub retries_total: u64,
    pub generator_usage: BTreeMap<String, u64>,
}

impl GenerationReport {
    pub fn record_generator_usage(&mut self, id: &str) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn record_table(&mut self, table: TableReport) {
        self.retries_total += table.retries;
        self.tables.push(table);
    }

    pub fn rows_generated(&self) -> u64 {
        self.tables.iter().map(|table| table.rows_generated).sum()
    }
}

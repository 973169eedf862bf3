use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use synthseed_core::{
    GeneratedRow, GeneratedValue, TableConfiguration, TableConfigurations, plan_columns_order,
};

use crate::errors::GenerationError;
use crate::foreign::{ForeignGroup, ForeignSource, ParentKeys, referenced_columns, referenced_tuples};
use crate::generators::{GeneratorContext, GeneratorRegistry};
use crate::model::{GenerateOptions, GenerationReport, TableReport};
use crate::planner::plan_tables;

/// Fills `TableConfiguration::data` for every generated table.
#[derive(Debug)]
pub struct GenerationEngine {
    options: GenerateOptions,
    registry: GeneratorRegistry,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self::with_registry(options, GeneratorRegistry::with_builtins())
    }

    pub fn with_registry(options: GenerateOptions, registry: GeneratorRegistry) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// Generate rows table by table in `order`.
    ///
    /// `parent_keys` must already hold the keys of migration-populated
    /// parents; keys of every generated table are added as it completes, so
    /// children always draw from fully generated parents.
    pub fn run(
        &self,
        tables: &mut TableConfigurations,
        order: &[String],
        parent_keys: &mut ParentKeys,
    ) -> Result<GenerationReport, GenerationError> {
        let start = Instant::now();
        self.check_generators(tables)?;

        let tasks = plan_tables(tables, order, parent_keys)?;
        let referenced = referenced_columns(tables);
        let referenced_sets = referenced_tuples(tables);
        let mut report = GenerationReport::default();

        info!(
            tables = tasks.len(),
            seed = self.options.seed,
            "generation started"
        );

        for task in tasks {
            let table_start = Instant::now();
            let table = tables.get(&task.table).ok_or_else(|| {
                GenerationError::InvalidConfiguration(format!(
                    "table '{}' is not configured",
                    task.table
                ))
            })?;
            info!(table = %task.table, rows = task.rows, "generating table");

            let output = self.generate_table(table, task.rows, parent_keys, &mut report)?;
            let table_report = TableReport {
                table: task.table.clone(),
                rows_requested: task.rows,
                rows_generated: output.rows.len() as u64,
                retries: output.retries,
            };

            if let Some(table) = tables.get_mut(&task.table) {
                table.columns_order = output.columns;
                table.data = output.rows;
                if let Some(columns) = referenced.get(&task.table) {
                    parent_keys.ingest_table(table, columns);
                }
                if let Some(sets) = referenced_sets.get(&task.table) {
                    parent_keys.ingest_tuples(table, sets);
                }
            }

            info!(
                table = %table_report.table,
                rows_generated = table_report.rows_generated,
                retries = table_report.retries,
                duration_ms = table_start.elapsed().as_millis() as u64,
                "table generated"
            );
            report.record_table(table_report);
        }

        info!(
            event = "generation_finished",
            tables = report.tables.len(),
            rows = report.rows_generated(),
            retries = report.retries_total,
            duration_ms = start.elapsed().as_millis() as u64,
            "generation finished"
        );
        Ok(report)
    }

    /// Every rule that is not a foreign key must name a registered generator.
    fn check_generators(&self, tables: &TableConfigurations) -> Result<(), GenerationError> {
        for table in tables.values() {
            if table.is_populated_by_migration {
                continue;
            }
            for (column, rule) in &table.faker_schema {
                if rule.foreign_key.is_some() {
                    continue;
                }
                match rule.generator.as_deref() {
                    Some(id) if self.registry.contains(id) => {}
                    Some(id) => {
                        return Err(GenerationError::UnknownGenerator {
                            generator: id.to_string(),
                            table: table.name.clone(),
                            column: column.clone(),
                        });
                    }
                    None => {
                        return Err(GenerationError::InvalidConfiguration(format!(
                            "column {}.{column} declares neither generator nor foreign_key",
                            table.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn generate_table(
        &self,
        table: &TableConfiguration,
        rows: u64,
        parent_keys: &ParentKeys,
        report: &mut GenerationReport,
    ) -> Result<TableOutput, GenerationError> {
        let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(self.options.seed, &table.name));
        let columns = if table.columns_order.is_empty() {
            plan_columns_order(&table.faker_schema)
        } else {
            table.columns_order.clone()
        };

        let mut groups = Vec::new();
        for fk in table.composite_foreign_keys() {
            groups.push(ForeignGroup::plan(table, fk, rows, parent_keys, &mut rng)?);
        }
        let grouped: BTreeMap<String, usize> = groups
            .iter()
            .enumerate()
            .flat_map(|(index, group)| group.columns.iter().map(move |column| (column.clone(), index)))
            .collect();

        let mut sources = BTreeMap::new();
        for column in columns.iter().filter(|column| !grouped.contains_key(*column)) {
            if let Some(source) = ForeignSource::plan(table, column, rows, parent_keys, &mut rng)? {
                sources.insert(column.clone(), source);
            }
        }
        let round_robin = |column: &String| match grouped.get(column) {
            Some(index) => groups[*index].is_round_robin(),
            None => sources.get(column).is_some_and(ForeignSource::is_round_robin),
        };
        let dependents = null_dependents(table);
        let mut unique_sets: Vec<UniqueSet> = table
            .unique_tuples()
            .into_iter()
            .map(UniqueSet::new)
            .collect();

        let mut data: Vec<GeneratedRow> = Vec::with_capacity(rows as usize);
        let mut retries = 0_u64;

        for row_index in 0..rows {
            let mut presets = GeneratedRow::new();
            for group in &groups {
                let tuple = group.tuple_for(row_index as usize, &data, &mut rng);
                presets.extend(group.columns.iter().cloned().zip(tuple));
            }

            let mut row = GeneratedRow::new();
            for column in &columns {
                let value = self.column_value(
                    table, column, row_index, &row, &presets, &sources, &data, &mut rng, report,
                )?;
                row.insert(column.clone(), value);
            }

            let mut attempts = 0_u32;
            while let Some(collision) = first_collision(&unique_sets, &row) {
                let set = &unique_sets[collision];
                if attempts >= self.options.max_unique_retries {
                    return Err(GenerationError::UniqueExhausted {
                        table: table.name.clone(),
                        columns: set.columns.clone(),
                        attempts,
                    });
                }
                attempts += 1;
                retries += 1;

                // Round-robin keys are only redrawn when nothing else can move.
                let mut targets: BTreeSet<String> = set
                    .columns
                    .iter()
                    .filter(|column| !round_robin(*column))
                    .cloned()
                    .collect();
                let redraw_keys = targets.is_empty();
                if redraw_keys {
                    targets.extend(set.columns.iter().cloned());
                }

                // A composite key moves as a whole.
                let touched: BTreeSet<usize> = targets
                    .iter()
                    .filter_map(|column| grouped.get(column).copied())
                    .collect();
                for index in touched {
                    let group = &groups[index];
                    let tuple = group.random_tuple(&data, &mut rng);
                    presets.extend(group.columns.iter().cloned().zip(tuple));
                    targets.extend(group.columns.iter().cloned());
                }
                let targets = with_dependents(targets, &dependents);

                for column in columns.iter().filter(|column| targets.contains(*column)) {
                    let value = match sources.get(column) {
                        Some(source) if redraw_keys && source.is_round_robin() => {
                            source.random_value(&data, &mut rng)
                        }
                        _ => self.column_value(
                            table, column, row_index, &row, &presets, &sources, &data, &mut rng,
                            report,
                        )?,
                    };
                    row.insert(column.clone(), value);
                }
            }

            for set in &mut unique_sets {
                set.commit(&row);
            }
            data.push(row);
        }

        Ok(TableOutput {
            columns,
            rows: data,
            retries,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn column_value(
        &self,
        table: &TableConfiguration,
        column: &str,
        row_index: u64,
        row: &GeneratedRow,
        presets: &GeneratedRow,
        sources: &BTreeMap<String, ForeignSource<'_>>,
        previous: &[GeneratedRow],
        rng: &mut ChaCha8Rng,
        report: &mut GenerationReport,
    ) -> Result<GeneratedValue, GenerationError> {
        let Some(rule) = table.faker_schema.get(column) else {
            return Ok(GeneratedValue::Null);
        };

        if rule.has_null_condition()
            && rule
                .null_if_no
                .iter()
                .all(|sibling| !row.get(sibling).is_some_and(GeneratedValue::is_present))
        {
            return Ok(GeneratedValue::Null);
        }

        if let Some(value) = presets.get(column) {
            return Ok(value.clone());
        }
        if let Some(source) = sources.get(column) {
            return Ok(source.value_for(row_index as usize, previous, rng));
        }

        let Some(id) = rule.generator.as_deref() else {
            return Ok(GeneratedValue::Null);
        };
        let ctx = GeneratorContext {
            table: &table.name,
            column,
            row_index,
        };
        let value = self.registry.generate(id, &ctx, rule.params.as_ref(), rng)?;
        report.record_generator_usage(id);
        Ok(value)
    }
}

struct TableOutput {
    columns: Vec<String>,
    rows: Vec<GeneratedRow>,
    retries: u64,
}

/// Sibling column → columns whose `null_if_no` lists it.
fn null_dependents(table: &TableConfiguration) -> BTreeMap<String, Vec<String>> {
    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (column, rule) in &table.faker_schema {
        for sibling in &rule.null_if_no {
            dependents
                .entry(sibling.clone())
                .or_default()
                .push(column.clone());
        }
    }
    dependents
}

fn with_dependents(
    mut targets: BTreeSet<String>,
    dependents: &BTreeMap<String, Vec<String>>,
) -> BTreeSet<String> {
    let mut pending: Vec<String> = targets.iter().cloned().collect();
    while let Some(column) = pending.pop() {
        for dependent in dependents.get(&column).into_iter().flatten() {
            if targets.insert(dependent.clone()) {
                pending.push(dependent.clone());
            }
        }
    }
    targets
}

fn first_collision(sets: &[UniqueSet], row: &GeneratedRow) -> Option<usize> {
    sets.iter().position(|set| {
        set.key_for(row)
            .is_some_and(|key| set.seen.contains(&key))
    })
}

struct UniqueSet {
    columns: Vec<String>,
    seen: HashSet<Vec<String>>,
}

impl UniqueSet {
    fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            seen: HashSet::new(),
        }
    }

    /// Tuples holding a NULL never collide, as in SQL unique indexes.
    fn key_for(&self, row: &GeneratedRow) -> Option<Vec<String>> {
        let mut parts = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match row.get(column) {
                Some(value) if !value.is_null() => parts.push(value.key()),
                _ => return None,
            }
        }
        Some(parts)
    }

    fn commit(&mut self, row: &GeneratedRow) {
        if let Some(key) = self.key_for(row) {
            self.seen.insert(key);
        }
    }
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

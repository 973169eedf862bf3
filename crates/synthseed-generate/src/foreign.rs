use std::collections::{BTreeMap, BTreeSet};

use rand::seq::IndexedRandom;
use rand::seq::index::sample;
use rand::{Rng, RngCore};

use synthseed_core::{
    ForeignKey, GeneratedRow, GeneratedValue, TableConfiguration, TableConfigurations,
};

use crate::errors::GenerationError;

/// Key values available as foreign-key targets, per `(table, column)`.
///
/// Composite keys are kept as row-aligned tuples per `(table, columns)`.
#[derive(Debug, Default, Clone)]
pub struct ParentKeys {
    columns: BTreeMap<(String, String), Vec<GeneratedValue>>,
    tuples: BTreeMap<(String, Vec<String>), Vec<Vec<GeneratedValue>>>,
}

impl ParentKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        values: Vec<GeneratedValue>,
    ) {
        self.columns.insert((table.into(), column.into()), values);
    }

    pub fn get(&self, table: &str, column: &str) -> Option<&[GeneratedValue]> {
        self.columns
            .get(&(table.to_string(), column.to_string()))
            .map(Vec::as_slice)
    }

    pub fn insert_tuples(
        &mut self,
        table: impl Into<String>,
        columns: Vec<String>,
        tuples: Vec<Vec<GeneratedValue>>,
    ) {
        self.tuples.insert((table.into(), columns), tuples);
    }

    pub fn get_tuples(&self, table: &str, columns: &[String]) -> Option<&[Vec<GeneratedValue>]> {
        self.tuples
            .get(&(table.to_string(), columns.to_vec()))
            .map(Vec::as_slice)
    }

    /// Number of rows known for `table`, taken from its largest key column.
    pub fn row_count(&self, table: &str) -> Option<u64> {
        self.columns
            .iter()
            .filter(|((name, _), _)| name == table)
            .map(|(_, values)| values.len() as u64)
            .max()
    }

    /// Record the referenced columns of a freshly generated table.
    pub fn ingest_table(&mut self, table: &TableConfiguration, columns: &BTreeSet<String>) {
        for column in columns {
            self.insert(&table.name, column, table.column_values(column));
        }
    }

    /// Record row-aligned tuples of a freshly generated table. Rows with a
    /// NULL in the tuple cannot be referenced and are left out.
    pub fn ingest_tuples(&mut self, table: &TableConfiguration, column_sets: &BTreeSet<Vec<String>>) {
        for columns in column_sets {
            let tuples = table
                .data
                .iter()
                .filter_map(|row| {
                    columns
                        .iter()
                        .map(|column| row.get(column).filter(|value| !value.is_null()).cloned())
                        .collect::<Option<Vec<_>>>()
                })
                .collect();
            self.insert_tuples(&table.name, columns.clone(), tuples);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.tuples.is_empty()
    }
}

/// Parent table → columns that some rule references through `foreign_key`.
pub fn referenced_columns(tables: &TableConfigurations) -> BTreeMap<String, BTreeSet<String>> {
    let mut referenced: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for table in tables.values() {
        for rule in table.faker_schema.values() {
            if let Some(fk) = &rule.foreign_key {
                referenced
                    .entry(fk.table.clone())
                    .or_default()
                    .insert(fk.column.clone());
            }
        }
    }
    referenced
}

/// Parent table → column tuples referenced by composite foreign keys.
pub fn referenced_tuples(tables: &TableConfigurations) -> BTreeMap<String, BTreeSet<Vec<String>>> {
    let mut referenced: BTreeMap<String, BTreeSet<Vec<String>>> = BTreeMap::new();
    for table in tables.values() {
        for fk in table.composite_foreign_keys() {
            referenced
                .entry(fk.referenced_table.clone())
                .or_default()
                .insert(fk.referenced_columns.clone());
        }
    }
    referenced
}

/// Composite key tuples of migration-populated tables to read back before
/// generation.
pub fn migration_key_tuples(tables: &TableConfigurations) -> BTreeSet<(String, Vec<String>)> {
    referenced_tuples(tables)
        .into_iter()
        .filter(|(parent, _)| {
            tables
                .get(parent)
                .is_some_and(|table| table.is_populated_by_migration)
        })
        .flat_map(|(parent, sets)| sets.into_iter().map(move |columns| (parent.clone(), columns)))
        .collect()
}

/// Key columns of migration-populated tables that must be read back from the
/// database before generation.
///
/// Besides FK targets, a migration table used as a ratio parent contributes
/// the first column of its primary key so its row count is known.
pub fn migration_key_columns(tables: &TableConfigurations) -> BTreeSet<(String, String)> {
    let is_migration = |name: &str| {
        tables
            .get(name)
            .is_some_and(|table| table.is_populated_by_migration)
    };

    let mut keys = BTreeSet::new();
    for (parent, columns) in referenced_columns(tables) {
        if is_migration(&parent) {
            for column in columns {
                keys.insert((parent.clone(), column));
            }
        }
    }

    for table in tables.values() {
        let Some(ratio) = &table.parent_table_ratio else {
            continue;
        };
        if !is_migration(&ratio.table) || keys.iter().any(|(name, _)| *name == ratio.table) {
            continue;
        }
        if let Some(column) = tables
            .get(&ratio.table)
            .and_then(|parent| parent.primary_key.as_ref())
            .and_then(|pk| pk.first())
        {
            keys.insert((ratio.table.clone(), column.clone()));
        }
    }
    keys
}

/// How one foreign-key column of a table obtains its values.
#[derive(Debug)]
pub(crate) enum ForeignSource<'a> {
    /// Ratio parent: every key is used once per full cycle, the remainder
    /// goes to a random sample of distinct keys.
    RoundRobin {
        keys: &'a [GeneratedValue],
        assignment: Vec<usize>,
    },
    Uniform {
        keys: &'a [GeneratedValue],
    },
    /// A random earlier row of the same table; the first row gets NULL.
    SelfReference { column: String },
}

impl<'a> ForeignSource<'a> {
    pub(crate) fn plan(
        table: &TableConfiguration,
        column: &str,
        rows: u64,
        parent_keys: &'a ParentKeys,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Self>, GenerationError> {
        let Some(fk) = table
            .faker_schema
            .get(column)
            .and_then(|rule| rule.foreign_key.as_ref())
        else {
            return Ok(None);
        };

        if fk.table == table.name {
            return Ok(Some(ForeignSource::SelfReference {
                column: fk.column.clone(),
            }));
        }

        let keys = parent_keys.get(&fk.table, &fk.column).unwrap_or_default();
        if keys.is_empty() && rows > 0 {
            return Err(GenerationError::MissingParentKeys {
                table: table.name.clone(),
                column: column.to_string(),
                parent: fk.table.clone(),
                parent_column: fk.column.clone(),
            });
        }

        let ratio_parent = table
            .parent_table_ratio
            .as_ref()
            .is_some_and(|ratio| ratio.table == fk.table);
        if ratio_parent {
            let assignment = round_robin_assignment(rows as usize, keys.len(), rng);
            Ok(Some(ForeignSource::RoundRobin { keys, assignment }))
        } else {
            Ok(Some(ForeignSource::Uniform { keys }))
        }
    }

    pub(crate) fn is_round_robin(&self) -> bool {
        matches!(self, ForeignSource::RoundRobin { .. })
    }

    /// Value for `row_index`, following the planned policy.
    pub(crate) fn value_for(
        &self,
        row_index: usize,
        previous: &[GeneratedRow],
        rng: &mut dyn RngCore,
    ) -> GeneratedValue {
        match self {
            ForeignSource::RoundRobin { keys, assignment } => assignment
                .get(row_index)
                .and_then(|index| keys.get(*index))
                .cloned()
                .unwrap_or(GeneratedValue::Null),
            ForeignSource::Uniform { .. } | ForeignSource::SelfReference { .. } => {
                self.random_value(previous, rng)
            }
        }
    }

    /// Uniform pick, used as well when a round-robin value must be redrawn.
    pub(crate) fn random_value(
        &self,
        previous: &[GeneratedRow],
        rng: &mut dyn RngCore,
    ) -> GeneratedValue {
        match self {
            ForeignSource::RoundRobin { keys, .. } | ForeignSource::Uniform { keys } => keys
                .choose(&mut *rng)
                .cloned()
                .unwrap_or(GeneratedValue::Null),
            ForeignSource::SelfReference { column } => {
                if previous.is_empty() {
                    return GeneratedValue::Null;
                }
                let index = rng.random_range(0..previous.len());
                previous[index]
                    .get(column)
                    .cloned()
                    .unwrap_or(GeneratedValue::Null)
            }
        }
    }
}

/// Columns of one composite foreign key, filled together from a single
/// parent row.
#[derive(Debug)]
pub(crate) struct ForeignGroup<'a> {
    pub(crate) columns: Vec<String>,
    policy: GroupPolicy<'a>,
}

#[derive(Debug)]
enum GroupPolicy<'a> {
    RoundRobin {
        tuples: &'a [Vec<GeneratedValue>],
        assignment: Vec<usize>,
    },
    Uniform {
        tuples: &'a [Vec<GeneratedValue>],
    },
    /// Referenced columns of a random earlier row; all NULL for the first.
    SelfReference { referenced: Vec<String> },
}

impl<'a> ForeignGroup<'a> {
    pub(crate) fn plan(
        table: &TableConfiguration,
        fk: &ForeignKey,
        rows: u64,
        parent_keys: &'a ParentKeys,
        rng: &mut dyn RngCore,
    ) -> Result<Self, GenerationError> {
        let columns = fk.columns.clone();
        if fk.is_self_reference(&table.name) {
            return Ok(Self {
                columns,
                policy: GroupPolicy::SelfReference {
                    referenced: fk.referenced_columns.clone(),
                },
            });
        }

        let tuples = parent_keys
            .get_tuples(&fk.referenced_table, &fk.referenced_columns)
            .unwrap_or_default();
        if tuples.is_empty() && rows > 0 {
            return Err(GenerationError::MissingParentKeys {
                table: table.name.clone(),
                column: columns.join(", "),
                parent: fk.referenced_table.clone(),
                parent_column: fk.referenced_columns.join(", "),
            });
        }

        let ratio_parent = table
            .parent_table_ratio
            .as_ref()
            .is_some_and(|ratio| ratio.table == fk.referenced_table);
        let policy = if ratio_parent {
            GroupPolicy::RoundRobin {
                tuples,
                assignment: round_robin_assignment(rows as usize, tuples.len(), rng),
            }
        } else {
            GroupPolicy::Uniform { tuples }
        };
        Ok(Self { columns, policy })
    }

    pub(crate) fn is_round_robin(&self) -> bool {
        matches!(self.policy, GroupPolicy::RoundRobin { .. })
    }

    pub(crate) fn tuple_for(
        &self,
        row_index: usize,
        previous: &[GeneratedRow],
        rng: &mut dyn RngCore,
    ) -> Vec<GeneratedValue> {
        match &self.policy {
            GroupPolicy::RoundRobin { tuples, assignment } => assignment
                .get(row_index)
                .and_then(|index| tuples.get(*index))
                .cloned()
                .unwrap_or_else(|| self.nulls()),
            GroupPolicy::Uniform { .. } | GroupPolicy::SelfReference { .. } => {
                self.random_tuple(previous, rng)
            }
        }
    }

    pub(crate) fn random_tuple(
        &self,
        previous: &[GeneratedRow],
        rng: &mut dyn RngCore,
    ) -> Vec<GeneratedValue> {
        match &self.policy {
            GroupPolicy::RoundRobin { tuples, .. } | GroupPolicy::Uniform { tuples } => tuples
                .choose(&mut *rng)
                .cloned()
                .unwrap_or_else(|| self.nulls()),
            GroupPolicy::SelfReference { referenced } => {
                if previous.is_empty() {
                    return self.nulls();
                }
                let row = &previous[rng.random_range(0..previous.len())];
                let tuple: Option<Vec<GeneratedValue>> = referenced
                    .iter()
                    .map(|column| row.get(column).filter(|value| !value.is_null()).cloned())
                    .collect();
                tuple.unwrap_or_else(|| self.nulls())
            }
        }
    }

    fn nulls(&self) -> Vec<GeneratedValue> {
        vec![GeneratedValue::Null; self.columns.len()]
    }
}

/// Parent index for each of `rows` rows over `keys` parent keys.
pub(crate) fn round_robin_assignment(rows: usize, keys: usize, rng: &mut dyn RngCore) -> Vec<usize> {
    if keys == 0 {
        return Vec::new();
    }
    let full_cycles = rows / keys;
    let remainder = rows % keys;

    let mut assignment = Vec::with_capacity(rows);
    for _ in 0..full_cycles {
        assignment.extend(0..keys);
    }
    assignment.extend(sample(&mut *rng, keys, remainder).into_iter());
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use synthseed_core::{ForeignKeyRef, GenerationRule};

    fn fk(table: &str, column: &str) -> GenerationRule {
        GenerationRule {
            foreign_key: Some(ForeignKeyRef {
                table: table.to_string(),
                column: column.to_string(),
            }),
            ..GenerationRule::default()
        }
    }

    fn counts(assignment: &[usize], keys: usize) -> Vec<usize> {
        let mut counts = vec![0; keys];
        for index in assignment {
            counts[*index] += 1;
        }
        counts
    }

    #[test]
    fn round_robin_covers_every_key_per_cycle() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let assignment = round_robin_assignment(9, 3, &mut rng);
        assert_eq!(counts(&assignment, 3), vec![3, 3, 3]);
    }

    #[test]
    fn remainder_uses_distinct_keys() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let assignment = round_robin_assignment(7, 3, &mut rng);
        let counts = counts(&assignment, 3);
        assert_eq!(counts.iter().sum::<usize>(), 7);
        assert!(counts.iter().all(|count| *count == 2 || *count == 3));
    }

    #[test]
    fn ratio_below_one_never_repeats_a_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let assignment = round_robin_assignment(2, 5, &mut rng);
        assert_eq!(assignment.len(), 2);
        assert_ne!(assignment[0], assignment[1]);
    }

    #[test]
    fn missing_parent_keys_fail() {
        let table = TableConfiguration::new("cities")
            .with_amount(2)
            .with_rule("country_id", fk("countries", "id"));
        let keys = ParentKeys::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let err = ForeignSource::plan(&table, "country_id", 2, &keys, &mut rng)
            .expect_err("no keys");
        assert!(matches!(err, GenerationError::MissingParentKeys { .. }));
    }

    #[test]
    fn self_reference_first_row_is_null() {
        let source = ForeignSource::SelfReference {
            column: "id".to_string(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(source.value_for(0, &[], &mut rng).is_null());

        let previous = vec![GeneratedRow::from([("id".to_string(), GeneratedValue::Int(7))])];
        assert_eq!(
            source.value_for(1, &previous, &mut rng),
            GeneratedValue::Int(7)
        );
    }

    #[test]
    fn migration_ratio_parent_uses_primary_key() {
        let tables: TableConfigurations = [
            TableConfiguration::new("roles")
                .populated_by_migration()
                .with_primary_key(&["code"]),
            TableConfiguration::new("grants").with_ratio("roles", 2.0),
        ]
        .into_iter()
        .map(|table| (table.name.clone(), table))
        .collect();

        assert_eq!(
            migration_key_columns(&tables),
            BTreeSet::from([("roles".to_string(), "code".to_string())])
        );
    }
}

use std::collections::BTreeMap;

use synthseed_core::TableConfigurations;

use crate::errors::GenerationError;
use crate::foreign::ParentKeys;

/// Planned generation task for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    pub table: String,
    pub rows: u64,
}

/// Resolve row counts for every generated table, in `order`.
///
/// A declared `amount` wins; otherwise the count is `round(n · ratio)` where
/// `n` is the ratio parent's planned row count, or the number of keys loaded
/// for a migration-populated parent. The resolved count is written back to
/// `amount`.
pub fn plan_tables(
    tables: &mut TableConfigurations,
    order: &[String],
    parent_keys: &ParentKeys,
) -> Result<Vec<GenerationTask>, GenerationError> {
    let mut rows_by_table: BTreeMap<String, u64> = BTreeMap::new();
    let mut tasks = Vec::new();

    for name in order {
        let table = tables.get(name).ok_or_else(|| {
            GenerationError::InvalidConfiguration(format!("table '{name}' is not configured"))
        })?;

        if table.is_populated_by_migration {
            let rows = parent_keys.row_count(name).unwrap_or(0);
            rows_by_table.insert(name.clone(), rows);
            continue;
        }

        let rows = match (table.amount, &table.parent_table_ratio) {
            (Some(amount), _) => amount,
            (None, Some(ratio)) => {
                let parent_rows = rows_by_table.get(&ratio.table).copied().ok_or_else(|| {
                    GenerationError::InvalidConfiguration(format!(
                        "ratio parent '{}' of '{name}' is not sized before it",
                        ratio.table
                    ))
                })?;
                if parent_rows == 0 {
                    tracing::warn!(
                        table = %name,
                        parent = %ratio.table,
                        "ratio parent has no rows"
                    );
                }
                (parent_rows as f64 * ratio.ratio).round() as u64
            }
            (None, None) => {
                return Err(GenerationError::InvalidConfiguration(format!(
                    "table '{name}' declares neither amount nor parent_table_ratio"
                )));
            }
        };

        rows_by_table.insert(name.clone(), rows);
        tasks.push(GenerationTask {
            table: name.clone(),
            rows,
        });
    }

    for task in &tasks {
        if let Some(table) = tables.get_mut(&task.table) {
            table.amount = Some(task.rows);
        }
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthseed_core::{GeneratedValue, TableConfiguration};

    fn configs(items: Vec<TableConfiguration>) -> TableConfigurations {
        items
            .into_iter()
            .map(|table| (table.name.clone(), table))
            .collect()
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn ratio_multiplies_parent_rows() {
        let mut tables = configs(vec![
            TableConfiguration::new("countries").with_amount(3),
            TableConfiguration::new("cities").with_ratio("countries", 3.0),
            TableConfiguration::new("streets").with_ratio("cities", 0.5),
        ]);
        let tasks = plan_tables(
            &mut tables,
            &order(&["countries", "cities", "streets"]),
            &ParentKeys::new(),
        )
        .expect("plan");

        let rows: Vec<u64> = tasks.iter().map(|task| task.rows).collect();
        assert_eq!(rows, vec![3, 9, 5]);
        assert_eq!(tables["cities"].amount, Some(9));
    }

    #[test]
    fn migration_parent_counts_loaded_keys() {
        let mut tables = configs(vec![
            TableConfiguration::new("roles").populated_by_migration(),
            TableConfiguration::new("users").with_ratio("roles", 2.0),
        ]);
        let mut keys = ParentKeys::new();
        keys.insert(
            "roles",
            "id",
            vec![GeneratedValue::Int(1), GeneratedValue::Int(2)],
        );

        let tasks = plan_tables(&mut tables, &order(&["roles", "users"]), &keys).expect("plan");
        assert_eq!(
            tasks,
            vec![GenerationTask {
                table: "users".to_string(),
                rows: 4
            }]
        );
    }

    #[test]
    fn unsized_parent_is_rejected() {
        let mut tables = configs(vec![
            TableConfiguration::new("countries").with_amount(3),
            TableConfiguration::new("cities").with_ratio("countries", 3.0),
        ]);
        let err = plan_tables(&mut tables, &order(&["cities", "countries"]), &ParentKeys::new())
            .expect_err("parent after child");
        assert!(matches!(err, GenerationError::InvalidConfiguration(_)));
    }
}

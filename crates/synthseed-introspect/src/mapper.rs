use std::collections::BTreeMap;

use synthseed_core::{ConstraintSet, ForeignKey};
use synthseed_db::DataRow;

use crate::adapter::columns;

struct KeyColumn {
    position: u32,
    column: String,
    referenced_table: Option<String>,
    referenced_column: Option<String>,
}

/// Fold catalog rows into a constraint set.
///
/// Rows are grouped per constraint and ordered by their position inside it.
/// Rows without a column name or with an unknown kind are ignored.
pub fn map_constraints(rows: &[DataRow]) -> ConstraintSet {
    let mut grouped: BTreeMap<(String, String), Vec<KeyColumn>> = BTreeMap::new();
    for row in rows {
        let (Some(kind), Some(column)) = (row.get(columns::KIND), row.get(columns::COLUMN_NAME))
        else {
            continue;
        };
        let name = row.get(columns::CONSTRAINT_NAME).unwrap_or_default();
        grouped
            .entry((kind.to_string(), name.to_string()))
            .or_default()
            .push(KeyColumn {
                position: row
                    .get(columns::POSITION)
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(u32::MAX),
                column: column.to_string(),
                referenced_table: row.get(columns::REFERENCED_TABLE).map(str::to_string),
                referenced_column: row.get(columns::REFERENCED_COLUMN).map(str::to_string),
            });
    }

    let mut set = ConstraintSet::default();
    for ((kind, name), mut key_columns) in grouped {
        key_columns.sort_by_key(|key| key.position);
        let names: Vec<String> = key_columns.iter().map(|key| key.column.clone()).collect();
        match kind.as_str() {
            "p" => set.primary_key = Some(names),
            "u" => {
                set.unique_indexes.insert(names);
            }
            "f" => {
                let Some(referenced_table) = key_columns
                    .iter()
                    .find_map(|key| key.referenced_table.clone())
                else {
                    continue;
                };
                set.foreign_keys.push(ForeignKey {
                    name: (!name.is_empty()).then_some(name),
                    columns: names,
                    referenced_table,
                    referenced_columns: key_columns
                        .iter()
                        .filter_map(|key| key.referenced_column.clone())
                        .collect(),
                });
            }
            _ => {}
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, name: &str, column: &str, position: &str) -> DataRow {
        DataRow::new()
            .with(columns::KIND, Some(kind))
            .with(columns::CONSTRAINT_NAME, Some(name))
            .with(columns::COLUMN_NAME, Some(column))
            .with(columns::POSITION, Some(position))
    }

    fn fk_row(name: &str, column: &str, position: &str, table: &str, target: &str) -> DataRow {
        row("f", name, column, position)
            .with(columns::REFERENCED_TABLE, Some(table))
            .with(columns::REFERENCED_COLUMN, Some(target))
    }

    #[test]
    fn maps_composite_keys_in_position_order() {
        let rows = vec![
            row("p", "pk", "b", "2"),
            row("p", "pk", "a", "1"),
            row("u", "uq_email", "email", "1"),
            row("u", "uq_pair", "y", "10"),
            row("u", "uq_pair", "x", "9"),
        ];
        let set = map_constraints(&rows);
        assert_eq!(set.primary_key, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(set.unique_indexes.contains(&vec!["email".to_string()]));
        assert!(
            set.unique_indexes
                .contains(&vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn maps_foreign_keys() {
        let rows = vec![
            fk_row("fk_city_country", "country_id", "1", "countries", "id"),
            fk_row("fk_pair", "b_id", "2", "pairs", "b"),
            fk_row("fk_pair", "a_id", "1", "pairs", "a"),
        ];
        let set = map_constraints(&rows);
        assert_eq!(set.foreign_keys.len(), 2);
        let pair = set
            .foreign_keys
            .iter()
            .find(|fk| fk.name.as_deref() == Some("fk_pair"))
            .expect("composite fk");
        assert_eq!(pair.columns, vec!["a_id".to_string(), "b_id".to_string()]);
        assert_eq!(pair.referenced_columns, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn ignores_incomplete_rows() {
        let rows = vec![
            DataRow::new().with(columns::KIND, Some("p")),
            row("x", "check", "a", "1"),
            row("f", "dangling", "a", "1"),
        ];
        assert!(map_constraints(&rows).is_empty());
    }
}

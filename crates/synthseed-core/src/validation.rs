use crate::columns::null_condition_cycle;
use crate::error::{Error, Result};
use crate::schema::TableConfigurations;

/// Validate internal consistency of the per-table configuration.
///
/// This checks:
/// - every rule declares a generator or a foreign key
/// - foreign key and ratio targets are configured tables
/// - `null_if_no` siblings exist in the same faker schema and do not form
///   a cycle
/// - non-migration tables declare exactly one of amount and parent ratio
/// - ratios are positive and finite
pub fn validate_configuration(tables: &TableConfigurations) -> Result<()> {
    if tables.is_empty() {
        return Err(Error::InvalidConfiguration(
            "no table configuration found".to_string(),
        ));
    }

    for (name, table) in tables {
        if table.is_populated_by_migration {
            continue;
        }

        if table.amount.is_none() && table.parent_table_ratio.is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "table '{name}' declares neither amount nor parent_table_ratio"
            )));
        }
        if table.amount.is_some() && table.parent_table_ratio.is_some() {
            return Err(Error::InvalidConfiguration(format!(
                "table '{name}' declares both amount and parent_table_ratio"
            )));
        }

        if let Some(ratio) = &table.parent_table_ratio {
            if !ratio.ratio.is_finite() || ratio.ratio <= 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "table '{name}' has invalid ratio {}",
                    ratio.ratio
                )));
            }
            if ratio.table == *name {
                return Err(Error::InvalidConfiguration(format!(
                    "table '{name}' cannot be sized relative to itself"
                )));
            }
            if !tables.contains_key(&ratio.table) {
                return Err(Error::InvalidConfiguration(format!(
                    "ratio parent not found: {name} -> {}",
                    ratio.table
                )));
            }
        }

        for (column, rule) in &table.faker_schema {
            if rule.generator.is_none() && rule.foreign_key.is_none() {
                return Err(Error::InvalidConfiguration(format!(
                    "column {name}.{column} declares neither generator nor foreign_key"
                )));
            }

            if let Some(fk) = &rule.foreign_key {
                let parent = tables.get(&fk.table).ok_or_else(|| {
                    Error::InvalidConfiguration(format!(
                        "referenced table not found: {name}.{column} -> {}",
                        fk.table
                    ))
                })?;
                if !parent.is_populated_by_migration
                    && !parent.faker_schema.contains_key(&fk.column)
                {
                    return Err(Error::InvalidConfiguration(format!(
                        "referenced column not generated: {}.{}",
                        fk.table, fk.column
                    )));
                }
            }

            for sibling in &rule.null_if_no {
                if sibling == column || !table.faker_schema.contains_key(sibling) {
                    return Err(Error::InvalidConfiguration(format!(
                        "null_if_no column not found: {name}.{column} -> {sibling}"
                    )));
                }
            }
        }

        let cycle = null_condition_cycle(&table.faker_schema);
        if !cycle.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "null_if_no cycle in table '{name}': {}",
                cycle.join(", ")
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ForeignKeyRef, GenerationRule, TableConfiguration};

    fn generator(id: &str) -> GenerationRule {
        GenerationRule {
            generator: Some(id.to_string()),
            ..GenerationRule::default()
        }
    }

    fn fk(table: &str, column: &str) -> GenerationRule {
        GenerationRule {
            foreign_key: Some(ForeignKeyRef {
                table: table.to_string(),
                column: column.to_string(),
            }),
            ..GenerationRule::default()
        }
    }

    fn configs(items: Vec<TableConfiguration>) -> TableConfigurations {
        items
            .into_iter()
            .map(|table| (table.name.clone(), table))
            .collect()
    }

    #[test]
    fn accepts_parent_and_child() {
        let tables = configs(vec![
            TableConfiguration::new("countries")
                .with_amount(3)
                .with_rule("id", generator("int.sequence")),
            TableConfiguration::new("cities")
                .with_ratio("countries", 3.0)
                .with_rule("id", generator("int.sequence"))
                .with_rule("country_id", fk("countries", "id")),
        ]);
        validate_configuration(&tables).expect("valid configuration");
    }

    #[test]
    fn rejects_missing_parent() {
        let tables = configs(vec![
            TableConfiguration::new("cities")
                .with_amount(1)
                .with_rule("country_id", fk("countries", "id")),
        ]);
        let err = validate_configuration(&tables).expect_err("missing parent");
        assert!(err.to_string().contains("referenced table not found"));
    }

    #[test]
    fn migration_parents_need_no_faker_schema() {
        let tables = configs(vec![
            TableConfiguration::new("roles").populated_by_migration(),
            TableConfiguration::new("users")
                .with_amount(2)
                .with_rule("role_id", fk("roles", "id")),
        ]);
        validate_configuration(&tables).expect("migration parent is a valid target");
    }

    #[test]
    fn rejects_unknown_null_condition() {
        let mut rule = generator("text");
        rule.null_if_no = vec!["missing".to_string()];
        let tables = configs(vec![
            TableConfiguration::new("users")
                .with_amount(1)
                .with_rule("nickname", rule),
        ]);
        assert!(validate_configuration(&tables).is_err());
    }

    #[test]
    fn rejects_table_without_size() {
        let tables = configs(vec![
            TableConfiguration::new("users").with_rule("id", generator("uuid")),
        ]);
        assert!(validate_configuration(&tables).is_err());
    }

    #[test]
    fn rejects_amount_with_ratio() {
        let tables = configs(vec![
            TableConfiguration::new("countries").with_amount(1),
            TableConfiguration::new("cities")
                .with_amount(4)
                .with_ratio("countries", 2.0),
        ]);
        let err = validate_configuration(&tables).expect_err("amount and ratio");
        assert!(err.to_string().contains("both amount and parent_table_ratio"));
    }

    #[test]
    fn rejects_null_condition_cycle() {
        let conditional = |sibling: &str| GenerationRule {
            null_if_no: vec![sibling.to_string()],
            ..generator("text")
        };
        let tables = configs(vec![
            TableConfiguration::new("addresses")
                .with_amount(1)
                .with_rule("unit", conditional("floor"))
                .with_rule("floor", conditional("unit")),
        ]);
        let err = validate_configuration(&tables).expect_err("cycle");
        assert!(err.to_string().contains("null_if_no cycle"));
    }

    #[test]
    fn rejects_non_positive_ratio() {
        let tables = configs(vec![
            TableConfiguration::new("countries").with_amount(1),
            TableConfiguration::new("cities").with_ratio("countries", 0.0),
        ]);
        assert!(validate_configuration(&tables).is_err());
    }
}

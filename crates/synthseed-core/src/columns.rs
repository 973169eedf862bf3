use std::collections::BTreeSet;

use crate::schema::FakerSchema;

/// Order a faker schema so conditional-null columns come last.
///
/// Columns without `null_if_no` keep their declared order and precede every
/// column carrying a null condition. Conditional columns are ordered so each
/// follows the conditional siblings it names, declared order breaking ties.
/// Null conditions therefore always observe already-assigned sibling values.
///
/// Columns caught in a `null_if_no` cycle cannot be ordered; they are
/// appended in declared order and reported by [`null_condition_cycle`].
pub fn plan_columns_order(faker_schema: &FakerSchema) -> Vec<String> {
    let mut order: Vec<String> = faker_schema
        .iter()
        .filter(|(_, rule)| !rule.has_null_condition())
        .map(|(column, _)| column.clone())
        .collect();

    let (placed, blocked) = order_conditional(faker_schema);
    order.extend(placed);
    order.extend(blocked);
    order
}

/// Conditional columns whose `null_if_no` siblings depend on them in turn.
///
/// Empty when every null condition can be evaluated after its siblings.
pub fn null_condition_cycle(faker_schema: &FakerSchema) -> Vec<String> {
    order_conditional(faker_schema).1
}

/// Stable Kahn-style pass over the conditional columns: repeatedly place the
/// first declared column whose conditional siblings are all placed.
fn order_conditional(faker_schema: &FakerSchema) -> (Vec<String>, Vec<String>) {
    let mut pending: Vec<(&String, Vec<&String>)> = faker_schema
        .iter()
        .filter(|(_, rule)| rule.has_null_condition())
        .map(|(column, rule)| {
            let waits_on = rule
                .null_if_no
                .iter()
                .filter(|sibling| {
                    *sibling != column
                        && faker_schema
                            .get(*sibling)
                            .is_some_and(|rule| rule.has_null_condition())
                })
                .collect();
            (column, waits_on)
        })
        .collect();

    let mut placed_set: BTreeSet<&String> = BTreeSet::new();
    let mut placed = Vec::with_capacity(pending.len());
    while let Some(position) = pending
        .iter()
        .position(|(_, waits_on)| waits_on.iter().all(|sibling| placed_set.contains(sibling)))
    {
        let (column, _) = pending.remove(position);
        placed_set.insert(column);
        placed.push(column.clone());
    }

    let blocked = pending
        .into_iter()
        .map(|(column, _)| column.clone())
        .collect();
    (placed, blocked)
}

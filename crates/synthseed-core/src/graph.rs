use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::columns::plan_columns_order;
use crate::error::{Error, Result};
use crate::schema::TableConfigurations;

/// Summary of FK graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Report for FK dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphReport {
    pub summary: FkGraphSummary,
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Directed graph with one edge child → parent per dependency.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    parents: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: &TableConfigurations) -> Self {
        let mut graph = Self::new();
        for table in tables.values() {
            graph.add_node(&table.name);
            for parent in table.parent_tables() {
                graph.add_edge(&table.name, &parent);
            }
        }
        graph
    }

    pub fn add_node(&mut self, table: &str) {
        self.parents.entry(table.to_string()).or_default();
    }

    /// Record that `child` depends on `parent`. Self-references are ignored.
    pub fn add_edge(&mut self, child: &str, parent: &str) {
        self.add_node(parent);
        if child == parent {
            self.add_node(child);
            return;
        }
        self.parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
    }

    pub fn parents_of(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.parents.get(table)
    }

    pub fn summary(&self) -> FkGraphSummary {
        FkGraphSummary {
            nodes: self.parents.len(),
            edges: self.parents.values().map(BTreeSet::len).sum(),
        }
    }

    /// Every table that directly or transitively depends on `table`.
    pub fn descendants_of(&self, table: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut frontier = vec![table.to_string()];
        while let Some(current) = frontier.pop() {
            for (child, parents) in &self.parents {
                if parents.contains(&current) && found.insert(child.clone()) {
                    frontier.push(child.clone());
                }
            }
        }
        found
    }

    /// Depth-first topological sort: parents always precede their children.
    ///
    /// Roots are visited in lexicographic order so the result is stable.
    /// On a cycle the offending path is returned, closed on its first node.
    pub fn topological_order(&self) -> std::result::Result<Vec<String>, Vec<String>> {
        let mut marks: BTreeMap<&str, Mark> = self
            .parents
            .keys()
            .map(|name| (name.as_str(), Mark::Unvisited))
            .collect();
        let mut order = Vec::with_capacity(self.parents.len());
        let mut path = Vec::new();

        for name in self.parents.keys() {
            self.visit(name, &mut marks, &mut path, &mut order)?;
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> std::result::Result<(), Vec<String>> {
        match marks.get(name).copied().unwrap_or(Mark::Unvisited) {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = path.iter().position(|item| *item == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(name.to_string());
                return Err(cycle);
            }
            Mark::Unvisited => {}
        }

        marks.insert(name, Mark::InProgress);
        path.push(name);

        if let Some(parents) = self.parents.get(name) {
            for parent in parents {
                self.visit(parent, marks, path, order)?;
            }
        }

        path.pop();
        marks.insert(name, Mark::Done);
        if !order.iter().any(|item| item == name) {
            order.push(name.to_string());
        }
        Ok(())
    }
}

/// Build a deterministic FK dependency report for the configured tables.
pub fn build_fk_graph_report(tables: &TableConfigurations) -> FkGraphReport {
    let graph = DependencyGraph::from_tables(tables);
    let summary = graph.summary();

    match graph.topological_order() {
        Ok(order) => FkGraphReport {
            summary,
            topo_order: Some(order),
            cycle: None,
        },
        Err(cycle) => FkGraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle),
        },
    }
}

/// Resolve the generation/insertion order and each table's column order.
pub fn resolve(tables: &mut TableConfigurations) -> Result<Vec<String>> {
    let graph = DependencyGraph::from_tables(tables);
    let order = graph.topological_order().map_err(Error::DependencyCycle)?;

    for table in tables.values_mut() {
        table.columns_order = plan_columns_order(&table.faker_schema);
    }

    Ok(order
        .into_iter()
        .filter(|name| tables.contains_key(name))
        .collect())
}

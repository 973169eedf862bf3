//! Core contracts and helpers for synthseed.
//!
//! This crate defines the per-table configuration model, the generated value
//! type, the dependency resolver and the column planner shared by the
//! database, generation and CLI crates.

pub mod columns;
pub mod connection;
pub mod constraints;
pub mod error;
pub mod graph;
pub mod schema;
pub mod types;
pub mod validation;

pub use columns::{null_condition_cycle, plan_columns_order};
pub use connection::{ConnectionConfig, ConnectionDocument, ConnectionParams, Vendor};
pub use constraints::{ConstraintSet, ForeignKey};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, FkGraphReport, FkGraphSummary, build_fk_graph_report, resolve};
pub use schema::{
    FakerSchema, ForeignKeyRef, GeneratedRow, GenerationRule, ParentTableRatio, TableConfiguration,
    TableConfigurations, TableDocument,
};
pub use types::{GeneratedValue, KeyKind};
pub use validation::validate_configuration;

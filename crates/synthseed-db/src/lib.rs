//! Vendor-agnostic database access for synthseed.
//!
//! A [`DbAccess`] owns one lazily created, bounded client pool for the vendor
//! selected at startup. Introspection, key loading and the insertion pipeline
//! all go through [`DbAccess::query`].

pub mod access;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod insert;
pub mod keys;
pub mod memory;
pub mod mysql;
pub mod postgres;

pub use access::{Client, DbAccess, FailureMode, Query, QueryOutcome};
pub use driver::{ClientPool, DataRow, Driver, QueryData, Session, driver_for};
pub use error::{DbError, DbResult};
pub use insert::{InsertOptions, InsertReport, InsertStatus, TableInsertReport, insert_tables};
pub use keys::{fetch_existing_key_tuples, fetch_existing_keys};
pub use memory::{MemoryDriver, MemoryResponse, RecordedStatement};

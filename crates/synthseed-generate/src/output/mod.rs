use std::path::{Path, PathBuf};

use tracing::info;

use synthseed_core::TableConfigurations;

use crate::errors::GenerationError;

pub mod csv;

pub use self::csv::write_table_csv;

/// Write one `<table>.csv` per generated table into `dir`, in `order`.
///
/// Migration-populated tables hold no generated rows and are skipped.
pub fn write_tables_csv(
    dir: &Path,
    tables: &TableConfigurations,
    order: &[String],
) -> Result<Vec<PathBuf>, GenerationError> {
    std::fs::create_dir_all(dir)?;

    let mut paths = Vec::new();
    for name in order {
        let Some(table) = tables.get(name) else {
            continue;
        };
        if table.is_populated_by_migration {
            continue;
        }
        let path = dir.join(format!("{name}.csv"));
        let bytes = write_table_csv(&path, table)?;
        info!(table = %name, path = %path.display(), bytes, "csv written");
        paths.push(path);
    }
    Ok(paths)
}

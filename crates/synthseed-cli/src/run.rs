use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use synthseed_core::{ConnectionConfig, TableConfigurations, resolve, validate_configuration};
use synthseed_db::{
    DbAccess, InsertOptions, InsertReport, MemoryDriver, fetch_existing_key_tuples,
    fetch_existing_keys, insert_tables,
};
use synthseed_generate::{
    DEFAULT_MAX_UNIQUE_RETRIES, GenerateOptions, GenerationEngine, GenerationReport, ParentKeys,
    migration_key_columns, migration_key_tuples, write_tables_csv,
};
use synthseed_introspect::{IntrospectOptions, introspect_constraints};

use crate::config::{load_connection, load_tables};
use crate::error::RunResult;

/// Options of a `seed` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub base_dir: PathBuf,
    pub seed: u64,
    pub strict_introspection: bool,
    pub max_unique_retries: u32,
    pub max_rows_per_batch: Option<usize>,
    pub emit_csv: bool,
    /// Statements go to an in-memory driver instead of the database.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            seed: 0,
            strict_introspection: false,
            max_unique_retries: DEFAULT_MAX_UNIQUE_RETRIES,
            max_rows_per_batch: None,
            emit_csv: false,
            dry_run: false,
        }
    }
}

/// State of one run, threaded through every stage.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub options: RunOptions,
    pub connection: ConnectionConfig,
    pub tables: TableConfigurations,
    pub access: DbAccess,
}

impl RunContext {
    pub fn new(
        options: RunOptions,
        connection: ConnectionConfig,
        tables: TableConfigurations,
        access: DbAccess,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            options,
            connection,
            tables,
            access,
        }
    }

    /// Read the configuration under `options.base_dir` and pick the driver.
    pub fn load(options: RunOptions) -> RunResult<Self> {
        let connection = load_connection(&options.base_dir)?;
        let tables = load_tables(&options.base_dir)?;
        let access = if options.dry_run {
            DbAccess::with_driver(
                connection.clone(),
                Arc::new(MemoryDriver::new(connection.vendor)),
            )
        } else {
            DbAccess::connect_lazy(connection.clone())
        };
        Ok(Self::new(options, connection, tables, access))
    }
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub order: Vec<String>,
    pub generation: GenerationReport,
    pub insertion: InsertReport,
    pub csv_files: Vec<PathBuf>,
    pub failed_introspection: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.insertion.is_complete()
    }
}

/// Run every stage: validate, introspect, resolve, load migration keys,
/// generate, optionally dump CSV, insert.
pub async fn run_seed(ctx: &mut RunContext) -> RunResult<RunSummary> {
    let timer = Instant::now();
    info!(
        event = "run_started",
        run_id = %ctx.run_id,
        vendor = %ctx.connection.vendor,
        target = %ctx.connection.params.redacted(),
        tables = ctx.tables.len(),
        dry_run = ctx.options.dry_run
    );

    let result = run_stages(ctx).await;
    ctx.access.close().await;

    let elapsed = timer.elapsed();
    match result {
        Ok((order, generation, insertion, csv_files, failed_introspection)) => {
            if !insertion.is_complete() {
                warn!(
                    abandoned = ?insertion.tables_with(synthseed_db::InsertStatus::Abandoned),
                    skipped = ?insertion.tables_with(synthseed_db::InsertStatus::SkippedDependency),
                    "some tables were not fully inserted"
                );
            }
            info!(
                event = "run_finished",
                status = "success",
                rows_generated = generation.rows_generated(),
                rows_inserted = insertion.rows_inserted(),
                elapsed = %format_elapsed(elapsed),
                "Total time: {}",
                format_elapsed(elapsed)
            );
            Ok(RunSummary {
                run_id: ctx.run_id.clone(),
                order,
                generation,
                insertion,
                csv_files,
                failed_introspection,
                elapsed,
            })
        }
        Err(err) => {
            tracing::error!(
                event = "run_failed",
                run_id = %ctx.run_id,
                error = %err,
                elapsed = %format_elapsed(elapsed),
                "run failed"
            );
            Err(err)
        }
    }
}

type StageOutput = (
    Vec<String>,
    GenerationReport,
    InsertReport,
    Vec<PathBuf>,
    Vec<String>,
);

async fn run_stages(ctx: &mut RunContext) -> RunResult<StageOutput> {
    validate_configuration(&ctx.tables)?;

    let introspect_options = IntrospectOptions {
        schema: None,
        strict: ctx.options.strict_introspection,
    };
    let introspection =
        introspect_constraints(&ctx.access, &mut ctx.tables, &introspect_options).await?;

    let order = resolve(&mut ctx.tables)?;
    info!(event = "order_resolved", order = ?order);

    let mut parent_keys = ParentKeys::new();
    for (table, column) in migration_key_columns(&ctx.tables) {
        let keys = fetch_existing_keys(&ctx.access, &table, &column).await?;
        info!(table = %table, column = %column, keys = keys.len(), "loaded existing keys");
        parent_keys.insert(table, column, keys);
    }
    for (table, columns) in migration_key_tuples(&ctx.tables) {
        let tuples = fetch_existing_key_tuples(&ctx.access, &table, &columns).await?;
        info!(table = %table, columns = ?columns, keys = tuples.len(), "loaded existing key tuples");
        parent_keys.insert_tuples(table, columns, tuples);
    }

    let engine = GenerationEngine::new(GenerateOptions {
        seed: ctx.options.seed,
        max_unique_retries: ctx.options.max_unique_retries,
    });
    let generation = engine.run(&mut ctx.tables, &order, &mut parent_keys)?;

    let mut csv_files = Vec::new();
    if ctx.options.emit_csv {
        match ctx.connection.synthetic_data_files_path() {
            Some(dir) => csv_files = write_tables_csv(&dir, &ctx.tables, &order)?,
            None => warn!("db_uploads_path is not configured; CSV output skipped"),
        }
    }

    let insert_options = InsertOptions {
        max_rows_per_batch: ctx.options.max_rows_per_batch,
        ..InsertOptions::default()
    };
    let insertion = insert_tables(&ctx.access, &mut ctx.tables, &order, &insert_options).await?;
    info!(
        event = "insertion_finished",
        tables = insertion.tables.len(),
        rows = insertion.rows_inserted()
    );

    Ok((
        order,
        generation,
        insertion,
        csv_files,
        introspection.failed_tables,
    ))
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

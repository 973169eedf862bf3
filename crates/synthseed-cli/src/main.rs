use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use synthseed_cli::{
    RunContext, RunError, RunOptions, init_run_logging, run_seed, table_document_schema,
};
use synthseed_generate::DEFAULT_MAX_UNIQUE_RETRIES;

#[derive(Parser, Debug)]
#[command(name = "synthseed", version, about = "Seed relational databases with synthetic rows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate rows for every configured table and insert them.
    Seed(SeedArgs),
    /// Print the JSON Schema of per-table configuration documents.
    Schema,
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Directory holding `config/connection.json` and
    /// `config/synthetic_data_configuration/`.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
    /// Directory for `info.ndjson` and `errors.ndjson`.
    #[arg(long, default_value = "logs")]
    logs_dir: PathBuf,
    /// Seed of the generation RNG.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Abort when the constraint query of any table fails.
    #[arg(long, default_value_t = false)]
    strict_introspection: bool,
    /// Regeneration attempts per row for unique collisions.
    #[arg(long, default_value_t = DEFAULT_MAX_UNIQUE_RETRIES)]
    max_unique_retries: u32,
    /// Cap on rows per INSERT statement.
    #[arg(long)]
    max_rows_per_batch: Option<usize>,
    /// Write generated rows to `<db_uploads_path>/synthetic_data_files`.
    #[arg(long, default_value_t = false)]
    emit_csv: bool,
    /// Generate and build statements without touching the database.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Seed(args) => seed(args).await,
        Command::Schema => print_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

async fn seed(args: SeedArgs) -> Result<(), RunError> {
    init_run_logging(&args.logs_dir)?;

    let options = RunOptions {
        base_dir: args.base_dir,
        seed: args.seed,
        strict_introspection: args.strict_introspection,
        max_unique_retries: args.max_unique_retries,
        max_rows_per_batch: args.max_rows_per_batch,
        emit_csv: args.emit_csv,
        dry_run: args.dry_run,
    };

    let mut ctx = match RunContext::load(options) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(event = "config_failed", error = %err, "configuration failed");
            return Err(err);
        }
    };
    let summary = run_seed(&mut ctx).await?;
    println!("Total time: {}", synthseed_cli::format_elapsed(summary.elapsed));
    Ok(())
}

fn print_schema() -> Result<(), RunError> {
    let schema = serde_json::to_string_pretty(&table_document_schema())
        .map_err(|err| RunError::Io(std::io::Error::other(err)))?;
    println!("{schema}");
    Ok(())
}

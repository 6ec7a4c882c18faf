use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use rate_tables::database::table_name;
use rate_tables::inspect::DEFAULT_OUTPUT_DIRECTORY;
use rate_tables::table::locator::FallbackReason;
use rate_tables::AssumeYes;
use rate_tables::Config;
use rate_tables::Confirm;
use rate_tables::Discovery;
use rate_tables::LoadOutcome;
use rate_tables::Loader;
use rate_tables::TableDescriptor;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Find the tables in an Excel rate workbook and load them into DuckDB.")]
struct Args {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tables a workbook declares.
    Tables {
        workbook: PathBuf,
    },

    /// Extract tables and print their columns and first rows.
    Extract {
        workbook: PathBuf,

        /// Only extract the table with this name.
        #[arg(long)]
        table: Option<String>,
    },

    /// Extract every table and load it into a DuckDB database.
    Load {
        workbook: PathBuf,

        /// Database file, created when missing.
        #[arg(long)]
        database: PathBuf,

        /// Answer yes to every question.
        #[arg(short, long)]
        yes: bool,
    },

    /// Copy the structural XML parts of a workbook into a directory.
    Unpack {
        workbook: PathBuf,

        #[arg(long, default_value = DEFAULT_OUTPUT_DIRECTORY)]
        output: PathBuf,
    },
}

/// Asks on stdout and reads the answer from stdin; anything but `y`/`yes` is a no.
struct Prompt;

impl Confirm for Prompt {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{} [y/N] ", question);
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;
    let config = Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Tables { workbook } => list_tables(&workbook, &config),
        Command::Extract { workbook, table } => extract(&workbook, table.as_deref(), &config),
        Command::Load { workbook, database, yes } => load(&workbook, &database, yes, &config),
        Command::Unpack { workbook, output } => unpack(&workbook, &output),
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid tracing filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn discover(workbook: &Path, config: &Config) -> Vec<TableDescriptor> {
    let discovery = rate_tables::locate_tables(workbook, config);
    if let Discovery::Fallback { descriptor, reason } = &discovery {
        match reason {
            FallbackReason::NoTableParts => warn!("Using default table '{}' on '{}'", descriptor.name, descriptor.sheet),
            FallbackReason::Failed(_) => warn!("Using default table '{}' ({})", descriptor.name, reason),
        }
    }
    discovery.descriptors()
}

fn list_tables(workbook: &Path, config: &Config) -> Result<()> {
    let tables = discover(workbook, config);
    println!("Found {} table(s):", tables.len());
    for (index, table) in tables.iter().enumerate() {
        println!("{}. {} (sheet '{}', range {})", index + 1, table.name, table.sheet, table.range);
    }
    Ok(())
}

fn extract(workbook: &Path, only: Option<&str>, config: &Config) -> Result<()> {
    let mut tables = discover(workbook, config);
    if let Some(name) = only {
        tables.retain(|table| table.name.eq_ignore_ascii_case(name));
        if tables.is_empty() {
            bail!("No table named '{}' in '{}'", name, workbook.display());
        }
    }

    for table in &tables {
        let result = rate_tables::extract_table(workbook, table);
        if result.is_empty() {
            warn!("No data extracted from table '{}'", table.name);
            continue;
        }
        println!("\nTable '{}': {} rows", table.name, result.row_count());
        println!("Columns: {}", result.columns.join(", "));
        println!("Sample data:");
        print!("{}", result.preview(config.sample_rows));
    }
    Ok(())
}

fn load(workbook: &Path, database: &Path, yes: bool, config: &Config) -> Result<()> {
    let mut loader = Loader::open(database)?.with_batch_size(config.batch_size)?;
    let mut confirm: Box<dyn Confirm> = if yes { Box::new(AssumeYes) } else { Box::new(Prompt) };
    let tables = discover(workbook, config);

    let mut created = 0usize;
    for table in &tables {
        let result = rate_tables::extract_table(workbook, table);
        if result.is_empty() {
            warn!("No data extracted from table '{}', skipping", table.name);
            continue;
        }
        let name = table_name(&config.table_prefix, &table.name);
        println!("\nTable '{}' -> '{}'", table.name, name);
        println!("Columns: {}", result.columns.join(", "));
        print!("{}", result.preview(config.sample_rows));

        let outcome = loader.load(&name, &result, confirm.as_mut())
            .with_context(|| format!("Failed to load table '{}'", name))?;
        match outcome {
            LoadOutcome::Created { rows } => {
                println!("Created '{}' with {} rows", name, rows);
                created += 1;
            }
            LoadOutcome::Skipped => println!("Skipped '{}'", name),
        }
    }
    info!("Loaded {} of {} table(s) into '{}'", created, tables.len(), database.display());
    Ok(())
}

fn unpack(workbook: &Path, output: &Path) -> Result<()> {
    let report = rate_tables::unpack_parts(workbook, output)?;
    for part in &report.missing {
        println!("Missing: {}", part);
    }
    println!("Extracted {} XML files to '{}'", report.extracted.len(), output.display());
    Ok(())
}

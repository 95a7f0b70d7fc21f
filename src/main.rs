use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

use inventory_stager::config::Config;
use inventory_stager::constants::NAME_COLUMN;
use inventory_stager::infra::{FsKeyValueStore, NdjsonPrintQueue};
use inventory_stager::logging;
use inventory_stager::pipeline::{InventoryStagingPipeline, Record, RecordDetail, SearchOutcome, StageOutcome};
use inventory_stager::storage::InventoryRepository;

#[derive(Parser)]
#[command(name = "inventory_stager")]
#[command(about = "Look up products from an inventory CSV and stage them into a new inventory")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to inventory_stager.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the main inventory CSV, replacing the current catalog
    Import {
        file: PathBuf,
        /// Keep the current key and saved columns where the new file has them
        #[arg(long)]
        keep_settings: bool,
    },
    /// Merge a previously exported new-inventory CSV into the staged set
    Merge { file: PathBuf },
    /// Search the catalog by key and stage the first match
    Lookup {
        query: String,
        /// When nothing matches, create an item keyed by the query
        #[arg(long)]
        create: bool,
        /// Field values for a created item (COLUMN=VALUE)
        #[arg(long = "set", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
    },
    /// Create a staged item from field values
    Create {
        #[arg(long = "set", value_parser = parse_key_val, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Update fields of a staged item
    Edit {
        key: String,
        #[arg(long = "set", value_parser = parse_key_val, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Remove a staged item
    Delete { key: String },
    /// Remove every staged item
    Clear,
    /// Write the staged set as CSV
    Export {
        /// Output path (defaults to the configured export file name)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the CSV instead of writing a file
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
    },
    /// List staged items
    List,
    /// Show a staged or catalog item with its price margin
    Show { key: String },
    /// Show the current settings
    Settings,
    /// Choose the key column
    SetKey { column: String },
    /// Add or remove a column from the saved columns
    ToggleColumn { column: String },
    /// Add an auxiliary list name
    AddList { name: String },
    /// Remove an auxiliary list name
    RemoveList { name: String },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("missing column name in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn read_csv(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_detail(detail: &RecordDetail) {
    for (column, value) in &detail.fields {
        println!("   {}: {}", column, value);
    }
    match &detail.margin {
        Some(margin) => println!("{}", margin),
        None => println!("   Cost price is not available or invalid for margin calculation."),
    }
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    let store = FsKeyValueStore::new(&config.data_dir)
        .with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;
    let repository = InventoryRepository::new(Arc::new(store));
    let print_queue = Arc::new(NdjsonPrintQueue::new(config.print_queue_path()));
    let mut pipeline = InventoryStagingPipeline::open(repository, print_queue);
    let key_column = pipeline.settings().sku_column.clone();

    match cli.command {
        Commands::Import { file, keep_settings } => {
            let text = read_csv(&file)?;
            let summary = pipeline.import_catalog(&text, keep_settings)?;
            println!(
                "✅ Main inventory CSV loaded: {} rows, key column '{}'",
                summary.rows, summary.settings.sku_column
            );
        }
        Commands::Merge { file } => {
            let text = read_csv(&file)?;
            let summary = pipeline.merge_import(&text)?;
            println!(
                "✅ Merged {} items into new inventory ({} already present, {} without key)",
                summary.added.len(),
                summary.duplicates,
                summary.blank_keys
            );
        }
        Commands::Lookup { query, create, fields } => {
            let result = pipeline.lookup(&query)?;
            match result.outcome {
                SearchOutcome::Found(record) => {
                    if !result.newly_staged {
                        println!("⚠️  Item already exists in new inventory");
                    }
                    println!("✅ Found product: {}", record.get_ignore_case(NAME_COLUMN).unwrap_or("Unknown"));
                    print_detail(&pipeline.detail(&record));
                }
                SearchOutcome::AlreadyStaged => {
                    println!(
                        "⚠️  Item with {} \"{}\" already exists in new inventory",
                        key_column, query
                    );
                }
                SearchOutcome::NotFound if create => {
                    let mut record: Record = fields.into_iter().collect();
                    record.set(key_column.clone(), query.clone());
                    report_created(pipeline.create_record(&record)?);
                }
                SearchOutcome::NotFound => {
                    println!("ℹ️  No product found. Use --create to add '{}'", query);
                }
            }
        }
        Commands::Create { fields } => {
            let record: Record = fields.into_iter().collect();
            report_created(pipeline.create_record(&record)?);
        }
        Commands::Edit { key, fields } => {
            let patch: Record = fields.into_iter().collect();
            pipeline.edit(&key, &patch)?;
            println!("✅ Item updated successfully");
        }
        Commands::Delete { key } => {
            let removed = pipeline.delete(&key)?;
            if removed > 0 {
                println!("✅ Item deleted from new inventory");
            } else {
                println!("ℹ️  No item with {} \"{}\" in new inventory", key_column, key);
            }
        }
        Commands::Clear => {
            pipeline.clear()?;
            println!("✅ New inventory cleared");
        }
        Commands::Export { out, stdout } => {
            if stdout {
                print!("{}", pipeline.export()?);
            } else {
                let path = out.unwrap_or_else(|| PathBuf::from(&config.export_file_name));
                pipeline.download(&path)?;
                println!("✅ New inventory downloaded as CSV: {}", path.display());
            }
        }
        Commands::List => {
            let columns = &pipeline.settings().save_columns;
            println!("{}", columns.join(" | "));
            for record in pipeline.staged().iter() {
                let values: Vec<&str> = columns.iter().map(|c| record.value(c)).collect();
                println!("{}", values.join(" | "));
            }
            println!("📦 {} items in new inventory", pipeline.staged().len());
        }
        Commands::Show { key } => {
            let record = pipeline
                .staged()
                .find(&key_column, &key)
                .or_else(|| {
                    pipeline
                        .catalog()
                        .iter()
                        .find(|r| r.value(&key_column).eq_ignore_ascii_case(&key))
                })
                .cloned();
            match record {
                Some(record) => print_detail(&pipeline.detail(&record)),
                None => println!("ℹ️  No item with {} \"{}\"", key_column, key),
            }
        }
        Commands::Settings => {
            let settings = pipeline.settings();
            println!("Key column:    {}", settings.sku_column);
            println!("Saved columns: {}", settings.save_columns.join(", "));
            println!("Lists:         {}", settings.lists.join(", "));
            println!("Columns:       {}", pipeline.headers().join(", "));
        }
        Commands::SetKey { column } => {
            pipeline.set_key_column(&column)?;
            println!("✅ Key column set to '{}'", column);
        }
        Commands::ToggleColumn { column } => {
            let saved = pipeline.toggle_save_column(&column)?;
            let state = if saved { "saved" } else { "no longer saved" };
            println!("✅ Column '{}' is {}", column, state);
        }
        Commands::AddList { name } => {
            if pipeline.add_list(&name)? {
                println!("✅ List '{}' added", name.trim());
            } else {
                println!("ℹ️  List '{}' already exists", name.trim());
            }
        }
        Commands::RemoveList { name } => {
            if pipeline.remove_list(&name)? {
                println!("✅ List '{}' removed", name.trim());
            } else {
                println!("ℹ️  No list named '{}'", name.trim());
            }
        }
    }
    Ok(())
}

fn report_created(outcome: StageOutcome) {
    match outcome {
        StageOutcome::Added(_) => println!("✅ New item created and added to new inventory"),
        StageOutcome::Duplicate => println!("⚠️  Item already exists in new inventory"),
    }
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()).context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            std::process::exit(1);
        }
    };
    // Held until the end of main so the final error reaches the file log
    let guard = logging::init_logging(&config.log_dir);

    if let Err(e) = run(cli, &config) {
        error!("Command failed: {:#}", e);
        eprintln!("❌ {:#}", e);
        drop(guard);
        std::process::exit(1);
    }
}

//! egcgraph CLI - inspect and edit EGC files through their reference graph

use anyhow::Context;
use clap::{Parser, Subcommand};
use egcgraph::config::{self, EgcConfig};
use egcgraph::identifier::IdFields;
use egcgraph::stats::CorpusStats;
use egcgraph::ui;
use egcgraph::{ContextExtractor, RecordKind, RecordStore, StoreOptions};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "egcgraph")]
#[command(version = "0.0.1")]
#[command(about = "Reference graph engine for Expected Genome Contents (EGC) files")]
#[command(long_about = r#"
egcgraph indexes the references between the records of an EGC file, enabling:
  • Context extraction around any record
  • Record creation, update and deletion with rename cascades
  • Consistency checks and corpus statistics

Example usage:
  egcgraph -f data.egc extract D-PMID-12345 --indented
  egcgraph -f data.egc update Ug_lacZ "U	Ug_lacZ2	specific_gene	lacZ2	.	."
  egcgraph -f data.egc new-id unit specific_gene --symbol nifH
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// EGC data file (overrides `data_file` in the config)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Config file
    #[arg(short, long, global = true, default_value = "egcgraph.toml")]
    config: PathBuf,

    /// Back up the data file before the first change
    #[arg(long, global = true)]
    backup: bool,

    /// Apply changes in memory only
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file
    Init {
        /// Data file to record in the config
        #[arg(long)]
        data_file: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// List the context of a record
    Extract {
        /// Record identifier
        id: String,

        /// Indent entries by traversal depth
        #[arg(short, long)]
        indented: bool,

        /// Prefix entries with their line number
        #[arg(short, long)]
        numbered: bool,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show one record
    Show {
        /// Record identifier
        id: String,
    },

    /// Show what a record references and what references it
    Refs {
        /// Record identifier
        id: String,
    },

    /// Show statistics about the file
    Stats {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check the reference graph for dangling and unresolved references
    Check {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Append a record given as an encoded line
    Create {
        /// Encoded record
        line: String,
    },

    /// Replace a record, cascading identifier changes
    Update {
        /// Identifier of the record to replace
        id: String,

        /// New encoded record
        line: String,
    },

    /// Delete a record (referencing records are kept)
    Delete {
        /// Record identifier
        id: String,
    },

    /// Suggest an identifier for a new record
    NewId {
        /// Record kind (code or name)
        kind: String,

        /// Group type, unit type or attribute mode
        #[arg(default_value = "")]
        subtype: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        definition: Option<String>,

        /// Unit of a new attribute
        #[arg(long)]
        unit: Option<String>,
    },
}

fn open_store(cli: &Cli, config: &EgcConfig) -> anyhow::Result<RecordStore> {
    let path = config
        .data_file(cli.file.as_deref())
        .context("no data file: pass --file or set data_file in the config")?;
    let options: StoreOptions = config.store_options(cli.backup, cli.dry_run);
    tracing::debug!("Opening {} with {:?}", path.display(), options);
    let store = RecordStore::open(&path, options)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(store)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = config::load_config(Some(&cli.config))?.unwrap_or_default();

    match &cli.command {
        Commands::Init { data_file, force } => {
            let new_config = EgcConfig {
                data_file: data_file.clone().or_else(|| settings.data_file.clone()),
                backup: Some(cli.backup),
                autosave: Some(!cli.dry_run),
            };
            config::write_config(&cli.config, &new_config, *force)?;
            ui::success(&format!("Wrote {}", cli.config.display()));
        }

        Commands::Extract {
            id,
            indented,
            numbered,
            format,
        } => {
            let store = open_store(&cli, &settings)?;
            let listing = ContextExtractor::new(&store).extract(id)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                ui::listing(&listing, *indented, *numbered);
            }
        }

        Commands::Show { id } => {
            let store = open_store(&cli, &settings)?;
            let record = store.read(id)?;
            ui::record(record.kind(), store.line_number(id)?, store.line(id)?);
        }

        Commands::Refs { id } => {
            let store = open_store(&cli, &settings)?;
            let kind = store.read(id)?.kind();
            let graph = store.graph();

            ui::header(&format!("{} ({})", id, kind));
            for (title, direction) in [
                ("References", egcgraph::Direction::Outgoing),
                ("Referenced by", egcgraph::Direction::Incoming),
            ] {
                ui::section(title);
                let neighbors = graph.neighbors(kind, id, direction);
                if neighbors.is_empty() {
                    println!("  {}", ui::dim("none"));
                }
                for neighbor in neighbors {
                    match store.locate(&neighbor) {
                        Some((n, line)) => ui::record(neighbor.kind, n, line),
                        None => ui::missing(std::slice::from_ref(&neighbor)),
                    }
                }
            }
        }

        Commands::Stats { format } => {
            let store = open_store(&cli, &settings)?;
            let stats = CorpusStats::collect(&store);
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats.render());
            }
        }

        Commands::Check { format } => {
            let store = open_store(&cli, &settings)?;
            let report = store.check();
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_clean() {
                ui::success("No dangling or unresolved references");
            } else {
                if !report.dangling.is_empty() {
                    ui::section("Dangling references");
                    for (key, referrers) in &report.dangling {
                        let by: Vec<String> = referrers.iter().map(|r| r.to_string()).collect();
                        ui::summary_row(&key.to_string(), &format!("<- {}", by.join(", ")));
                    }
                }
                if !report.unresolved_evidence.is_empty() {
                    ui::section("Unresolved evidence");
                    for (evidence, rules) in &report.unresolved_evidence {
                        let by: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
                        ui::summary_row(evidence, &format!("<- {}", by.join(", ")));
                    }
                }
            }
            if !report.broken_edges.is_empty() {
                for edge in &report.broken_edges {
                    ui::error(&format!("Unmirrored edge {}", edge));
                }
                anyhow::bail!("reference index is inconsistent");
            }
        }

        Commands::Create { line } => {
            let mut store = open_store(&cli, &settings)?;
            let id = store.create_line(line)?;
            tracing::info!("Created {} at line {}", id, store.line_number(&id)?);
            ui::record_created(&id);
        }

        Commands::Update { id, line } => {
            let mut store = open_store(&cli, &settings)?;
            let new_id = store.update_line(id, line)?;
            tracing::info!("Updated {} (now {})", id, new_id);
            ui::record_updated(id, &new_id);
        }

        Commands::Delete { id } => {
            let mut store = open_store(&cli, &settings)?;
            let referrers = store.graph().neighbors(
                store.kind_of(id).context("no such record")?,
                id,
                egcgraph::Direction::Incoming,
            );
            store.delete(id)?;
            ui::record_deleted(id);
            if !referrers.is_empty() {
                ui::warn(&format!("{} record(s) still reference {}", referrers.len(), id));
                for referrer in &referrers {
                    ui::summary_row(&referrer.to_string(), "");
                }
            }
        }

        Commands::NewId {
            kind,
            subtype,
            name,
            symbol,
            description,
            definition,
            unit,
        } => {
            let store = open_store(&cli, &settings)?;
            let kind: RecordKind = kind.parse()?;
            let fields = IdFields {
                name: name.as_deref(),
                symbol: symbol.as_deref(),
                description: description.as_deref(),
                definition: definition.as_deref(),
                unit_id: unit.as_deref(),
            };
            println!("{}", store.generate_id(kind, subtype, &fields)?);
        }
    }

    Ok(())
}

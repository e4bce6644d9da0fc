use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use pes_core::core_api::{
    AttributeStore, NameTable, UpdatePolicy, UpdateReport, create_backup,
};
use pes_core::layout::RecordLayout;
use pes_core::scanner::{self, IdCandidates};
use pes_render::{
    FieldSelection, render_attributes_json, render_attributes_text, render_record_json,
    render_record_sheet, render_scan_hits_json, render_scan_hits_text, render_update_report_json,
    render_update_report_text,
};
use serde_json::Value as JsonValue;
use tracing_subscriber::EnvFilter;

const EDIT_BIN_PRESET: &str = "edit-bin";
const PLAYER_DATA_PRESET: &str = "player-data";
const DEFAULT_SCAN_BLOCK_SIZE: usize = 64;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log decoding and save details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the decoded attributes of one block.
    Show {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        index: usize,
        /// Preset name (edit-bin, player-data) or a JSON layout file.
        #[arg(long, value_name = "LAYOUT", default_value = EDIT_BIN_PRESET, value_parser = parse_layout)]
        layout: RecordLayout,
        /// Print only this attribute; repeatable.
        #[arg(long = "field", value_name = "NAME")]
        fields: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Write attributes of one block by index.
    Set {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        index: usize,
        #[arg(long, value_name = "LAYOUT", default_value = EDIT_BIN_PRESET, value_parser = parse_layout)]
        layout: RecordLayout,
        #[command(flatten)]
        edit: EditArgs,
    },
    /// Find a player by id and print the decoded record.
    Lookup {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        id: u64,
        #[arg(long, value_name = "LAYOUT", default_value = PLAYER_DATA_PRESET, value_parser = parse_layout)]
        layout: RecordLayout,
        #[command(flatten)]
        locate: LocateArgs,
        #[arg(long)]
        json: bool,
    },
    /// Find a player by id and write attributes of its block.
    Edit {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        id: u64,
        #[arg(long, value_name = "LAYOUT", default_value = PLAYER_DATA_PRESET, value_parser = parse_layout)]
        layout: RecordLayout,
        #[command(flatten)]
        locate: LocateArgs,
        #[command(flatten)]
        edit: EditArgs,
    },
    /// List every block and candidate offset holding the id, best first.
    Scan {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        id: u64,
        #[arg(long, default_value_t = DEFAULT_SCAN_BLOCK_SIZE)]
        block_size: usize,
        #[arg(long, value_name = "CANDIDATES", default_value = PLAYER_DATA_PRESET, value_parser = parse_candidates)]
        candidates: IdCandidates,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct LocateArgs {
    /// CSV file with `id` and `Name` columns.
    #[arg(long, value_name = "CSV")]
    names: Option<PathBuf>,
    /// Preset name (player-data) or a JSON candidate file.
    #[arg(long, value_name = "CANDIDATES", default_value = PLAYER_DATA_PRESET, value_parser = parse_candidates)]
    candidates: IdCandidates,
}

#[derive(Debug, Args)]
struct EditArgs {
    /// NAME=VALUE; repeatable.
    #[arg(long = "attr", value_name = "NAME=VALUE", required = true, allow_hyphen_values = true, value_parser = parse_assignment)]
    attrs: Vec<(String, i64)>,
    /// Reject the whole update if any attribute is invalid.
    #[arg(long)]
    strict: bool,
    /// Write the edited file here instead of overwriting the input.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Copy the input here before overwriting it.
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Show {
            path,
            index,
            layout,
            fields,
            json,
        } => {
            let store = load_store(&path, layout);
            let attrs = store.get_attributes(index).unwrap_or_else(|| {
                eprintln!(
                    "Block {index} is out of range ({} blocks in {})",
                    store.block_count(),
                    path.display()
                );
                process::exit(1);
            });

            let fields = FieldSelection { names: fields };
            let missing = fields.missing_from(&attrs);
            if !missing.is_empty() {
                eprintln!("Unknown field(s) for layout {}: {}", store.layout().name, missing.join(", "));
                process::exit(2);
            }

            if json {
                print_json(&render_attributes_json(index, &attrs, &fields));
            } else {
                print!("{}", render_attributes_text(&attrs, &fields));
            }
        }
        Command::Set {
            path,
            index,
            layout,
            edit,
        } => {
            let mut store = load_store(&path, layout).with_policy(edit.policy());
            let report = store
                .set_attributes(index, edit.attrs.iter().map(|(k, v)| (k.as_str(), *v)))
                .unwrap_or_else(|| {
                    eprintln!(
                        "Block {index} is out of range ({} blocks in {})",
                        store.block_count(),
                        path.display()
                    );
                    process::exit(1);
                });
            finish_edit(&store, &path, &edit, &report);
        }
        Command::Lookup {
            path,
            id,
            layout,
            locate,
            json,
        } => {
            let store = load_store(&path, layout);
            let names = load_names(locate.names.as_deref());
            let record = store
                .lookup(id, &locate.candidates, names.as_ref())
                .unwrap_or_else(|| {
                    eprintln!("Player id {id} not found in {}", path.display());
                    process::exit(1);
                });

            if json {
                print_json(&render_record_json(&record));
            } else {
                print!("{}", render_record_sheet(&record));
            }
        }
        Command::Edit {
            path,
            id,
            layout,
            locate,
            edit,
        } => {
            let mut store = load_store(&path, layout).with_policy(edit.policy());
            let names = load_names(locate.names.as_deref());
            let hit = store.find_by_id(id, &locate.candidates).unwrap_or_else(|| {
                eprintln!("Player id {id} not found in {}", path.display());
                process::exit(1);
            });
            if let Some(names) = &names {
                tracing::info!(id, name = names.lookup(id), block = hit.block_index, "editing player");
            }

            let report = store
                .set_attributes(hit.block_index, edit.attrs.iter().map(|(k, v)| (k.as_str(), *v)))
                .unwrap_or_else(|| {
                    eprintln!("Block {} vanished from {}", hit.block_index, path.display());
                    process::exit(1);
                });
            finish_edit(&store, &path, &edit, &report);
        }
        Command::Scan {
            path,
            id,
            block_size,
            candidates,
            json,
        } => {
            if block_size == 0 {
                eprintln!("--block-size must be at least 1");
                process::exit(2);
            }
            let bytes = fs::read(&path).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {e}", path.display());
                process::exit(1);
            });
            let hits: Vec<_> = scanner::scan_matches(&bytes, block_size, id, &candidates).collect();

            if json {
                print_json(&render_scan_hits_json(id, &hits));
            } else {
                print!("{}", render_scan_hits_text(id, &hits));
            }
            if hits.is_empty() {
                process::exit(1);
            }
        }
    }
}

impl EditArgs {
    fn policy(&self) -> UpdatePolicy {
        if self.strict {
            UpdatePolicy::Strict
        } else {
            UpdatePolicy::BestEffort
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn load_store(path: &Path, layout: RecordLayout) -> AttributeStore {
    AttributeStore::load(path, layout).unwrap_or_else(|e| {
        eprintln!("Error loading {}", path.display());
        eprintln!("  {e}");
        process::exit(1);
    })
}

fn load_names(path: Option<&Path>) -> Option<NameTable> {
    let path = path?;
    let table = NameTable::load_csv(path).unwrap_or_else(|e| {
        eprintln!("Error loading name table: {e}");
        process::exit(1);
    });
    Some(table)
}

/// Reports the update and persists it unless a strict update was rejected.
fn finish_edit(store: &AttributeStore, input: &Path, edit: &EditArgs, report: &UpdateReport) {
    if edit.json {
        print_json(&render_update_report_json(report));
    } else {
        print!("{}", render_update_report_text(report));
    }
    if !report.committed {
        process::exit(1);
    }

    match &edit.output {
        Some(out_path) => {
            store.save_as(out_path).unwrap_or_else(|e| {
                eprintln!("Error writing {}: {e}", out_path.display());
                process::exit(1);
            });
        }
        None => {
            if let Some(dir) = &edit.backup_dir {
                if let Err(e) = create_backup(input, dir) {
                    tracing::warn!(error = %e, "backup failed, saving anyway");
                }
            }
            store.save().unwrap_or_else(|e| {
                eprintln!("Error writing {}: {e}", input.display());
                process::exit(1);
            });
        }
    }

    if !edit.json {
        let target = edit.output.as_deref().unwrap_or(input);
        eprintln!("Wrote edited file to {}", target.display());
    }
}

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

fn parse_layout(value: &str) -> Result<RecordLayout, String> {
    let layout = match value.to_ascii_lowercase().as_str() {
        EDIT_BIN_PRESET => RecordLayout::edit_bin(),
        PLAYER_DATA_PRESET => RecordLayout::player_data(),
        _ => read_json_file(value)?,
    };
    layout.validate().map_err(|e| e.to_string())?;
    Ok(layout)
}

fn parse_candidates(value: &str) -> Result<IdCandidates, String> {
    if value.eq_ignore_ascii_case(PLAYER_DATA_PRESET) {
        return Ok(IdCandidates::player_data());
    }
    read_json_file(value)
}

fn read_json_file<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, String> {
    let text = fs::read_to_string(value)
        .map_err(|e| format!("expected a preset name or a readable JSON file: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid JSON in {value}: {e}"))
}

fn parse_assignment(value: &str) -> Result<(String, i64), String> {
    let (name, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {value:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing attribute name in {value:?}"));
    }
    let parsed = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid value for {name}: {e}"))?;
    Ok((name.to_string(), parsed))
}

#![cfg(not(tarpaulin_include))]

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use paap_sheets::config::PortalConfig;
use paap_sheets::gateway::{FileId, FsStore, PersistenceGateway};
use paap_sheets::rules::SheetKind;
use paap_sheets::spreadsheet::Sheet;
use paap_sheets::{encode_workbook, load_workbook, recompute_in_place, to_csv, validate_sheet};

#[derive(Parser)]
#[command(about = "Validate, total and store PAAP, Achizitii and Financiar workbooks.")]
struct Args {
    /// JSON config file; defaults apply when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Page kind of the workbook. Overrides `sheet_kind` from the config.
    #[arg(long, global = true)]
    kind: Option<SheetKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every validation error of the primary sheet.
    Validate { workbook: PathBuf },
    /// Print the P/S/L totals.
    Totals {
        workbook: PathBuf,
        /// Write the workbook back with the totals sheet rewritten.
        #[arg(long, value_name = "PATH")]
        write: Option<PathBuf>,
    },
    /// Export one sheet as CSV to stdout.
    ExportCsv {
        workbook: PathBuf,
        /// Sheet name; the primary sheet when omitted.
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Manage the file store.
    #[command(subcommand)]
    Store(StoreCommand),
}

#[derive(Subcommand)]
enum StoreCommand {
    Upload {
        #[arg(long)]
        owner: String,
        workbook: PathBuf,
    },
    Download {
        #[arg(long)]
        owner: String,
        id: i64,
        output: PathBuf,
        /// Archived version to fetch instead of the current one.
        #[arg(long)]
        version: Option<u32>,
    },
    List {
        #[arg(long)]
        owner: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = PortalConfig::load(args.config.as_deref())?;
    let kind = args.kind.unwrap_or(config.sheet_kind);

    match args.command {
        Command::Validate { workbook } => {
            let workbook = load_workbook(&workbook)?;
            let Some(sheet) = workbook.primary() else {
                return Ok(());
            };
            let report = validate_sheet(sheet, kind);
            for ((row, col), message) in report.iter() {
                println!("{}: {}", Sheet::get_cell_name(*row, *col), message);
            }
            println!("{} errors", report.len());
            if !report.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Totals { workbook, write } => {
            let mut workbook = load_workbook(&workbook)?;
            match recompute_in_place(&mut workbook, kind) {
                Some(totals) => {
                    for (label, value) in totals.lines() {
                        println!("{:<6}{:.2}", label, value);
                    }
                }
                None => println!("{} workbooks carry no totals", kind),
            }
            if let Some(path) = write {
                fs::write(&path, encode_workbook(&workbook)?)?;
                info!("wrote {}", path.display());
            }
        }
        Command::ExportCsv { workbook, sheet } => {
            let workbook = load_workbook(&workbook)?;
            let selected = match &sheet {
                Some(name) => workbook.sheet_by_name(name),
                None => workbook.primary(),
            };
            let selected = selected.ok_or_else(|| {
                format!("no sheet named `{}`", sheet.as_deref().unwrap_or_default())
            })?;
            print!("{}", to_csv(selected));
        }
        Command::Store(command) => {
            config.init_dirs()?;
            let store = FsStore::open(&config.data_dir, config.archive_previous_versions)?;
            match command {
                StoreCommand::Upload { owner, workbook } => {
                    let bytes = fs::read(&workbook)?;
                    let decoded = paap_sheets::decode_workbook(&bytes)?;
                    let row_count = decoded
                        .primary()
                        .map(|s| s.filled_row_count() as u32)
                        .unwrap_or(0);
                    let name = workbook
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let record = store.create(&owner, &name, &bytes, row_count)?;
                    println!("stored `{}` as #{} ({} rows)", name, record.id, record.row_count);
                }
                StoreCommand::Download {
                    owner,
                    id,
                    output,
                    version,
                } => {
                    let file = FileId::new(id, owner);
                    let bytes = match version {
                        Some(version) => store.load_backup(&file, version)?,
                        None => store.load(&file)?,
                    };
                    fs::write(&output, bytes)?;
                    println!("wrote {}", output.display());
                }
                StoreCommand::List { owner } => {
                    for record in store.list(&owner)? {
                        println!(
                            "#{:<4} v{:<3} {:>5} rows  {}  {}",
                            record.id,
                            record.version,
                            record.row_count,
                            record.updated_at.format("%d/%m/%Y %H:%M"),
                            record.name
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

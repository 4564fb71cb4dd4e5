//! KPI Desk command line.
//!
//! Opens the configured store (seeding sample rows on first run when enabled)
//! and prints a report, exports CSV files, or writes and restores backups.
//!
//! Usage:
//!   kpidesk [report overview|departments|staff|kpis|stats]
//!   kpidesk export <dir>
//!   kpidesk backup <file.json>
//!   kpidesk restore <file.json>
//!   kpidesk snapshot <file.db>

use std::path::Path;
use std::process::ExitCode;

use kpidesk_lib::db_backup;
use kpidesk_lib::error::{DeskError, DeskErrorInfo};
use kpidesk_lib::reports;
use kpidesk_lib::state::{load_config, DeskState};
use kpidesk_lib::types::Config;

const USAGE: &str = "usage: kpidesk [report overview|departments|staff|kpis|stats] | export <dir> | backup <file> | restore <file> | snapshot <file>";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config().unwrap_or_else(|e| {
        log::warn!("{e}; using defaults");
        Config::default()
    });
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match run(config, &args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
        Err(e) => {
            let info = DeskErrorInfo::from(&e);
            match serde_json::to_string(&info) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{}", info.message),
            }
            ExitCode::FAILURE
        }
    }
}

/// Run one subcommand. Returns `false` when the arguments are not recognized.
fn run(config: Config, args: &[&str]) -> Result<bool, DeskError> {
    let mut desk = DeskState::new(config)?;
    log::info!("Opened {}", desk.db().path().display());

    match args {
        [] | ["report"] | ["report", "overview"] => {
            println!("{}", reports::overview(desk.db())?.render());
        }
        ["report", "departments"] => {
            println!("{}", reports::department_kpis(desk.db())?.render());
        }
        ["report", "staff"] => {
            println!("{}", reports::staff_performance(desk.db())?.render());
        }
        ["report", "kpis"] => {
            println!("{}", reports::kpi_details(desk.db())?.render());
        }
        ["report", "stats"] => {
            println!("{}", reports::database_stats(desk.db())?.render());
        }
        ["export", dir] => {
            for file in desk.export_all_data(Path::new(dir))? {
                println!("{}", file.display());
            }
        }
        ["backup", file] => {
            let rows = desk.backup_to_json(Path::new(file))?;
            println!("Backed up {rows} rows to {file}");
        }
        ["restore", file] => {
            let rows = desk.restore_from_json(Path::new(file))?;
            println!("Restored {rows} rows from {file}");
        }
        ["snapshot", file] => {
            let dest = db_backup::snapshot_database(desk.db(), Path::new(file))?;
            println!("Snapshot written to {}", dest.display());
        }
        _ => return Ok(false),
    }

    Ok(true)
}

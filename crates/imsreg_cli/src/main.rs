//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `imsreg_core` linkage.
//! - Open (and migrate) a register database and print per-register counts.
//!
//! Usage: `imsreg_cli [db_path]`; defaults to `imsreg.sqlite3` in the temp dir.

use imsreg_core::db::migrations::current_user_version;
use imsreg_core::repo::lifecycle::{RecordLifecycleRepository, SqliteRecordLifecycleRepository};
use imsreg_core::RecordKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("imsreg_core ping={}", imsreg_core::ping());
    println!("imsreg_core version={}", imsreg_core::core_version());

    let db_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("imsreg.sqlite3"));

    match print_counts(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("imsreg_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_counts(db_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let conn = imsreg_core::open_db(db_path)?;
    println!(
        "db path={} schema_version={}",
        db_path.display(),
        current_user_version(&conn)?
    );

    let repo = SqliteRecordLifecycleRepository::try_new(&conn)?;
    for kind in RecordKind::ALL {
        let active = repo.count_records(kind, false)?;
        let total = repo.count_records(kind, true)?;
        println!(
            "register={} active={active} archived={}",
            kind.as_str(),
            total - active
        );
    }
    Ok(())
}

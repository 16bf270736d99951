//! Working-tree scaffolding: ledger file, download root and log directory

use crate::config::Config;
use crate::ledger::Ledger;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

const GITIGNORE_ALL: &str = "*\n";

/// Create everything a fetch run expects. Safe to call repeatedly.
pub async fn initialize(config: &Config) -> Result<()> {
    initialize_db(&config.database_path).await?;
    initialize_dir(&config.download_dir)?;
    initialize_dir(&config.log_dir)?;
    Ok(())
}

/// Create the ledger schema, and ignore the ledger directory in git
pub async fn initialize_db(database_path: &Path) -> Result<()> {
    let ledger = Ledger::open(database_path)
        .await
        .with_context(|| format!("Cannot initialize ledger: {}", database_path.display()))?;
    ledger.close().await;

    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            write_gitignore(parent)?;
        }
    }

    info!("Ledger ready at {}", database_path.display());
    Ok(())
}

/// Create `dir` if needed and ignore its contents in git
pub fn initialize_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create directory: {}", dir.display()))?;
    write_gitignore(dir)?;
    info!("Directory ready at {}", dir.display());
    Ok(())
}

/// Write a catch-all `.gitignore` unless one exists or `dir` is the working
/// directory, which usually is the project checkout itself
fn write_gitignore(dir: &Path) -> Result<()> {
    let path = dir.join(".gitignore");
    if path.exists() {
        debug!("Keeping existing {}", path.display());
        return Ok(());
    }
    if is_current_dir(dir) {
        debug!("Not ignoring the working directory {}", dir.display());
        return Ok(());
    }
    std::fs::write(&path, GITIGNORE_ALL)
        .with_context(|| format!("Cannot write {}", path.display()))
}

fn is_current_dir(dir: &Path) -> bool {
    match (dir.canonicalize(), std::env::current_dir().and_then(|d| d.canonicalize())) {
        (Ok(dir), Ok(cwd)) => dir == cwd,
        _ => false,
    }
}

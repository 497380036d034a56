//! `uninstall`: forget credentials and remove local state.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ClientResult;

/// Removes the stored tokens, then each directory in `dirs` that exists.
///
/// Returns the paths that were actually removed.
pub fn run(token_path: Option<&Path>, dirs: &[PathBuf]) -> ClientResult<Vec<PathBuf>> {
    let mut removed = Vec::new();

    if let Some(path) = token_path
        && path.exists()
    {
        clear_tokens(path)?;
        removed.push(path.to_path_buf());
    }

    for dir in dirs {
        if dir.is_dir() {
            std::fs::remove_dir_all(dir)?;
            info!("removed {}", dir.display());
            removed.push(dir.clone());
        }
    }

    if removed.is_empty() {
        println!("Nothing to remove.");
    }
    for path in &removed {
        println!("Removed {}", path.display());
    }
    Ok(removed)
}

#[cfg(feature = "google")]
fn clear_tokens(path: &Path) -> ClientResult<()> {
    calend_providers::google::TokenStorage::new(path).clear()?;
    Ok(())
}

#[cfg(not(feature = "google"))]
fn clear_tokens(path: &Path) -> ClientResult<()> {
    std::fs::remove_file(path)?;
    Ok(())
}

use std::path::{Path, PathBuf};

use clap::Args;
use constants::{EXIT_SUCCESS, MAX_RECENT_FILES};
use serde::{Deserialize, Serialize};

#[derive(Args, Clone, Debug)]
pub struct RecentArgs {
    #[arg(long, help = "Clear the recent files list.")]
    clear: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredEntries {
    files: Vec<PathBuf>,
}

/// Persisted most-recent-first list of opened report files.
///
/// Capped, de-duplicated, and tolerant of a missing or corrupt backing
/// file (which degrades to an empty list rather than an error).
#[derive(Debug, Clone)]
pub struct RecentStore {
    path: Option<PathBuf>,
    files: Vec<PathBuf>,
}

impl RecentStore {
    pub fn open() -> Self {
        Self::at(default_store_path())
    }

    pub fn at(path: Option<PathBuf>) -> Self {
        let files = path
            .as_deref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|contents| serde_json::from_str::<StoredEntries>(&contents).ok())
            .map(|stored| {
                stored
                    .files
                    .into_iter()
                    // Stale entries pointing at deleted files are not worth showing.
                    .filter(|f| f.exists())
                    .take(MAX_RECENT_FILES)
                    .collect()
            })
            .unwrap_or_default();
        RecentStore { path, files }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Moves (or inserts) a path at the front of the list.
    pub fn touch(&mut self, path: &Path) {
        let path = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        self.files.retain(|existing| existing != &path);
        self.files.insert(0, path);
        self.files.truncate(MAX_RECENT_FILES);
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Best-effort persistence: a save failure costs the recent list, not
    /// the command.
    pub fn save(&self) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(e) = self.try_save(path) {
            log::warn!("could not save recent files to {}: {:#}", path.display(), e);
        }
    }

    fn try_save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredEntries {
            files: self.files.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }
}

fn default_store_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("junit-viewer").join("recent.json"))
}

pub fn run_recent(args: RecentArgs) -> anyhow::Result<i32> {
    let mut store = RecentStore::open();

    if args.clear {
        store.clear();
        store.save();
        println!("Cleared recent files.");
        return Ok(EXIT_SUCCESS);
    }

    if store.files().is_empty() {
        println!("No recent files.");
        return Ok(EXIT_SUCCESS);
    }

    for file in store.files() {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        println!("{}\t{}", name, file.display());
    }
    Ok(EXIT_SUCCESS)
}

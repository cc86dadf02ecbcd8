//! Locating and reading Steam's on-disk status artifacts.
//!
//! Steam leaves several read-only traces of download activity: rotating
//! content logs under `logs/`, the library config under `config/`, and a
//! per-app staging directory under `steamapps/downloading/`. All of them
//! come and go as the client runs, so every miss here is an `Option`, not
//! an error.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Trailing lines retained from a log-style artifact. Current-state
/// information lives at the end of the log; capping the tail bounds read
/// cost on multi-megabyte files, at the price of missing an old boundary
/// event that scrolled out of the window.
pub const TAIL_LINES: usize = 200;

/// Which on-disk source an artifact's text came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactSource {
    ContentLog,
    LibraryConfig,
}

#[derive(Clone, Debug)]
pub struct ArtifactContent {
    pub source: ArtifactSource,
    pub text: String,
}

/// Read the freshest relevant artifact under `root`. Content logs are
/// preferred over the library config; missing or empty files fall through
/// to the next candidate.
pub fn read_relevant_artifact(root: &Path) -> Option<ArtifactContent> {
    if let Some(log) = latest_content_log(&root.join("logs")) {
        debug!(path = %log.display(), "reading content log tail");
        if let Some(text) = read_lossy(&log) {
            return Some(ArtifactContent {
                source: ArtifactSource::ContentLog,
                text: tail(&text, TAIL_LINES),
            });
        }
    }

    let vdf = root.join("config").join("libraryfolders.vdf");
    read_lossy(&vdf).map(|text| ArtifactContent {
        source: ArtifactSource::LibraryConfig,
        text,
    })
}

/// AppIDs with an in-flight staging directory under `steamapps/downloading`.
/// An entry here means the client has started (though possibly paused)
/// a download for that app.
pub fn active_download_ids(root: &Path) -> Vec<String> {
    let dir = root.join("steamapps").join("downloading");
    let mut ids = Vec::new();
    if let Ok(entries) = fs::read_dir(&dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
                ids.push(name);
            }
        }
    }
    ids.sort();
    ids
}

/// Pick the rotation candidate with the lexicographically greatest name.
/// Steam's rotation suffixes sort in time order, so the max is the newest;
/// this avoids trusting mtimes that copy tools are known to mangle.
fn latest_content_log(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("content_log") && n.ends_with(".txt"))
        })
        .collect();
    candidates.sort();
    candidates.pop()
}

/// Read a file replacing undecodable bytes. Empty or whitespace-only
/// content counts as absent.
fn read_lossy(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Last `n` lines of `text`.
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

//! Directory scan producing an immutable [`ProjectIndex`] snapshot.
//!
//! The walk builds everything into local structures and only returns a
//! finished index. Callers publish it by swapping an `Arc`, so readers of the
//! previous snapshot never see a half-built one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ProjectConfig;

use super::symbols::{self, Language, Symbol, SymbolKind};

/// Bytes inspected for NUL when deciding whether a file is binary.
const BINARY_PROBE_BYTES: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),
    #[error("scan cancelled")]
    Cancelled,
}

/// One indexed file. Never mutated after the scan that created it.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub abs_path: PathBuf,
    /// Root-relative, always `/`-separated.
    pub rel_path: String,
    pub size: u64,
    /// Lowercase with leading dot, or empty.
    pub extension: String,
    pub lines: usize,
    pub symbols: Vec<Symbol>,
    pub scanned_at: DateTime<Utc>,
}

impl FileInfo {
    pub fn basename(&self) -> &str {
        self.rel_path.rsplit('/').next().unwrap_or(&self.rel_path)
    }

    /// Basename without its extension.
    pub fn stem(&self) -> &str {
        let name = self.basename();
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[..pos],
            _ => name,
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().filter(|s| s.kind == SymbolKind::Class).map(|s| s.name.as_str())
    }

    fn same_content(&self, other: &FileInfo) -> bool {
        self.abs_path == other.abs_path
            && self.rel_path == other.rel_path
            && self.size == other.size
            && self.extension == other.extension
            && self.lines == other.lines
            && self.symbols == other.symbols
    }
}

/// Counters for one scan. Skips are not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files: usize,
    pub skipped_extension: usize,
    pub skipped_size: usize,
    pub skipped_binary: usize,
    pub unreadable: usize,
    pub ignored_dirs: usize,
}

/// Snapshot of one scan.
#[derive(Debug, Clone)]
pub struct ProjectIndex {
    pub root: PathBuf,
    /// Keyed by relative path; ordered, so iteration is deterministic.
    pub files: BTreeMap<String, FileInfo>,
    pub scanned_at: DateTime<Utc>,
    pub stats: ScanStats,
}

impl ProjectIndex {
    /// An index with no files, used before the first scan.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
            scanned_at: Utc::now(),
            stats: ScanStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_lines(&self) -> usize {
        self.files.values().map(|f| f.lines).sum()
    }

    /// Root directory name for display.
    pub fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    /// Extension counts, most common first, ties by extension.
    pub fn extension_counts(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for info in self.files.values() {
            *counts.entry(info.extension.as_str()).or_default() += 1;
        }
        let mut counts: Vec<(String, usize)> =
            counts.into_iter().map(|(ext, n)| (ext.to_string(), n)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Equality of indexed content, ignoring scan timestamps.
    pub fn content_eq(&self, other: &ProjectIndex) -> bool {
        self.root == other.root
            && self.files.len() == other.files.len()
            && self
                .files
                .iter()
                .zip(other.files.iter())
                .all(|((ka, a), (kb, b))| ka == kb && a.same_content(b))
    }
}

/// Filters applied during a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_file_size: u64,
    /// Normalized extensions (`".py"`).
    pub extensions: Vec<String>,
    /// Directory names, or `*.suffix` patterns.
    pub ignore_dirs: Vec<String>,
}

impl ScanOptions {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            extensions: config.extensions.clone(),
            ignore_dirs: config.ignore_dirs.clone(),
        }
    }

    fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => pattern == name,
        })
    }

    fn allows_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

/// Lowercase extension with leading dot, or `""`.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Scan `root` on a blocking thread.
pub async fn scan(
    root: PathBuf,
    options: ScanOptions,
    cancel: CancellationToken,
) -> Result<ProjectIndex, ScanError> {
    tokio::task::spawn_blocking(move || scan_blocking(&root, &options, &cancel))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "scan task failed");
            Err(ScanError::Cancelled)
        })
}

/// Walk `root` and build a complete index.
///
/// Checks `cancel` between entries; a cancelled scan returns
/// [`ScanError::Cancelled`] and nothing partial.
pub fn scan_blocking(
    root: &Path,
    options: &ScanOptions,
    cancel: &CancellationToken,
) -> Result<ProjectIndex, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::InvalidRoot(root.to_path_buf()));
    }

    let started = Utc::now();
    let mut files = BTreeMap::new();
    let mut stats = ScanStats::default();

    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name().into_iter();
    let mut ignored_dirs = 0usize;
    let walker = walker.filter_entry(|entry| {
        if entry.depth() > 0 && entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            if options.is_ignored_dir(&name) {
                ignored_dirs += 1;
                return false;
            }
        }
        true
    });

    for entry in walker {
        if cancel.is_cancelled() {
            info!(root = %root.display(), "scan cancelled");
            return Err(ScanError::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                stats.unreadable += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(info) = index_file(root, &entry, options, &mut stats) {
            files.insert(info.rel_path.clone(), info);
        }
    }

    stats.ignored_dirs = ignored_dirs;
    stats.files = files.len();
    info!(
        root = %root.display(),
        files = stats.files,
        skipped_extension = stats.skipped_extension,
        skipped_size = stats.skipped_size,
        skipped_binary = stats.skipped_binary,
        unreadable = stats.unreadable,
        "scan complete"
    );

    Ok(ProjectIndex { root: root.to_path_buf(), files, scanned_at: started, stats })
}

fn index_file(
    root: &Path,
    entry: &DirEntry,
    options: &ScanOptions,
    stats: &mut ScanStats,
) -> Option<FileInfo> {
    let path = entry.path();
    let extension = extension_of(path);
    if !options.allows_extension(&extension) {
        stats.skipped_extension += 1;
        return None;
    }

    let size = match entry.metadata() {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot stat file");
            stats.unreadable += 1;
            return None;
        }
    };
    if size > options.max_file_size {
        debug!(path = %path.display(), size, "skipping large file");
        stats.skipped_size += 1;
        return None;
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read file");
            stats.unreadable += 1;
            return None;
        }
    };
    if bytes[..bytes.len().min(BINARY_PROBE_BYTES)].contains(&0) {
        debug!(path = %path.display(), "skipping binary file");
        stats.skipped_binary += 1;
        return None;
    }

    let text = String::from_utf8_lossy(&bytes);
    let symbols = Language::from_extension(&extension)
        .map(|lang| symbols::extract(&text, lang))
        .unwrap_or_default();

    Some(FileInfo {
        abs_path: path.to_path_buf(),
        rel_path: relative_path(root, path),
        size,
        extension,
        lines: text.lines().count(),
        symbols,
        scanned_at: Utc::now(),
    })
}

/// `/`-separated path of `path` relative to `root`.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

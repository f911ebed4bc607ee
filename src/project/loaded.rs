//! Files currently held in the LLM context.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::index::ProjectIndex;
use super::resolver::FileMatch;

const PREVIEW_LINES: usize = 15;
const PREVIEW_WIDTH: usize = 100;
/// Most bytes read for one loaded file, unless the index limit is higher.
const READ_LIMIT: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read file: {0}")]
    Io(#[from] io::Error),
    #[error("binary file")]
    Binary,
}

#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub text: String,
    pub lines: usize,
    /// Came from the index rather than a literal path.
    pub indexed: bool,
    /// Larger than the configured index limit.
    pub oversized: bool,
    /// Only the first `read_limit` bytes were read.
    pub clipped: bool,
    read_limit: u64,
}

/// Read at most `limit` bytes of `path`; the flag is set when there was more.
fn read_capped(path: &Path, limit: u64) -> io::Result<(Vec<u8>, bool)> {
    let mut bytes = Vec::new();
    fs::File::open(path)?.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    let clipped = bytes.len() as u64 > limit;
    if clipped {
        bytes.truncate(limit as usize);
    }
    Ok((bytes, clipped))
}

impl LoadedFile {
    /// Read `m` from disk, at most `max(max_file_size, 1 MiB)` bytes.
    pub fn read(m: &FileMatch, max_file_size: u64) -> Result<Self, LoadError> {
        let read_limit = max_file_size.max(READ_LIMIT);
        let (bytes, clipped) = read_capped(&m.abs_path, read_limit)?;
        if bytes[..bytes.len().min(8 * 1024)].contains(&0) {
            return Err(LoadError::Binary);
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self {
            rel_path: m.rel_path.clone(),
            abs_path: m.abs_path.clone(),
            lines: text.lines().count(),
            oversized: clipped || bytes.len() as u64 > max_file_size,
            clipped,
            read_limit,
            text,
            indexed: m.indexed,
        })
    }

    pub fn basename(&self) -> &str {
        self.rel_path.rsplit('/').next().unwrap_or(&self.rel_path)
    }

    /// Extension without the dot, for fenced code blocks.
    pub fn fence_language(&self) -> &str {
        match self.basename().rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext,
            _ => "",
        }
    }

    /// First lines, numbered and clipped, for the load confirmation.
    pub fn preview(&self) -> String {
        let mut out: Vec<String> = self
            .text
            .lines()
            .take(PREVIEW_LINES)
            .enumerate()
            .map(|(i, line)| {
                let clipped: String = line.chars().take(PREVIEW_WIDTH).collect();
                format!("{:4} {clipped}", i + 1)
            })
            .collect();
        if self.lines > PREVIEW_LINES {
            out.push(format!("  ... ({} more lines)", self.lines - PREVIEW_LINES));
        }
        out.join("\n")
    }
}

/// Ordered set of loaded files, keyed by relative path.
#[derive(Debug, Default)]
pub struct LoadedFileSet {
    files: Vec<LoadedFile>,
}

impl LoadedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedFile> {
        self.files.iter()
    }

    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.lines).sum()
    }

    /// Add or replace. Returns false when the path was already loaded; the
    /// entry keeps its position with the new text.
    pub fn insert(&mut self, file: LoadedFile) -> bool {
        match self.files.iter_mut().find(|f| f.rel_path == file.rel_path) {
            Some(existing) => {
                *existing = file;
                false
            }
            None => {
                self.files.push(file);
                true
            }
        }
    }

    /// Remove the entry best matching `name`: exact path or basename first,
    /// then a case-insensitive substring of the path.
    pub fn remove_matching(&mut self, name: &str) -> Option<LoadedFile> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let exact = self.files.iter().position(|f| {
            f.rel_path.to_lowercase() == needle || f.basename().to_lowercase() == needle
        });
        let pos = exact.or_else(|| {
            self.files.iter().position(|f| f.rel_path.to_lowercase().contains(&needle))
        })?;
        Some(self.files.remove(pos))
    }

    /// Remove everything; returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.files.len();
        self.files.clear();
        n
    }

    /// Re-read every entry from disk. Entries that can no longer be read are
    /// dropped and their paths returned.
    pub fn refresh(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        self.files.retain_mut(|f| match read_capped(&f.abs_path, f.read_limit) {
            Ok((bytes, clipped)) => {
                f.text = String::from_utf8_lossy(&bytes).into_owned();
                f.lines = f.text.lines().count();
                f.clipped = clipped;
                true
            }
            Err(e) => {
                debug!(path = %f.rel_path, error = %e, "loaded file vanished");
                dropped.push(f.rel_path.clone());
                false
            }
        });
        dropped
    }

    /// Drop entries made stale by a new index: indexed files that are no
    /// longer in it, and anything missing from disk.
    pub fn reconcile(&mut self, index: &ProjectIndex) -> Vec<String> {
        let mut dropped = Vec::new();
        self.files.retain(|f| {
            let keep = f.abs_path.is_file() && (!f.indexed || index.files.contains_key(&f.rel_path));
            if !keep {
                dropped.push(f.rel_path.clone());
            }
            keep
        });
        if !dropped.is_empty() {
            info!(count = dropped.len(), "dropped stale loaded files after rescan");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::resolver::MatchTier;

    fn file_match(dir: &std::path::Path, rel: &str, body: &str) -> FileMatch {
        let abs = dir.join(rel);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&abs, body).unwrap();
        FileMatch { rel_path: rel.to_string(), abs_path: abs, tier: MatchTier::Exact, indexed: true }
    }

    #[test]
    fn insert_keeps_order_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = LoadedFileSet::new();
        assert!(set.insert(LoadedFile::read(&file_match(dir.path(), "a.py", "1\n"), 1000).unwrap()));
        assert!(set.insert(LoadedFile::read(&file_match(dir.path(), "b.py", "1\n2\n"), 1000).unwrap()));
        assert!(!set.insert(LoadedFile::read(&file_match(dir.path(), "a.py", "x\ny\nz\n"), 1000).unwrap()));

        let order: Vec<&str> = set.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(order, vec!["a.py", "b.py"]);
        assert_eq!(set.total_lines(), 5);
    }

    #[test]
    fn remove_prefers_exact_basename() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = LoadedFileSet::new();
        set.insert(LoadedFile::read(&file_match(dir.path(), "src/module_util.py", ""), 1000).unwrap());
        set.insert(LoadedFile::read(&file_match(dir.path(), "src/module.py", ""), 1000).unwrap());

        let removed = set.remove_matching("module.py").unwrap();
        assert_eq!(removed.rel_path, "src/module.py");
        assert_eq!(set.remove_matching("util").unwrap().rel_path, "src/module_util.py");
        assert!(set.remove_matching("util").is_none());
    }

    #[test]
    fn clear_empties() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = LoadedFileSet::new();
        set.insert(LoadedFile::read(&file_match(dir.path(), "a.py", ""), 1000).unwrap());
        assert_eq!(set.clear(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn refresh_rereads_and_drops_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = LoadedFileSet::new();
        let a = file_match(dir.path(), "a.py", "old\n");
        set.insert(LoadedFile::read(&a, 1000).unwrap());
        set.insert(LoadedFile::read(&file_match(dir.path(), "b.py", ""), 1000).unwrap());

        fs::write(&a.abs_path, "new\nlines\n").unwrap();
        fs::remove_file(dir.path().join("b.py")).unwrap();

        assert_eq!(set.refresh(), vec!["b.py"]);
        let a = set.iter().next().unwrap();
        assert_eq!(a.text, "new\nlines\n");
        assert_eq!(a.lines, 2);
    }

    #[test]
    fn binary_and_oversized() {
        let dir = tempfile::tempdir().unwrap();
        let bin = file_match(dir.path(), "img.png", "\u{0}\u{0}PNG");
        assert!(matches!(LoadedFile::read(&bin, 1000), Err(LoadError::Binary)));
        let big = LoadedFile::read(&file_match(dir.path(), "big.txt", &"x".repeat(50)), 10).unwrap();
        assert!(big.oversized);
        assert!(!big.clipped);
        assert_eq!(big.text.len(), 50);
    }

    #[test]
    fn huge_file_read_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let body = "x".repeat(READ_LIMIT as usize + 100);
        let huge = LoadedFile::read(&file_match(dir.path(), "huge.log", &body), 10).unwrap();
        assert!(huge.clipped);
        assert!(huge.oversized);
        assert_eq!(huge.text.len(), READ_LIMIT as usize);

        let mut set = LoadedFileSet::new();
        set.insert(huge);
        assert!(set.refresh().is_empty());
        let again = set.iter().next().unwrap();
        assert!(again.clipped);
        assert_eq!(again.text.len(), READ_LIMIT as usize);
    }

    #[test]
    fn preview_is_numbered_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (1..=20).map(|i| format!("line {i}\n")).collect();
        let f = LoadedFile::read(&file_match(dir.path(), "long.txt", &body), 10_000).unwrap();
        let preview = f.preview();
        assert!(preview.starts_with("   1 line 1"));
        assert!(preview.ends_with("... (5 more lines)"));
        assert_eq!(f.fence_language(), "txt");
    }
}

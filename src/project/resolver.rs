//! Spoken-name → file resolution.
//!
//! Five tiers, tried in order; the first tier with any candidate decides the
//! outcome. Nothing is merged across tiers.
//!
//! 1. basename equals the name (or the basename without extension)
//! 2. basename contains the name; shortest path wins, equal shortest is ambiguous
//! 3. a declared symbol equals the name (spaces and underscores ignored)
//! 4. the relative path contains the name
//! 5. the name is an existing path on disk, indexed or not

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::expand_home;

use super::index::{relative_path, FileInfo, ProjectIndex};
use super::symbols::SymbolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact = 1,
    PartialName = 2,
    Symbol = 3,
    PartialPath = 4,
    Literal = 5,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchTier::Exact => "exact name",
            MatchTier::PartialName => "partial name",
            MatchTier::Symbol => "symbol",
            MatchTier::PartialPath => "partial path",
            MatchTier::Literal => "literal path",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub tier: MatchTier,
    /// False for tier-5 hits outside the index.
    pub indexed: bool,
}

impl FileMatch {
    fn indexed(info: &FileInfo, tier: MatchTier) -> Self {
        Self {
            rel_path: info.rel_path.clone(),
            abs_path: info.abs_path.clone(),
            tier,
            indexed: true,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("{} files match by {tier}", candidates.len())]
    Ambiguous { tier: MatchTier, candidates: Vec<FileMatch> },
    #[error("no file matching '{0}'")]
    NotFound(String),
}

/// Clean up speech-to-text spellings: `"module dot py"` → `"module.py"`,
/// `"project slash module"` → `"project/module"`.
pub fn normalize_spoken(name: &str) -> String {
    let trimmed = name.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let mut out = trimmed.replace('\\', "/");
    for (spoken, written) in [(" dot ", "."), (" slash ", "/"), (" punt ", ".")] {
        out = out.replace(spoken, written);
    }
    out.trim_end_matches(['.', '?', '!']).trim().to_string()
}

fn symbol_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolve `spoken` against `index`.
pub fn resolve(spoken: &str, index: &ProjectIndex) -> Result<FileMatch, ResolveError> {
    let name = normalize_spoken(spoken);
    if name.is_empty() {
        return Err(ResolveError::NotFound(spoken.trim().to_string()));
    }
    let lower = name.to_lowercase();

    // Tier 1.
    let hits: Vec<&FileInfo> = index
        .files
        .values()
        .filter(|f| {
            let base = f.basename().to_lowercase();
            base == lower || f.stem().to_lowercase() == lower
        })
        .collect();
    if !hits.is_empty() {
        return decide(hits, MatchTier::Exact);
    }

    // Tier 2, with the shortest-path tie-break.
    let mut hits: Vec<&FileInfo> =
        index.files.values().filter(|f| f.basename().to_lowercase().contains(&lower)).collect();
    if !hits.is_empty() {
        rank(&mut hits);
        if hits.len() == 1 || path_chars(hits[0]) < path_chars(hits[1]) {
            return Ok(FileMatch::indexed(hits[0], MatchTier::PartialName));
        }
        return decide(hits, MatchTier::PartialName);
    }

    // Tier 3.
    let key = symbol_key(&name);
    if !key.is_empty() {
        let hits: Vec<&FileInfo> = index
            .files
            .values()
            .filter(|f| f.symbols.iter().any(|s| symbol_key(&s.name) == key))
            .collect();
        if !hits.is_empty() {
            return decide(hits, MatchTier::Symbol);
        }
    }

    // Tier 4.
    let path_query = lower.trim_matches('/');
    if !path_query.is_empty() {
        let hits: Vec<&FileInfo> = index
            .files
            .values()
            .filter(|f| f.rel_path.to_lowercase().contains(path_query))
            .collect();
        if !hits.is_empty() {
            return decide(hits, MatchTier::PartialPath);
        }
    }

    // Tier 5 keeps the original case: filesystems may be case-sensitive.
    let candidate = expand_home(&name);
    let candidate = if candidate.is_absolute() { candidate } else { index.root.join(candidate) };
    if candidate.is_file() {
        let rel_path = if candidate.starts_with(&index.root) {
            relative_path(&index.root, &candidate)
        } else {
            candidate.display().to_string()
        };
        let indexed = index.files.contains_key(&rel_path);
        return Ok(FileMatch { rel_path, abs_path: candidate, tier: MatchTier::Literal, indexed });
    }

    Err(ResolveError::NotFound(name))
}

fn path_chars(f: &FileInfo) -> usize {
    f.rel_path.chars().count()
}

/// Shortest relative path (in characters) first, then alphabetical.
fn rank(hits: &mut [&FileInfo]) {
    hits.sort_by(|a, b| path_chars(a).cmp(&path_chars(b)).then_with(|| a.rel_path.cmp(&b.rel_path)));
}

fn decide(mut hits: Vec<&FileInfo>, tier: MatchTier) -> Result<FileMatch, ResolveError> {
    if hits.len() == 1 {
        return Ok(FileMatch::indexed(hits[0], tier));
    }
    rank(&mut hits);
    Err(ResolveError::Ambiguous {
        tier,
        candidates: hits.into_iter().map(|f| FileMatch::indexed(f, tier)).collect(),
    })
}

// ── find ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    File,
    Class,
    Function,
}

impl HitKind {
    pub fn marker(self) -> char {
        match self {
            HitKind::File => 'F',
            HitKind::Class => 'C',
            HitKind::Function => 'f',
        }
    }
}

impl From<SymbolKind> for HitKind {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Class => HitKind::Class,
            SymbolKind::Function => HitKind::Function,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub kind: HitKind,
    pub name: String,
    pub rel_path: String,
    pub line: Option<usize>,
}

/// Every basename and symbol containing `query`, case-insensitive, in index
/// order.
pub fn search(query: &str, index: &ProjectIndex) -> Vec<SearchHit> {
    let needle = normalize_spoken(query).to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut hits = Vec::new();
    for info in index.files.values() {
        if info.basename().to_lowercase().contains(&needle) {
            hits.push(SearchHit {
                kind: HitKind::File,
                name: info.basename().to_string(),
                rel_path: info.rel_path.clone(),
                line: None,
            });
        }
        for sym in info.symbols.iter().filter(|s| s.name.to_lowercase().contains(&needle)) {
            hits.push(SearchHit {
                kind: sym.kind.into(),
                name: sym.name.clone(),
                rel_path: info.rel_path.clone(),
                line: Some(sym.line),
            });
        }
    }
    hits
}

//! Text renderings of a [`ProjectIndex`]: the compact listing used in LLM
//! context, its top-level summary, and the ASCII tree shown to the user.

use std::collections::BTreeMap;

use super::index::{FileInfo, ProjectIndex};

/// Classes shown next to a file name.
const CLASSES_SHOWN: usize = 3;
/// Extensions named in the totals line.
const EXTENSIONS_SHOWN: usize = 5;

fn class_note(info: &FileInfo) -> Option<String> {
    let classes: Vec<&str> = info.classes().take(CLASSES_SHOWN).collect();
    if classes.is_empty() { None } else { Some(format!("[{}]", classes.join(", "))) }
}

/// One line per file: relative path, optionally followed by its classes.
pub fn compact_listing(index: &ProjectIndex) -> Vec<String> {
    index
        .files
        .values()
        .map(|info| match class_note(info) {
            Some(note) => format!("{}  {note}", info.rel_path),
            None => info.rel_path.clone(),
        })
        .collect()
}

/// Top-level directories with file counts, then root-level files.
pub fn summary_listing(index: &ProjectIndex) -> Vec<String> {
    let mut dirs: BTreeMap<&str, usize> = BTreeMap::new();
    let mut root_files = Vec::new();
    for rel in index.files.keys() {
        match rel.split_once('/') {
            Some((top, _)) => *dirs.entry(top).or_default() += 1,
            None => root_files.push(rel.clone()),
        }
    }
    dirs.into_iter()
        .map(|(dir, n)| format!("{dir}/  ({n} files)"))
        .chain(root_files)
        .collect()
}

/// "`N files, M lines (3 .py, 1 .md)`"
pub fn totals_line(index: &ProjectIndex) -> String {
    let exts: Vec<String> = index
        .extension_counts()
        .into_iter()
        .take(EXTENSIONS_SHOWN)
        .map(|(ext, n)| if ext.is_empty() { format!("{n} other") } else { format!("{n} {ext}") })
        .collect();
    format!("{} files, {} lines ({})", index.files.len(), index.total_lines(), exts.join(", "))
}

/// Directory-grouped ASCII tree followed by the totals line.
pub fn ascii_tree(index: &ProjectIndex) -> String {
    let mut groups: BTreeMap<&str, Vec<&FileInfo>> = BTreeMap::new();
    for info in index.files.values() {
        let dir = info.rel_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        groups.entry(dir).or_default().push(info);
    }

    let mut out = format!("{}/\n", index.root_name());
    let root_files = groups.remove("").unwrap_or_default();
    let total = root_files.len() + groups.len();
    let mut position = 0;

    for info in root_files {
        position += 1;
        let branch = if position == total { "└── " } else { "├── " };
        out.push_str(&file_line(branch, info));
    }

    for (dir, files) in groups {
        position += 1;
        let last_group = position == total;
        let (branch, indent) = if last_group { ("└── ", "    ") } else { ("├── ", "│   ") };
        out.push_str(&format!("{branch}{dir}/\n"));
        let count = files.len();
        for (i, info) in files.into_iter().enumerate() {
            let leaf = if i + 1 == count { "└── " } else { "├── " };
            out.push_str(&file_line(&format!("{indent}{leaf}"), info));
        }
    }

    out.push('\n');
    out.push_str(&totals_line(index));
    out
}

fn file_line(prefix: &str, info: &FileInfo) -> String {
    match class_note(info) {
        Some(note) => format!("{prefix}{}  {note}\n", info.basename()),
        None => format!("{prefix}{}\n", info.basename()),
    }
}

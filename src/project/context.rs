//! Character-budgeted LLM context.
//!
//! Output order is fixed: project tree, loaded files, git summary. Budget is
//! handed out in a different order: loaded files first, then the tree (full
//! listing, else top-level summary, else whole lines of the summary), then
//! git. A component that does not fit is cut with [`TRUNCATION_MARKER`].
//! The result never exceeds `max_chars` characters.

use tracing::{debug, warn};

use super::index::ProjectIndex;
use super::loaded::{LoadedFile, LoadedFileSet};
use super::tree;

pub const TRUNCATION_MARKER: &str = "...truncated";
const SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    pub text: String,
    /// Something was cut or left out to fit the budget.
    pub truncated: bool,
    /// The tree was reduced to top-level directories.
    pub tree_summarized: bool,
    /// Loaded files that got no room at all.
    pub omitted_files: Vec<String>,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn file_block(file: &LoadedFile, body: &str) -> String {
    let body = body.strip_suffix('\n').unwrap_or(body);
    format!("[FILE: {}]\n```{}\n{}\n```", file.rel_path, file.fence_language(), body)
}

/// Full block if it fits in `room`, else a cut block, else `None`.
fn fit_file(file: &LoadedFile, room: usize) -> Option<(String, bool)> {
    let full = file_block(file, &file.text);
    if char_len(&full) <= room {
        return Some((full, false));
    }
    let overhead = char_len(&file_block(file, &format!("\n{TRUNCATION_MARKER}")));
    if overhead > room {
        return None;
    }
    let body = format!("{}\n{TRUNCATION_MARKER}", take_chars(&file.text, room - overhead));
    Some((file_block(file, &body), true))
}

fn tree_header(index: &ProjectIndex) -> Vec<String> {
    vec![format!("[PROJECT: {}]", index.root_name()), format!("Files: {}", tree::totals_line(index))]
}

/// Whole lines from `lines` that fit in `room`, plus a marker line if any
/// were dropped and the marker fits.
fn fit_lines(lines: &[String], room: usize) -> String {
    let mut out = String::new();
    for line in lines {
        let extra = if out.is_empty() { char_len(line) } else { char_len(line) + 1 };
        if char_len(&out) + extra > room {
            let marker_extra = if out.is_empty() { TRUNCATION_MARKER.len() } else { TRUNCATION_MARKER.len() + 1 };
            if char_len(&out) + marker_extra <= room {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(TRUNCATION_MARKER);
            }
            return out;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

/// Assemble context for one LLM request.
pub fn build(
    index: &ProjectIndex,
    loaded: &LoadedFileSet,
    git: Option<&str>,
    max_chars: usize,
) -> AssembledContext {
    let sep = SEPARATOR.len();
    let mut remaining = max_chars;
    let mut ctx = AssembledContext::default();

    // Loaded files get first claim. Every section reserves one separator.
    let mut file_parts = Vec::new();
    for file in loaded.iter() {
        match remaining.checked_sub(sep).and_then(|room| fit_file(file, room)) {
            Some((block, cut)) => {
                remaining -= char_len(&block) + sep;
                if cut {
                    debug!(file = %file.rel_path, "loaded file truncated to fit context");
                    ctx.truncated = true;
                }
                file_parts.push(block);
            }
            None => {
                ctx.truncated = true;
                ctx.omitted_files.push(file.rel_path.clone());
            }
        }
    }

    // Then the tree.
    let mut full = tree_header(index);
    full.extend(tree::compact_listing(index));
    let full = full.join("\n");
    let tree_part = if char_len(&full) + sep <= remaining {
        full
    } else {
        ctx.tree_summarized = true;
        let mut summary = tree_header(index);
        summary.extend(tree::summary_listing(index));
        let joined = summary.join("\n");
        if char_len(&joined) + sep <= remaining {
            joined
        } else {
            ctx.truncated = true;
            fit_lines(&summary, remaining.saturating_sub(sep))
        }
    };
    remaining = remaining.saturating_sub(char_len(&tree_part) + sep);

    // Git last.
    let git_part = git.map(str::trim).filter(|g| !g.is_empty()).and_then(|g| {
        let block = format!("[GIT]\n{g}");
        if char_len(&block) + sep <= remaining {
            return Some(block);
        }
        ctx.truncated = true;
        let room = remaining.checked_sub(sep)?;
        let overhead = char_len("[GIT]\n\n") + TRUNCATION_MARKER.len();
        (room > overhead).then(|| format!("[GIT]\n{}\n{TRUNCATION_MARKER}", take_chars(g, room - overhead)))
    });

    let sections: Vec<String> = std::iter::once(tree_part)
        .chain(file_parts)
        .chain(git_part)
        .filter(|s| !s.is_empty())
        .collect();
    ctx.text = sections.join(SEPARATOR);

    // Accounting above keeps us in budget; clamp anyway so the bound holds.
    if char_len(&ctx.text) > max_chars {
        ctx.text = take_chars(&ctx.text, max_chars).to_string();
        ctx.truncated = true;
    }

    if ctx.truncated || ctx.tree_summarized {
        warn!(
            max_chars,
            used = char_len(&ctx.text),
            tree_summarized = ctx.tree_summarized,
            omitted = ctx.omitted_files.len(),
            "context truncated to fit budget"
        );
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::index::{scan_blocking, ScanOptions};
    use crate::project::resolver::resolve;
    use std::fs;
    use tokio_util::sync::CancellationToken;

    fn setup() -> (tempfile::TempDir, ProjectIndex, LoadedFileSet) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for d in ["alpha", "beta", "gamma"] {
            fs::create_dir_all(root.join(d)).unwrap();
            for i in 0..5 {
                fs::write(root.join(format!("{d}/file_{i}.py")), format!("class Thing{i}:\n    pass\n")).unwrap();
            }
        }
        fs::write(root.join("main.py"), "def main():\n    return 42\n").unwrap();
        let options = ScanOptions { max_file_size: 10_000, extensions: vec![".py".into()], ignore_dirs: vec![] };
        let index = scan_blocking(root, &options, &CancellationToken::new()).unwrap();
        let mut loaded = LoadedFileSet::new();
        let m = resolve("main.py", &index).unwrap();
        loaded.insert(LoadedFile::read(&m, 10_000).unwrap());
        (dir, index, loaded)
    }

    #[test]
    fn everything_fits_in_order() {
        let (_dir, index, loaded) = setup();
        let ctx = build(&index, &loaded, Some("1 modified"), 100_000);
        assert!(!ctx.truncated);
        assert!(!ctx.tree_summarized);
        let tree_pos = ctx.text.find("alpha/file_0.py  [Thing0]").unwrap();
        let file_pos = ctx.text.find("[FILE: main.py]\n```py\ndef main():").unwrap();
        let git_pos = ctx.text.find("[GIT]\n1 modified").unwrap();
        assert!(tree_pos < file_pos && file_pos < git_pos);
        assert!(ctx.text.starts_with("[PROJECT: "));
    }

    #[test]
    fn files_kept_whole_before_tree_is_summarized() {
        let (_dir, index, loaded) = setup();
        let full = build(&index, &loaded, None, 100_000).text;
        let budget = full.chars().count() - 40;
        let ctx = build(&index, &loaded, None, budget);
        assert!(ctx.tree_summarized);
        assert!(ctx.text.contains("alpha/  (5 files)"));
        assert!(ctx.text.contains("def main():\n    return 42\n```"));
        assert!(ctx.text.chars().count() <= budget);
    }

    #[test]
    fn tight_budget_cuts_file_with_marker() {
        let (_dir, index, loaded) = setup();
        // The whole main.py block is 51 chars; 48 leave room for a cut one.
        let ctx = build(&index, &loaded, None, 50);
        assert!(ctx.truncated);
        assert!(ctx.omitted_files.is_empty());
        assert!(ctx.text.starts_with("[FILE: main.py]\n```py\ndef main("), "{}", ctx.text);
        assert!(ctx.text.ends_with(&format!("\n{TRUNCATION_MARKER}\n```")), "{}", ctx.text);
        assert!(!ctx.text.contains("return 42"));
        assert!(ctx.text.chars().count() <= 50);
    }

    #[test]
    fn tree_dropped_when_files_use_the_budget() {
        let (_dir, index, loaded) = setup();
        // 51 for the block plus its separator leaves nothing for the tree.
        let ctx = build(&index, &loaded, None, 53);
        assert!(ctx.truncated);
        assert!(ctx.tree_summarized);
        assert!(!ctx.text.contains("[PROJECT: "));
        assert_eq!(ctx.text, "[FILE: main.py]\n```py\ndef main():\n    return 42\n```");
    }

    #[test]
    fn file_omitted_when_even_a_cut_block_does_not_fit() {
        let (_dir, index, loaded) = setup();
        let ctx = build(&index, &loaded, None, 30);
        assert!(ctx.truncated);
        assert_eq!(ctx.omitted_files, vec!["main.py"]);
        assert!(ctx.text.chars().count() <= 30);
    }

    #[test]
    fn never_exceeds_budget() {
        let (_dir, index, loaded) = setup();
        let git = "M alpha/file_0.py\n".repeat(30);
        for max in [0, 1, 10, 25, 60, 120, 250, 400, 800, 2_000, 10_000] {
            let ctx = build(&index, &loaded, Some(&git), max);
            assert!(ctx.text.chars().count() <= max, "budget {max} exceeded");
        }
    }

    #[test]
    fn whole_line_tree_truncation() {
        let lines: Vec<String> = vec!["aaaa".into(), "bbbb".into(), "cccc".into()];
        assert_eq!(fit_lines(&lines, 9), "aaaa\nbbbb");
        assert_eq!(fit_lines(&lines, 30), "aaaa\nbbbb\ncccc");
        let long: Vec<String> = vec!["aaaa".into(), "b".repeat(20)];
        assert_eq!(fit_lines(&long, 17), "aaaa\n...truncated");
    }
}

use std::path::{Path, PathBuf};

/// Directory depth explored below an order root when looking for inputs.
pub const MAX_SEARCH_DEPTH: usize = 4;

/// Breadth-first search below `root` (at most `max_depth` levels) for the first file accepted by
/// `accept`. Entries are visited in name order so results are deterministic.
pub fn find_file(
    root: &Path,
    max_depth: usize,
    mut accept: impl FnMut(&Path) -> bool,
) -> Option<PathBuf> {
    let mut level = vec![root.to_path_buf()];
    for _ in 0..=max_depth {
        let mut next = Vec::new();
        for dir in &level {
            for path in sorted_entries(dir) {
                if path.is_file() {
                    if accept(&path) {
                        return Some(path);
                    }
                } else if path.is_dir() {
                    next.push(path);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        level = next;
    }
    None
}

/// Files (not directories) directly inside `dir`, sorted by name. Unreadable dirs yield nothing.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .filter(|p| p.is_file())
        .collect()
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out: Vec<PathBuf> = rd.flatten().map(|e| e.path()).collect();
    out.sort();
    out
}

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Case-insensitive file-name equality.
pub fn file_name_eq(path: &Path, name: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.eq_ignore_ascii_case(name))
}

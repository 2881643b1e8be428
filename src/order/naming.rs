use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use crate::order::search::{files_in, has_extension};

/// Folder names that say nothing about the customer.
const GENERIC_FOLDER_NAMES: [&str; 3] = ["images", "img", "photos"];
const PHOTO_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "heic"];

/// Inputs to the output base-name derivation.
#[derive(Clone, Copy, Debug)]
pub struct NameSources<'a> {
    /// Order id used to recognise the customer's photo.
    pub order_id: &'a str,
    /// Directory holding the order record (scanned for photos).
    pub record_dir: &'a Path,
    /// Root folder of the order.
    pub order_root: &'a Path,
    /// Caller-supplied customer name.
    pub customer_hint: &'a str,
    /// Destination directory.
    pub output_dir: &'a Path,
}

/// Pick the human-readable part of the output name. First non-blank source wins:
/// a photo named after the order, the order folder, the caller's hint, the output folder.
pub fn derive_base_name(src: &NameSources<'_>) -> String {
    if let Some(name) = name_from_photos(src.record_dir, src.order_id) {
        return name;
    }
    if let Some(folder) = folder_name(src.order_root)
        && !GENERIC_FOLDER_NAMES
            .iter()
            .any(|g| folder.eq_ignore_ascii_case(g))
    {
        let s = sanitize_fragment(&folder);
        if !s.is_empty() {
            return s;
        }
    }
    let hint = sanitize_fragment(src.customer_hint);
    if !hint.is_empty() {
        return hint;
    }
    folder_name(src.output_dir)
        .map(|n| sanitize_fragment(&n))
        .unwrap_or_default()
}

/// `x<quantity><base>(<order id>) <suffix>.png`; the suffix part is omitted when blank.
pub fn output_file_name(quantity: u32, base: &str, order_id: &str, suffix: &str) -> String {
    output_file_name_with_copy(quantity, base, order_id, suffix, 1)
}

fn output_file_name_with_copy(
    quantity: u32,
    base: &str,
    order_id: &str,
    suffix: &str,
    copy: u32,
) -> String {
    let suffix = suffix.trim();
    let mut name = format!("x{quantity}{base}({order_id})");
    if !suffix.is_empty() {
        name.push(' ');
        name.push_str(suffix);
    }
    if copy > 1 {
        name.push_str(&format!(" ({copy})"));
    }
    name.push_str(".png");
    name
}

/// First path in `dir` built from the naming parts that neither exists on disk nor is in
/// `reserved`. Collisions get ` (2)`, ` (3)`, ... appended.
pub fn unique_output_path(
    dir: &Path,
    quantity: u32,
    base: &str,
    order_id: &str,
    suffix: &str,
    reserved: &HashSet<PathBuf>,
) -> PathBuf {
    let mut copy = 1;
    loop {
        let candidate = dir.join(output_file_name_with_copy(
            quantity, base, order_id, suffix, copy,
        ));
        if !candidate.exists() && !reserved.contains(&candidate) {
            return candidate;
        }
        copy += 1;
    }
}

fn name_from_photos(record_dir: &Path, order_id: &str) -> Option<String> {
    if order_id.is_empty() {
        return None;
    }
    files_in(record_dir)
        .into_iter()
        .filter(|p| has_extension(p, &PHOTO_EXTENSIONS))
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .filter_map(|stem| fragment_around(&stem, order_id))
        .next()
}

/// Text next to `order_id` inside `stem`, preferring what precedes it.
fn fragment_around(stem: &str, order_id: &str) -> Option<String> {
    let at = stem.find(order_id)?;
    let before = sanitize_fragment(&stem[..at]);
    if !before.is_empty() {
        return Some(before);
    }
    let after = sanitize_fragment(&stem[at + order_id.len()..]);
    (!after.is_empty()).then_some(after)
}

fn folder_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

/// Keep letters, digits, spaces, `'`, `-` and `&`; turn `_`/`.` into spaces, collapse runs of
/// whitespace and trim separators from both ends.
pub fn sanitize_fragment(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .filter_map(|c| match c {
            '_' | '.' => Some(' '),
            c if c.is_alphanumeric() || matches!(c, ' ' | '\'' | '-' | '&') => Some(c),
            _ => None,
        })
        .collect();
    let collapsed = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == '-' || c == ' ' || c == '&')
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/order/naming.rs"]
mod tests;

//! `font-family` fallback injection for attribute values and CSS text.

/// Families appended to every `font-family` list unless already present.
pub const DEFAULT_FALLBACK_FAMILIES: [&str; 4] =
    ["Noto Sans", "Noto Sans Symbols", "Noto Color Emoji", "DejaVu Sans"];

const GENERIC_FAMILIES: [&str; 8] = [
    "serif",
    "sans-serif",
    "cursive",
    "fantasy",
    "monospace",
    "system-ui",
    "emoji",
    "math",
];

/// Append the missing `fallbacks` to a comma-separated family list.
///
/// Comparison ignores case and quoting. Multi-word names are quoted with `quote`. Returns `None`
/// when nothing needs to be added.
pub fn append_fallback_families(list: &str, fallbacks: &[String], quote: char) -> Option<String> {
    let present: Vec<String> = split_families(list)
        .iter()
        .map(|f| family_key(f))
        .filter(|k| !k.is_empty())
        .collect();

    let mut additions = Vec::new();
    for fb in fallbacks {
        let key = family_key(fb);
        if key.is_empty() || present.contains(&key) || additions.iter().any(|(k, _)| *k == key) {
            continue;
        }
        additions.push((key, quote_family(fb.trim(), quote)));
    }
    if additions.is_empty() {
        return None;
    }

    let trimmed = list.trim_end();
    let mut out = String::with_capacity(list.len() + additions.len() * 16);
    out.push_str(trimmed);
    for (_, family) in additions {
        if !out.trim().is_empty() {
            out.push_str(", ");
        }
        out.push_str(&family);
    }
    out.push_str(&list[trimmed.len()..]);
    Some(out)
}

/// Rewrite every `font-family` declaration in a CSS fragment (inline `style` attribute or
/// `<style>` block body). Returns `None` when nothing changed.
pub fn rewrite_css_font_families(css: &str, fallbacks: &[String], quote: char) -> Option<String> {
    const PROP: &str = "font-family";
    let lower = css.to_ascii_lowercase();
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut copied = 0;
    let mut search = 0;
    let mut changed = false;

    while let Some(found) = lower[search..].find(PROP) {
        let start = search + found;
        search = start + PROP.len();
        if start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'-') {
            continue;
        }
        let mut colon = search;
        while colon < bytes.len() && bytes[colon].is_ascii_whitespace() {
            colon += 1;
        }
        if colon >= bytes.len() || bytes[colon] != b':' {
            continue;
        }
        let value_start = colon + 1;
        let value_end = css_value_end(css, value_start);
        let value = &css[value_start..value_end];
        let (families, important) = split_important(value);
        if let Some(new_families) = append_fallback_families(families, fallbacks, quote) {
            out.push_str(&css[copied..value_start]);
            out.push_str(&new_families);
            out.push_str(important);
            copied = value_end;
            changed = true;
        }
        search = value_end;
    }

    if !changed {
        return None;
    }
    out.push_str(&css[copied..]);
    Some(out)
}

/// End of a declaration value: the first `;`, `}` or `<` outside quotes.
fn css_value_end(css: &str, from: usize) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in css[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ';' | '}' | '<') => return from + i,
            _ => {}
        }
    }
    css.len()
}

fn split_important(value: &str) -> (&str, &str) {
    match value.to_ascii_lowercase().rfind("!important") {
        Some(i) => (&value[..i], &value[i..]),
        None => (value, ""),
    }
}

fn split_families(list: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ',') => {
                out.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&list[start..]);
    out
}

fn family_key(family: &str) -> String {
    family
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

fn quote_family(family: &str, quote: char) -> String {
    let bare = family.trim_matches(|c| c == '"' || c == '\'');
    let generic = GENERIC_FAMILIES
        .iter()
        .any(|g| g.eq_ignore_ascii_case(bare));
    let simple = bare.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if generic || simple {
        bare.to_string()
    } else {
        format!("{quote}{bare}{quote}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sanitize/fonts.rs"]
mod tests;

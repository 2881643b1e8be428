use std::{
    collections::HashMap,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::{
    foundation::{cancel::CancelFlag, error::PrintResult},
    order::{
        info::{DeclaredAssetSet, is_remote_reference},
        scratch::{ScratchDir, ScratchFile},
    },
    sanitize::{
        fonts::{DEFAULT_FALLBACK_FAMILIES, append_fallback_families, rewrite_css_font_families},
        normalizer::{FallbackReason, ImageNormalizer, NormalizeOutcome},
    },
};

/// 1x1 fully transparent PNG.
pub const TRANSPARENT_PIXEL_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Token the design tool leaves where the customer's font belongs.
pub const DEFAULT_FONT_PLACEHOLDER: &str = "{{FONT_FAMILY}}";

/// Remote blank logo the marketplace inserts when the customer uploaded none.
pub const DEFAULT_BLANK_LOGO_URL: &str =
    "https://m.media-amazon.com/images/G/01/x-locale/common/transparent-pixel.gif";

/// Rewrite rules applied by [`AssetSanitizer`].
#[derive(Clone, Debug)]
pub struct SanitizeOptions {
    /// Literal token replaced with the order's font name.
    pub font_placeholder: String,
    /// Remote reference replaced with [`TRANSPARENT_PIXEL_URI`].
    pub blank_logo_url: String,
    /// Families appended to every `font-family` list.
    pub fallback_families: Vec<String>,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            font_placeholder: DEFAULT_FONT_PLACEHOLDER.to_string(),
            blank_logo_url: DEFAULT_BLANK_LOGO_URL.to_string(),
            fallback_families: DEFAULT_FALLBACK_FAMILIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Counters describing what a sanitize pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Local images replaced by a normalized scratch copy.
    pub normalized: usize,
    /// Local images replaced by the transparent placeholder.
    pub placeholders: usize,
    /// Placeholders standing in for images the order declared.
    pub declared_missing: usize,
    /// `font-family` lists extended with fallbacks.
    pub font_lists_extended: usize,
}

/// Sanitized markup plus the scratch files it points at.
///
/// The artifacts are deleted when this value drops, so keep it alive until rasterization is done.
#[derive(Debug)]
pub struct SanitizedDesign {
    /// Rewritten SVG text.
    pub markup: String,
    /// Normalized images referenced by `markup`.
    pub artifacts: Vec<ScratchFile>,
    /// What changed.
    pub report: SanitizeReport,
}

/// Personalizes and cleans a vector design before rasterization.
pub struct AssetSanitizer {
    normalizer: Arc<dyn ImageNormalizer>,
    options: SanitizeOptions,
    cancel: CancelFlag,
}

impl AssetSanitizer {
    /// Sanitizer delegating image conversion to `normalizer`.
    pub fn new(
        normalizer: Arc<dyn ImageNormalizer>,
        options: SanitizeOptions,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            normalizer,
            options,
            cancel,
        }
    }

    /// Read and sanitize the design at `design_path`. Only the read itself can fail.
    pub fn sanitize_file(
        &self,
        design_path: &Path,
        font_name: &str,
        declared: &DeclaredAssetSet,
        scratch: &ScratchDir,
    ) -> PrintResult<SanitizedDesign> {
        let raw = std::fs::read_to_string(design_path)
            .with_context(|| format!("read vector design '{}'", design_path.display()))?;
        let base_dir = design_path.parent().unwrap_or_else(|| Path::new("."));
        Ok(self.sanitize(&raw, base_dir, font_name, declared, scratch))
    }

    /// Sanitize markup whose relative references resolve against `base_dir`.
    pub fn sanitize(
        &self,
        raw: &str,
        base_dir: &Path,
        font_name: &str,
        declared: &DeclaredAssetSet,
        scratch: &ScratchDir,
    ) -> SanitizedDesign {
        // Markup-significant characters are dropped so the name is safe in attributes, text and
        // CDATA alike.
        let font: String = font_name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '&' | '<' | '>' | '"' | '\''))
            .collect();
        let font = if font.is_empty() {
            self.options
                .fallback_families
                .first()
                .cloned()
                .unwrap_or_else(|| "sans-serif".to_string())
        } else {
            font
        };
        let mut text = raw.replace(&self.options.font_placeholder, &font);
        if !self.options.blank_logo_url.is_empty() {
            text = text.replace(&self.options.blank_logo_url, TRANSPARENT_PIXEL_URI);
        }

        let mut pass = RewritePass {
            sanitizer: self,
            base_dir,
            declared,
            scratch,
            artifacts: Vec::new(),
            resolved: HashMap::new(),
            report: SanitizeReport::default(),
        };
        let markup = match pass.rewrite(&text) {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!(error = %e, "vector design is not well-formed; skipping image and font rewrites");
                text
            }
        };

        SanitizedDesign {
            markup,
            artifacts: pass.artifacts,
            report: pass.report,
        }
    }
}

/// State for one sanitize call.
struct RewritePass<'a> {
    sanitizer: &'a AssetSanitizer,
    base_dir: &'a Path,
    declared: &'a DeclaredAssetSet,
    scratch: &'a ScratchDir,
    artifacts: Vec<ScratchFile>,
    resolved: HashMap<PathBuf, Option<String>>,
    report: SanitizeReport,
}

impl RewritePass<'_> {
    /// Locate every rewrite site in the parsed document, then splice replacements into the
    /// original text back to front so untouched bytes are preserved exactly.
    fn rewrite(&mut self, text: &str) -> Result<String, roxmltree::Error> {
        let opts = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, opts)?;
        let fallbacks = self.sanitizer.options.fallback_families.clone();
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();

        for node in doc.descendants().filter(|n| n.is_element()) {
            let is_image = node.tag_name().name() == "image";
            for attr in node.attributes() {
                let range = attr.range_value();
                let delim = attr_delimiter(text, &range);
                match attr.name() {
                    "href" if is_image => {
                        if let Some(new_href) = self.rewrite_href(attr.value()) {
                            edits.push((range, xml_escape(&new_href, delim)));
                        }
                    }
                    "font-family" => {
                        if let Some(v) =
                            append_fallback_families(attr.value(), &fallbacks, other_quote(delim))
                        {
                            self.report.font_lists_extended += 1;
                            edits.push((range, xml_escape(&v, delim)));
                        }
                    }
                    "style" => {
                        if let Some(v) =
                            rewrite_css_font_families(attr.value(), &fallbacks, other_quote(delim))
                        {
                            self.report.font_lists_extended += 1;
                            edits.push((range, xml_escape(&v, delim)));
                        }
                    }
                    _ => {}
                }
            }

            if node.tag_name().name() == "style" {
                for child in node.children().filter(|c| c.is_text()) {
                    let range = child.range();
                    let raw = &text[range.clone()];
                    // CDATA content is literal; plain text must be decoded and re-escaped.
                    let rewritten = if raw.contains("<![CDATA[") {
                        rewrite_css_font_families(raw, &fallbacks, '\'')
                    } else {
                        child
                            .text()
                            .and_then(|css| rewrite_css_font_families(css, &fallbacks, '\''))
                            .map(|v| text_escape(&v))
                    };
                    if let Some(v) = rewritten {
                        self.report.font_lists_extended += 1;
                        edits.push((range, v));
                    }
                }
            }
        }

        edits.sort_by_key(|(r, _)| std::cmp::Reverse(r.start));
        let mut out = text.to_string();
        for (range, replacement) in edits {
            out.replace_range(range, &replacement);
        }
        Ok(out)
    }

    /// New value for an `<image>` reference, or `None` to leave it untouched.
    fn rewrite_href(&mut self, href: &str) -> Option<String> {
        let trimmed = href.trim();
        if trimmed.is_empty()
            || trimmed.starts_with("data:")
            || trimmed.starts_with('#')
            || is_remote_reference(trimmed)
        {
            return None;
        }

        let path = self.resolve(trimmed);
        if let Some(cached) = self.resolved.get(&path) {
            return Some(self.count(cached.clone(), trimmed));
        }

        let replacement = if !path.is_file() {
            if self.declared.contains(trimmed) {
                tracing::warn!(href = trimmed, path = %path.display(), "declared image missing; using transparent placeholder");
            } else {
                tracing::debug!(href = trimmed, "unused template image missing; using transparent placeholder");
            }
            None
        } else {
            self.normalize(&path, trimmed)
        };
        self.resolved.insert(path, replacement.clone());
        Some(self.count(replacement, trimmed))
    }

    fn count(&mut self, replacement: Option<String>, href: &str) -> String {
        match replacement {
            Some(r) => {
                self.report.normalized += 1;
                r
            }
            None => {
                self.report.placeholders += 1;
                if self.declared.contains(href) {
                    self.report.declared_missing += 1;
                }
                TRANSPARENT_PIXEL_URI.to_string()
            }
        }
    }

    fn resolve(&self, href: &str) -> PathBuf {
        let local = href.strip_prefix("file://").unwrap_or(href);
        let decoded = percent_decode(local);
        let p = Path::new(&decoded);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// Normalize into a scratch PNG and return its absolute path.
    fn normalize(&mut self, path: &Path, href: &str) -> Option<String> {
        let outcome = if self.sanitizer.cancel.is_cancelled() {
            NormalizeOutcome::Fallback(FallbackReason::Cancelled)
        } else {
            self.sanitizer.normalizer.normalize(path)
        };

        let img = match outcome {
            NormalizeOutcome::Normalized(img) => img,
            NormalizeOutcome::Fallback(reason) => {
                tracing::warn!(
                    href,
                    normalizer = self.sanitizer.normalizer.name(),
                    %reason,
                    "image normalization fell back to transparent placeholder"
                );
                return None;
            }
        };

        let artifact = self
            .scratch
            .file(&format!("normalized_{}.png", self.artifacts.len()));
        if let Err(e) = img.save_with_format(artifact.path(), image::ImageFormat::Png) {
            tracing::warn!(href, error = %e, "failed to write normalized image; using placeholder");
            return None;
        }
        let abs = std::path::absolute(artifact.path())
            .unwrap_or_else(|_| artifact.path().to_path_buf());
        self.artifacts.push(artifact);
        Some(abs.to_string_lossy().into_owned())
    }
}

fn attr_delimiter(text: &str, value: &Range<usize>) -> char {
    match value.start.checked_sub(1).map(|i| text.as_bytes()[i]) {
        Some(b'\'') => '\'',
        _ => '"',
    }
}

fn other_quote(delim: char) -> char {
    if delim == '"' { '\'' } else { '"' }
}

/// Escape text for an XML attribute delimited by `delim` (also safe in element content).
fn xml_escape(s: &str, delim: char) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' if delim == '"' => out.push_str("&quot;"),
            '\'' if delim == '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for element content.
fn text_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Some(v) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        {
            out.push(v);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| s.to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/sanitize/markup.rs"]
mod tests;

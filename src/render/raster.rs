use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::foundation::error::{PrintError, PrintResult};

/// Remote images larger than this are not rendered.
pub const MAX_REMOTE_IMAGE_BYTES: u64 = 32 * 1024 * 1024;

/// Parses and rasterizes SVG markup with one shared font database.
///
/// Building the font database scans every system font, so a single rasterizer is created per
/// process and shared by all renders.
pub struct SvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
    remote_timeout: Option<Duration>,
}

impl SvgRasterizer {
    /// Load system fonts plus any `.ttf`/`.otf`/`.ttc` files found directly in `font_dirs`.
    ///
    /// `remote_timeout` enables fetching `http(s)` image references; `None` leaves them blank.
    pub fn new(font_dirs: &[PathBuf], remote_timeout: Option<Duration>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in font_dirs {
            load_font_dir(&mut db, dir);
        }
        tracing::debug!(faces = db.len(), "font database ready");
        Self::with_fontdb(Arc::new(db), remote_timeout)
    }

    /// Rasterizer over an existing font database.
    pub fn with_fontdb(
        fontdb: Arc<usvg::fontdb::Database>,
        remote_timeout: Option<Duration>,
    ) -> Self {
        Self {
            fontdb,
            remote_timeout,
        }
    }

    /// The shared font database.
    pub fn fontdb(&self) -> &Arc<usvg::fontdb::Database> {
        &self.fontdb
    }

    fn options(&self, resources_dir: Option<&Path>) -> usvg::Options<'static> {
        usvg::Options {
            resources_dir: resources_dir.map(Path::to_path_buf),
            fontdb: Arc::clone(&self.fontdb),
            font_resolver: font_resolver(),
            image_href_resolver: image_resolver(self.remote_timeout),
            ..Default::default()
        }
    }

    /// Parse `markup`, resolving relative references against `resources_dir`.
    pub fn parse(&self, markup: &str, resources_dir: Option<&Path>) -> PrintResult<usvg::Tree> {
        usvg::Tree::from_str(markup, &self.options(resources_dir))
            .map_err(|e| PrintError::render(format!("parse vector design: {e}")))
    }

    /// Parse and render `markup` stretched to exactly `width` x `height`.
    pub fn rasterize(
        &self,
        markup: &str,
        resources_dir: Option<&Path>,
        width: u32,
        height: u32,
    ) -> PrintResult<image::RgbaImage> {
        let tree = self.parse(markup, resources_dir)?;
        render_tree(&tree, width, height)
    }
}

/// Render `tree` scaled independently on each axis to fill `width` x `height`.
///
/// Returns straight (non-premultiplied) RGBA.
pub fn render_tree(tree: &usvg::Tree, width: u32, height: u32) -> PrintResult<image::RgbaImage> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        PrintError::render(format!("failed to allocate {width}x{height} raster"))
    })?;

    let sx = width as f32 / tree.size().width();
    let sy = height as f32 / tree.size().height();
    resvg::render(
        tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    let mut out = image::RgbaImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(out)
}

fn load_font_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory not readable");
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"));
        if is_font && let Err(e) = db.load_font_file(&path) {
            tracing::warn!(font = %path.display(), error = %e, "failed to load font");
        }
    }
}

/// usvg's selection, then any sans-serif face, then any face at all, so text never vanishes
/// just because the requested families are absent.
fn font_resolver() -> usvg::FontResolver<'static> {
    let preferred = usvg::FontResolver::default_font_selector();
    usvg::FontResolver {
        select_font: Box::new(move |font, db| {
            preferred(font, db).or_else(|| {
                let sans = [usvg::fontdb::Family::SansSerif];
                db.query(&usvg::fontdb::Query {
                    families: &sans,
                    ..Default::default()
                })
                .or_else(|| db.faces().next().map(|f| f.id))
            })
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

#[cfg(feature = "remote-images")]
fn image_resolver(remote_timeout: Option<Duration>) -> usvg::ImageHrefResolver<'static> {
    let Some(timeout) = remote_timeout else {
        return local_image_resolver();
    };
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent: ureq::Agent = config.into();
    let local = usvg::ImageHrefResolver::default_string_resolver();
    let decode = usvg::ImageHrefResolver::default_data_resolver();
    usvg::ImageHrefResolver {
        resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
        resolve_string: Box::new(move |href, opts| {
            if !crate::order::info::is_remote_reference(href) {
                return local(href, opts);
            }
            let bytes = fetch_remote(&agent, href.trim())?;
            decode("text/plain", Arc::new(bytes), opts)
        }),
    }
}

#[cfg(not(feature = "remote-images"))]
fn image_resolver(_remote_timeout: Option<Duration>) -> usvg::ImageHrefResolver<'static> {
    local_image_resolver()
}

fn local_image_resolver() -> usvg::ImageHrefResolver<'static> {
    let local = usvg::ImageHrefResolver::default_string_resolver();
    usvg::ImageHrefResolver {
        resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
        resolve_string: Box::new(move |href, opts| {
            if crate::order::info::is_remote_reference(href) {
                tracing::debug!(href, "remote image fetching disabled; rendering nothing");
                return None;
            }
            local(href, opts)
        }),
    }
}

#[cfg(feature = "remote-images")]
fn fetch_remote(agent: &ureq::Agent, url: &str) -> Option<Vec<u8>> {
    let mut response = match agent.get(url).call() {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(url, error = %e, "remote image fetch failed");
            return None;
        }
    };
    match response
        .body_mut()
        .with_config()
        .limit(MAX_REMOTE_IMAGE_BYTES)
        .read_to_vec()
    {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(url, error = %e, "remote image read failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;

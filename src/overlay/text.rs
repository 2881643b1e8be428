use std::sync::Arc;

use image::{Rgba, RgbaImage, imageops};

use crate::{
    foundation::error::{PrintError, PrintResult},
    render::raster::{SvgRasterizer, render_tree},
};

/// Families tried for overlay text, most preferred first.
pub const OVERLAY_FONT_FAMILIES: &str = "'DejaVu Sans', 'Noto Sans', Arial, sans-serif";

/// Appearance of one line of overlay text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub size: f32,
    /// Fill color.
    pub color: Rgba<u8>,
    /// Bold weight.
    pub bold: bool,
}

impl TextStyle {
    /// Bold text of `size` pixels in `color`.
    pub const fn new(size: f32, color: Rgba<u8>) -> Self {
        Self {
            size,
            color,
            bold: true,
        }
    }
}

/// Renders single lines of text into tightly trimmed RGBA layers.
#[derive(Clone)]
pub struct TextRenderer {
    rasterizer: Arc<SvgRasterizer>,
}

impl TextRenderer {
    /// Renderer drawing through `rasterizer`.
    pub fn new(rasterizer: Arc<SvgRasterizer>) -> Self {
        Self { rasterizer }
    }

    /// Upright text layer cropped to its inked pixels.
    ///
    /// Fails when the line is blank or no installed font produced any pixels.
    pub fn render(&self, text: &str, style: TextStyle) -> PrintResult<RgbaImage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PrintError::render("nothing to draw for blank text"));
        }
        let pad = style.size.ceil() as u32;
        let width = (text.chars().count() as f32 * style.size).ceil() as u32 + 2 * pad;
        let height = (style.size * 2.0).ceil() as u32;
        let Rgba([r, g, b, a]) = style.color;

        let markup = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="{pad}" y="{baseline}" font-family="{families}" font-size="{size}" font-weight="{weight}" fill="rgb({r},{g},{b})" fill-opacity="{opacity}">{body}</text></svg>"#,
            baseline = style.size * 1.4,
            families = OVERLAY_FONT_FAMILIES,
            size = style.size,
            weight = if style.bold { "bold" } else { "normal" },
            opacity = f32::from(a) / 255.0,
            body = escape_text(text),
        );
        let tree = self.rasterizer.parse(&markup, None)?;
        let layer = render_tree(&tree, width, height)?;
        trim_to_content(&layer)
            .ok_or_else(|| PrintError::render(format!("no glyphs rendered for '{text}'")))
    }

    /// Text layer flipped about both axes, ready for reverse transfer printing.
    pub fn render_mirrored(&self, text: &str, style: TextStyle) -> PrintResult<RgbaImage> {
        self.render(text, style).map(|layer| mirror(&layer))
    }
}

/// Flip horizontally and vertically. Applying it twice yields the input.
pub fn mirror(layer: &RgbaImage) -> RgbaImage {
    imageops::rotate180(layer)
}

/// Smallest sub-image containing every pixel with non-zero alpha, or `None` if there is none.
pub fn trim_to_content(layer: &RgbaImage) -> Option<RgbaImage> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in layer.enumerate_pixels() {
        if px.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    let (x0, y0, x1, y1) = bounds?;
    Some(imageops::crop_imm(layer, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image())
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/text.rs"]
mod tests;

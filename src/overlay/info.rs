use image::{Rgba, RgbaImage, imageops};

use crate::{
    foundation::{error::PrintResult, geometry::PxRect},
    order::info::OrderInfo,
    overlay::{
        barcode::{BarcodeRenderer, barcode_payload, error_placeholder},
        text::{TextRenderer, TextStyle, mirror},
    },
    render::composite::blend_at,
    template::catalog::Template,
};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const MAX_FIT_ATTEMPTS: usize = 4;

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

/// Label keywords and their overlay colors, checked in order.
const LABEL_COLORS: [(&str, Rgba<u8>); 6] = [
    ("black", Rgba([0, 0, 0, 255])),
    ("white", Rgba([128, 128, 128, 255])),
    ("pink", Rgba([231, 84, 128, 255])),
    ("red", Rgba([200, 16, 46, 255])),
    ("navy", Rgba([0, 0, 128, 255])),
    ("blue", Rgba([0, 90, 200, 255])),
];

/// Color for labels matching no keyword.
pub const DEFAULT_LABEL_COLOR: Rgba<u8> = Rgba([60, 60, 60, 255]);

/// Overlay color for a variant label: first keyword contained in it, case-insensitively.
pub fn label_color(label: &str) -> Rgba<u8> {
    let label = label.to_lowercase();
    LABEL_COLORS
        .iter()
        .find(|(keyword, _)| label.contains(keyword))
        .map(|&(_, color)| color)
        .unwrap_or(DEFAULT_LABEL_COLOR)
}

/// Draws mirrored order identification text and a barcode into a template's info box.
#[derive(Clone)]
pub struct InfoOverlayRenderer {
    text: TextRenderer,
    barcode: BarcodeRenderer,
}

impl InfoOverlayRenderer {
    /// Overlay drawing text and barcode captions with `text`.
    pub fn new(text: TextRenderer) -> Self {
        Self {
            barcode: BarcodeRenderer::new(text.clone()),
            text,
        }
    }

    /// Draw onto `canvas`. Each text column gets one third of the info box, the barcode the middle
    /// third. Text that cannot be rendered is skipped; a barcode that cannot be generated is
    /// replaced with a marked placeholder.
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        info: &OrderInfo,
        template: &Template,
        total_quantity: u32,
    ) {
        let area = template.info_box;
        let margin = area.height / 12;
        let line_height = (area.height - 2 * margin) / 2;
        let size = line_height as f32 * 0.75;
        let rows = [area.y + margin, area.y + margin + line_height];

        let left = [
            format!("{total_quantity} {}", info.design_side.label()),
            info.order_id.clone(),
        ];
        let right = [
            (format!("#{} x{}", info.item_suffix(), info.quantity), BLACK),
            (info.label.clone(), label_color(&info.label)),
        ];

        let column = area.width / 3;
        let slot_width = column.saturating_sub(2 * margin);
        let right_slot_x = area.right() - margin - slot_width;
        for (row, line) in rows.into_iter().zip(&left) {
            let slot = PxRect::new(area.x + margin, row, slot_width, line_height);
            self.draw_line(canvas, line, TextStyle::new(size, BLACK), slot, Align::Left);
        }
        for (row, (line, color)) in rows.into_iter().zip(&right) {
            let slot = PxRect::new(right_slot_x, row, slot_width, line_height);
            self.draw_line(canvas, line, TextStyle::new(size, *color), slot, Align::Right);
        }

        self.draw_barcode(canvas, info, area, column);
    }

    /// Draw `line` inside `slot`, vertically centered.
    fn draw_line(
        &self,
        canvas: &mut RgbaImage,
        line: &str,
        style: TextStyle,
        slot: PxRect,
        align: Align,
    ) {
        if line.trim().is_empty() {
            return;
        }
        match self.fit_line(line, style, slot.width) {
            Ok(layer) => {
                let x = match align {
                    Align::Left => i64::from(slot.x),
                    Align::Right => i64::from(slot.right()) - i64::from(layer.width()),
                };
                let y = i64::from(slot.y) + (i64::from(slot.height) - i64::from(layer.height())) / 2;
                blend_at(canvas, &layer, x, y);
            }
            Err(e) => tracing::warn!(line, error = %e, "overlay text skipped"),
        }
    }

    /// Mirrored layer no wider than `max_width`: the font shrinks first, then the tail of the
    /// line is cut.
    fn fit_line(&self, line: &str, style: TextStyle, max_width: u32) -> PrintResult<RgbaImage> {
        let mut style = style;
        let mut layer = self.text.render(line, style)?;
        for _ in 0..MAX_FIT_ATTEMPTS {
            if layer.width() <= max_width {
                break;
            }
            style.size *= max_width as f32 / layer.width() as f32 * 0.95;
            layer = self.text.render(line, style)?;
        }
        if layer.width() > max_width {
            tracing::debug!(line, max_width, "overlay text truncated");
            layer = imageops::crop_imm(&layer, 0, 0, max_width, layer.height()).to_image();
        }
        Ok(mirror(&layer))
    }

    fn draw_barcode(&self, canvas: &mut RgbaImage, info: &OrderInfo, area: PxRect, column: u32) {
        let payload = barcode_payload(&info.order_id, info.item_suffix());
        let max_height = area.height * 9 / 10;
        let image = match self.barcode.render(&payload, column, max_height) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(order_id = %info.order_id, error = %e, "barcode replaced with placeholder");
                error_placeholder(column, max_height)
            }
        };
        let x = i64::from(area.x) + (i64::from(area.width) - i64::from(image.width())) / 2;
        let y = i64::from(area.y) + (i64::from(area.height) - i64::from(image.height())) / 2;
        blend_at(canvas, &image, x, y);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/info.rs"]
mod tests;

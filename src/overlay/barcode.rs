//! Code 128 (code set B) encoding and rendering.
//!
//! Set B covers printable ASCII, which is all order ids ever contain. Each symbol is six
//! alternating bar/space widths summing to 11 modules; the stop symbol has seven elements and
//! 13 modules.

use image::{Rgba, RgbaImage, imageops};

use crate::{
    foundation::geometry::PxRect,
    overlay::text::{TextRenderer, TextStyle},
    render::composite::{WHITE, fill_rect},
};

const START_B: usize = 104;
const STOP: usize = 106;
/// Blank modules required on each side of the symbol.
pub const QUIET_ZONE_MODULES: u32 = 10;

const PATTERNS: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232", "2331112",
];

/// Why a barcode could not be produced. The overlay draws a placeholder instead.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BarcodeError {
    /// Nothing to encode.
    #[error("barcode payload is empty")]
    Empty,
    /// Outside printable ASCII.
    #[error("character {0:?} cannot be encoded in code set B")]
    UnsupportedChar(char),
    /// Even one-pixel modules do not fit.
    #[error("barcode needs {needed}px but only {available}px are available")]
    TooWide {
        /// Width at one pixel per module.
        needed: u32,
        /// Width offered by the caller.
        available: u32,
    },
}

/// Payload printed on the label: the order id, plus the last four characters of the item id.
pub fn barcode_payload(order_id: &str, item_suffix: &str) -> String {
    if item_suffix.trim().is_empty() {
        order_id.trim().to_string()
    } else {
        format!("{}|{}", order_id.trim(), item_suffix.trim())
    }
}

/// An encoded symbol as a run of module widths, starting with a bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Code128 {
    values: Vec<usize>,
}

impl Code128 {
    /// Encode `payload` in code set B, appending the mod-103 check symbol.
    pub fn encode(payload: &str) -> Result<Self, BarcodeError> {
        if payload.is_empty() {
            return Err(BarcodeError::Empty);
        }
        let mut values = Vec::with_capacity(payload.len() + 3);
        values.push(START_B);
        for c in payload.chars() {
            if !(' '..='\u{7f}').contains(&c) {
                return Err(BarcodeError::UnsupportedChar(c));
            }
            values.push(c as usize - 32);
        }
        let weighted: usize = values
            .iter()
            .enumerate()
            .skip(1)
            .map(|(pos, v)| pos * v)
            .sum();
        values.push((START_B + weighted) % 103);
        values.push(STOP);
        Ok(Self { values })
    }

    /// Symbol values: start, data, check, stop.
    pub fn values(&self) -> &[usize] {
        &self.values
    }

    /// The mod-103 check value.
    pub fn checksum(&self) -> usize {
        self.values[self.values.len() - 2]
    }

    /// Module widths of alternating bars and spaces, excluding quiet zones.
    pub fn widths(&self) -> impl Iterator<Item = u32> + '_ {
        self.values
            .iter()
            .flat_map(|&v| PATTERNS[v].bytes().map(|b| u32::from(b - b'0')))
    }

    /// Total modules including both quiet zones.
    pub fn total_modules(&self) -> u32 {
        self.widths().sum::<u32>() + 2 * QUIET_ZONE_MODULES
    }
}

/// Draws barcodes with their payload printed underneath.
#[derive(Clone)]
pub struct BarcodeRenderer {
    text: TextRenderer,
}

impl BarcodeRenderer {
    /// Renderer drawing captions with `text`.
    pub fn new(text: TextRenderer) -> Self {
        Self { text }
    }

    /// Barcode image no larger than `max_width` x `max_height`, using the widest integral
    /// module that fits.
    pub fn render(
        &self,
        payload: &str,
        max_width: u32,
        max_height: u32,
    ) -> Result<RgbaImage, BarcodeError> {
        let code = Code128::encode(payload)?;
        let modules = code.total_modules();
        let module = max_width / modules;
        if module == 0 {
            return Err(BarcodeError::TooWide {
                needed: modules,
                available: max_width,
            });
        }

        let caption_size = (max_height as f32 * 0.18).clamp(10.0, 32.0);
        let caption = match self
            .text
            .render(payload, TextStyle::new(caption_size, Rgba([0, 0, 0, 255])))
        {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::debug!(error = %e, "barcode caption not rendered");
                None
            }
        };

        let width = modules * module;
        let caption_band = caption
            .as_ref()
            .map(|c| c.height() + caption_size as u32 / 3)
            .unwrap_or(0);
        let bar_height = max_height.saturating_sub(caption_band).max(max_height / 2);

        let mut img = RgbaImage::from_pixel(width, max_height, WHITE);
        let mut x = QUIET_ZONE_MODULES * module;
        for (i, w) in code.widths().enumerate() {
            let span = w * module;
            if i % 2 == 0 {
                fill_rect(&mut img, PxRect::new(x, 0, span, bar_height), Rgba([0, 0, 0, 255]));
            }
            x += span;
        }

        if let Some(caption) = caption {
            let cx = (i64::from(width) - i64::from(caption.width())) / 2;
            let cy = i64::from(max_height) - i64::from(caption.height());
            imageops::overlay(&mut img, &caption, cx, cy);
        }
        Ok(img)
    }
}

/// White box with a red border and a red cross, drawn in place of a barcode that failed.
pub fn error_placeholder(width: u32, height: u32) -> RgbaImage {
    let red = Rgba([220, 0, 0, 255]);
    let mut img = RgbaImage::from_pixel(width.max(1), height.max(1), WHITE);
    let (w, h) = img.dimensions();
    let border = (w.min(h) / 20).max(2);
    fill_rect(&mut img, PxRect::new(0, 0, w, border), red);
    fill_rect(&mut img, PxRect::new(0, h.saturating_sub(border), w, border), red);
    fill_rect(&mut img, PxRect::new(0, 0, border, h), red);
    fill_rect(&mut img, PxRect::new(w.saturating_sub(border), 0, border, h), red);

    let half = i64::from(border / 2);
    for x in 0..w {
        let y = (u64::from(x) * u64::from(h) / u64::from(w)) as i64;
        for dy in -half..=half {
            for yy in [y + dy, i64::from(h) - 1 - y + dy] {
                if (0..i64::from(h)).contains(&yy) {
                    img.put_pixel(x, yy as u32, red);
                }
            }
        }
    }
    img
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/barcode.rs"]
mod tests;

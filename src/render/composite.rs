use image::{Rgba, RgbaImage, imageops};

use crate::foundation::{
    error::{PrintError, PrintResult},
    geometry::PxRect,
};

/// Opaque white, the canvas background.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Opaque white canvas.
pub fn white_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, WHITE)
}

/// Paint `rect` (clipped to the canvas) with `color`, replacing what was there.
pub fn fill_rect(canvas: &mut RgbaImage, rect: PxRect, color: Rgba<u8>) {
    let right = rect.right().min(canvas.width());
    let bottom = rect.bottom().min(canvas.height());
    for y in rect.y.min(bottom)..bottom {
        for x in rect.x.min(right)..right {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Copy `crop` out of `master`, resample it to the size of `paste`, and alpha-blend it onto
/// `canvas` at `paste`'s origin.
pub fn paste_crop(
    canvas: &mut RgbaImage,
    master: &RgbaImage,
    crop: PxRect,
    paste: PxRect,
) -> PrintResult<()> {
    if crop.is_empty() || !crop.fits_within(master.width(), master.height()) {
        return Err(PrintError::render(format!(
            "crop {crop:?} outside {}x{} master",
            master.width(),
            master.height()
        )));
    }
    if paste.is_empty() || !paste.fits_within(canvas.width(), canvas.height()) {
        return Err(PrintError::render(format!(
            "paste {paste:?} outside {}x{} canvas",
            canvas.width(),
            canvas.height()
        )));
    }

    let region = imageops::crop_imm(master, crop.x, crop.y, crop.width, crop.height).to_image();
    let region = if (crop.width, crop.height) == (paste.width, paste.height) {
        region
    } else {
        let filter = if paste.width > crop.width {
            imageops::FilterType::CatmullRom
        } else {
            imageops::FilterType::Lanczos3
        };
        imageops::resize(&region, paste.width, paste.height, filter)
    };
    imageops::overlay(canvas, &region, i64::from(paste.x), i64::from(paste.y));
    Ok(())
}

/// Alpha-blend `layer` onto `canvas` with its top-left at (`x`, `y`), clipping at the edges.
pub fn blend_at(canvas: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64) {
    imageops::overlay(canvas, layer, x, y);
}

/// `true` when every pixel of `rect` equals `color`.
pub fn is_uniform(img: &RgbaImage, rect: PxRect, color: Rgba<u8>) -> bool {
    rect.fits_within(img.width(), img.height())
        && rect.pixels().all(|(x, y)| *img.get_pixel(x, y) == color)
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;

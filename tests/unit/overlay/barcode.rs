use std::sync::Arc;

use super::*;
use crate::render::raster::SvgRasterizer;

fn renderer() -> BarcodeRenderer {
    let rasterizer = Arc::new(SvgRasterizer::with_fontdb(
        Arc::new(usvg::fontdb::Database::new()),
        None,
    ));
    BarcodeRenderer::new(TextRenderer::new(rasterizer))
}

#[test]
fn pattern_table_module_sums() {
    for (i, p) in PATTERNS.iter().enumerate() {
        let sum: u32 = p.bytes().map(|b| u32::from(b - b'0')).sum();
        let expected = if i == STOP { 13 } else { 11 };
        assert_eq!(sum, expected, "symbol {i} ({p})");
    }
}

#[test]
fn checksum_weights_by_position() {
    assert_eq!(Code128::encode("A").unwrap().checksum(), (104 + 33) % 103);
    let code = Code128::encode("AB").unwrap();
    assert_eq!(code.values(), &[104, 33, 34, (104 + 33 + 2 * 34) % 103, 106]);
}

#[test]
fn total_modules_include_quiet_zones() {
    let code = Code128::encode("123-4567890-1234567|5678").unwrap();
    assert_eq!(code.total_modules(), 11 * (24 + 2) + 13 + 2 * QUIET_ZONE_MODULES);
}

#[test]
fn rejects_empty_and_non_ascii_payloads() {
    assert_eq!(Code128::encode(""), Err(BarcodeError::Empty));
    assert_eq!(
        Code128::encode("caf\u{e9}"),
        Err(BarcodeError::UnsupportedChar('\u{e9}'))
    );
    assert_eq!(
        Code128::encode("a\tb"),
        Err(BarcodeError::UnsupportedChar('\t'))
    );
}

#[test]
fn payload_joins_item_suffix() {
    assert_eq!(barcode_payload("111-2", "3333"), "111-2|3333");
    assert_eq!(barcode_payload("111-2", " "), "111-2");
}

#[test]
fn render_uses_widest_fitting_module() {
    let img = renderer().render("AB", 200, 60).unwrap();
    let modules = Code128::encode("AB").unwrap().total_modules();
    assert_eq!(img.width(), modules * (200 / modules));
    assert_eq!(img.height(), 60);

    let quiet = QUIET_ZONE_MODULES * (200 / modules);
    assert_eq!(img.get_pixel(quiet - 1, 0).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(quiet, 0).0, [0, 0, 0, 255]);
}

#[test]
fn render_reports_insufficient_width() {
    let err = renderer().render("123-4567890-1234567", 50, 60).unwrap_err();
    assert!(matches!(err, BarcodeError::TooWide { available: 50, .. }));
}

#[test]
fn placeholder_is_visibly_marked() {
    let img = error_placeholder(100, 40);
    assert_eq!(img.dimensions(), (100, 40));
    assert_eq!(img.get_pixel(0, 0).0, [220, 0, 0, 255]);
    assert_eq!(img.get_pixel(50, 20).0, [220, 0, 0, 255]);
    assert_eq!(img.get_pixel(20, 20).0, [255, 255, 255, 255]);
}

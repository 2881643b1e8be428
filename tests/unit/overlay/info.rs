use std::{path::Path, sync::Arc};

use super::*;
use crate::{
    order::info::DesignSide,
    render::{
        composite::{WHITE, is_uniform, white_canvas},
        raster::SvgRasterizer,
    },
    template::catalog::{Capacity, TemplateCatalog},
};

fn overlay() -> InfoOverlayRenderer {
    let rasterizer = SvgRasterizer::with_fontdb(Arc::new(usvg::fontdb::Database::new()), None);
    InfoOverlayRenderer::new(TextRenderer::new(Arc::new(rasterizer)))
}

fn font_overlay() -> InfoOverlayRenderer {
    let fonts = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts");
    let rasterizer = SvgRasterizer::new(&[fonts], None);
    assert!(
        rasterizer
            .fontdb()
            .faces()
            .any(|f| f.families.iter().any(|(name, _)| name == "DejaVu Sans Mono")),
        "expected the vendored test font 'DejaVu Sans Mono' in the font database"
    );
    InfoOverlayRenderer::new(TextRenderer::new(Arc::new(rasterizer)))
}

/// Antialiased navy on white keeps blue above red; barcode and black text stay gray.
fn is_bluish(px: &Rgba<u8>) -> bool {
    let [r, _, b, _] = px.0;
    i32::from(b) > i32::from(r) + 10
}

fn thirds(area: PxRect) -> [PxRect; 3] {
    let column = area.width / 3;
    [
        PxRect::new(area.x, area.y, column, area.height),
        PxRect::new(area.x + column, area.y, column, area.height),
        PxRect::new(area.x + 2 * column, area.y, area.width - 2 * column, area.height),
    ]
}

fn info(order_id: &str) -> OrderInfo {
    OrderInfo {
        order_id: order_id.to_string(),
        order_item_id: "98765432101234".to_string(),
        font_name: String::new(),
        quantity: 2,
        label: "Navy Blue".to_string(),
        total_quantity: 5,
        design_side: DesignSide::Both,
        capacity: None,
    }
}

#[test]
fn first_matching_keyword_wins() {
    assert_eq!(label_color("Matte BLACK"), Rgba([0, 0, 0, 255]));
    assert_eq!(label_color("navy blue"), Rgba([0, 0, 128, 255]));
    assert_eq!(label_color("Baby Blue"), Rgba([0, 90, 200, 255]));
    assert_eq!(label_color("white & pink"), Rgba([128, 128, 128, 255]));
    assert_eq!(label_color("Stainless"), DEFAULT_LABEL_COLOR);
}

#[test]
fn barcode_is_centered_in_info_box() {
    let catalog = TemplateCatalog::standard();
    let template = catalog.template_for(Capacity(11));
    let area = template.info_box;
    let mut canvas = white_canvas(template.final_width, template.final_height);

    overlay().draw(&mut canvas, &info("111-2222222-3333333"), template, 5);

    let center = canvas.get_pixel(area.x + area.width / 2, area.y + area.height / 2);
    let band = PxRect::new(area.x + area.width / 3, area.y + area.height / 2, area.width / 3, 1);
    assert!(band.pixels().any(|(x, y)| canvas.get_pixel(x, y).0 == [0, 0, 0, 255]));
    assert!(center.0[3] == 255);
    assert!(is_uniform(&canvas, template.paste_front, WHITE));
    assert!(is_uniform(&canvas, template.paste_back, WHITE));
}

#[test]
fn unencodable_payload_draws_placeholder() {
    let catalog = TemplateCatalog::standard();
    let template = catalog.template_for(Capacity(11));
    let area = template.info_box;
    let mut canvas = white_canvas(template.final_width, template.final_height);

    overlay().draw(&mut canvas, &info("bestellung-\u{fc}"), template, 1);

    let red = [220, 0, 0, 255];
    assert!(area.pixels().any(|(x, y)| canvas.get_pixel(x, y).0 == red));
}

#[test]
fn mirrored_lines_land_in_their_columns() {
    let catalog = TemplateCatalog::standard();
    let template = catalog.template_for(Capacity(11));
    let area = template.info_box;
    let mut canvas = white_canvas(template.final_width, template.final_height);

    font_overlay().draw(&mut canvas, &info("111-2222222-3333333"), template, 5);

    let [left, middle, right] = thirds(area);
    let black = |r: PxRect| r.pixels().any(|(x, y)| canvas.get_pixel(x, y).0 == [0, 0, 0, 255]);
    assert!(black(left));
    assert!(black(right));
    assert!(right.pixels().any(|(x, y)| canvas.get_pixel(x, y).0 == [0, 0, 128, 255]));
    assert!(!left.pixels().any(|(x, y)| is_bluish(canvas.get_pixel(x, y))));
    assert!(!middle.pixels().any(|(x, y)| is_bluish(canvas.get_pixel(x, y))));

    let outside_box = PxRect::new(0, area.y, area.x, area.height);
    assert!(is_uniform(&canvas, outside_box, WHITE));
}

#[test]
fn long_label_is_kept_out_of_the_barcode_column() {
    let catalog = TemplateCatalog::standard();
    let template = catalog.template_for(Capacity(11));
    let area = template.info_box;
    let mut canvas = white_canvas(template.final_width, template.final_height);
    let mut long = info("111-2222222-3333333");
    long.label = "Navy Blue 20oz Stainless Steel Skinny Tumbler".to_string();

    font_overlay().draw(&mut canvas, &long, template, 5);

    let [_, middle, right] = thirds(area);
    assert!(right.pixels().any(|(x, y)| is_bluish(canvas.get_pixel(x, y))));
    let spilled = middle
        .pixels()
        .filter(|&(x, y)| is_bluish(canvas.get_pixel(x, y)))
        .count();
    assert_eq!(spilled, 0);
}

#[test]
fn long_left_line_stays_inside_the_info_box() {
    let catalog = TemplateCatalog::standard();
    let template = catalog.template_for(Capacity(11));
    let area = template.info_box;
    let mut canvas = white_canvas(template.final_width, template.final_height);

    font_overlay().draw(
        &mut canvas,
        &info("111-2222222-3333333-444444444-555555555"),
        template,
        5,
    );

    let [left, _, _] = thirds(area);
    let inked_left = left
        .pixels()
        .any(|(x, y)| canvas.get_pixel(x, y).0 == [0, 0, 0, 255]);
    assert!(inked_left);
    let outside_box = PxRect::new(0, area.y, area.x, area.height);
    assert!(is_uniform(&canvas, outside_box, WHITE));
    let margin = area.height / 12;
    let gutter = PxRect::new(area.x + area.width / 3 - margin, area.y, margin, area.height);
    assert!(is_uniform(&canvas, gutter, WHITE));
}

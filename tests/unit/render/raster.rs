use super::*;

fn rasterizer() -> SvgRasterizer {
    SvgRasterizer::with_fontdb(Arc::new(usvg::fontdb::Database::new()), None)
}

#[test]
fn stretches_to_requested_square() {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
        <rect x="0" y="0" width="100" height="100" fill="#ff0000"/>
    </svg>"##;
    let img = rasterizer().rasterize(svg, None, 50, 50).unwrap();
    assert_eq!(img.dimensions(), (50, 50));
    assert_eq!(img.get_pixel(5, 25).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(45, 25).0[3], 0);
}

#[test]
fn output_is_straight_alpha() {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <rect width="10" height="10" fill="#00ff00" fill-opacity="0.5"/>
    </svg>"##;
    let img = rasterizer().rasterize(svg, None, 10, 10).unwrap();
    let px = img.get_pixel(5, 5).0;
    assert!(px[1] >= 250, "green channel should not be premultiplied: {px:?}");
    assert!((120..=135).contains(&px[3]));
}

#[test]
fn relative_images_resolve_against_resources_dir() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 255]))
        .save(dir.path().join("blue.png"))
        .unwrap();
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <image href="blue.png" width="10" height="10" preserveAspectRatio="none"/>
    </svg>"#;
    let img = rasterizer()
        .rasterize(svg, Some(dir.path()), 10, 10)
        .unwrap();
    assert_eq!(img.get_pixel(5, 5).0, [0, 0, 255, 255]);
}

#[test]
fn remote_images_render_nothing_when_disabled() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <image href="https://example.invalid/a.png" width="10" height="10"/>
    </svg>"#;
    let img = rasterizer().rasterize(svg, None, 10, 10).unwrap();
    assert!(img.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn malformed_markup_is_a_render_error() {
    let err = rasterizer().rasterize("<svg", None, 10, 10).unwrap_err();
    assert_eq!(err.kind(), "RenderError");
}

#[test]
fn zero_sized_target_is_rejected() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
    assert!(rasterizer().rasterize(svg, None, 0, 10).is_err());
}

use super::*;

fn quadrants(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        match (x < size / 2, y < size / 2) {
            (true, true) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 255, 0, 255]),
            (true, false) => Rgba([0, 0, 255, 255]),
            (false, false) => Rgba([0, 0, 0, 0]),
        }
    })
}

#[test]
fn paste_crop_scales_into_paste_region() {
    let master = quadrants(20);
    let mut canvas = white_canvas(100, 50);
    paste_crop(
        &mut canvas,
        &master,
        PxRect::new(10, 0, 10, 10),
        PxRect::new(60, 10, 30, 30),
    )
    .unwrap();

    assert!(is_uniform(&canvas, PxRect::new(62, 12, 26, 26), Rgba([0, 255, 0, 255])));
    assert!(is_uniform(&canvas, PxRect::new(0, 0, 55, 50), WHITE));
}

#[test]
fn transparent_master_pixels_leave_white_behind() {
    let master = quadrants(20);
    let mut canvas = white_canvas(10, 10);
    paste_crop(
        &mut canvas,
        &master,
        PxRect::new(10, 10, 10, 10),
        PxRect::new(0, 0, 10, 10),
    )
    .unwrap();
    assert!(is_uniform(&canvas, PxRect::new(0, 0, 10, 10), WHITE));
}

#[test]
fn out_of_bounds_rectangles_are_render_errors() {
    let master = quadrants(20);
    let mut canvas = white_canvas(10, 10);
    let err = paste_crop(
        &mut canvas,
        &master,
        PxRect::new(15, 0, 10, 10),
        PxRect::new(0, 0, 5, 5),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "RenderError");
    assert!(
        paste_crop(
            &mut canvas,
            &master,
            PxRect::new(0, 0, 10, 10),
            PxRect::new(5, 5, 10, 10),
        )
        .is_err()
    );
}

#[test]
fn fill_rect_clips_to_canvas() {
    let mut canvas = RgbaImage::new(10, 10);
    fill_rect(&mut canvas, PxRect::new(5, 5, 100, 100), WHITE);
    assert!(is_uniform(&canvas, PxRect::new(5, 5, 5, 5), WHITE));
    assert_eq!(canvas.get_pixel(4, 4).0, [0, 0, 0, 0]);
}

#[test]
fn blend_at_clips_negative_offsets() {
    let mut canvas = white_canvas(4, 4);
    let layer = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
    blend_at(&mut canvas, &layer, -2, -2);
    assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
    assert_eq!(canvas.get_pixel(1, 1).0, [255, 255, 255, 255]);
}

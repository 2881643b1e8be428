use std::io::Read as _;

use super::*;

fn write_png(path: &Path, w: u32, h: u32) {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([10, 200, 30]));
    img.save(path).unwrap();
}

#[test]
fn in_process_forces_rgba8() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("rgb.png");
    write_png(&src, 3, 2);

    let NormalizeOutcome::Normalized(img) = InProcessNormalizer.normalize(&src) else {
        panic!("expected normalized image");
    };
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(0, 0).0, [10, 200, 30, 255]);
}

#[test]
fn in_process_missing_and_corrupt_fall_back() {
    let dir = tempfile::tempdir().unwrap();
    let missing = InProcessNormalizer.normalize(&dir.path().join("nope.png"));
    assert!(matches!(
        missing,
        NormalizeOutcome::Fallback(FallbackReason::SourceMissing)
    ));

    let corrupt = dir.path().join("bad.png");
    std::fs::write(&corrupt, b"definitely not a png").unwrap();
    assert!(matches!(
        InProcessNormalizer.normalize(&corrupt),
        NormalizeOutcome::Fallback(FallbackReason::Undecodable(_))
    ));
}

#[test]
fn magick_unavailable_program_is_soft_failure() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("a.png");
    write_png(&src, 1, 1);

    let n = MagickNormalizer {
        program: PathBuf::from("tumblerprint-no-such-tool"),
        timeout: Duration::from_secs(5),
        temp_dir: dir.path().to_path_buf(),
    };
    assert!(matches!(
        n.normalize(&src),
        NormalizeOutcome::Fallback(FallbackReason::ToolFailed(_))
    ));
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("tumblerprint_norm_"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn fallback_reasons_render_readably() {
    assert_eq!(
        FallbackReason::TimedOut(Duration::from_secs(3)).to_string(),
        "normalizer timed out after 3s"
    );
    assert_eq!(FallbackReason::SourceMissing.to_string(), "source image missing");
}

#[cfg(unix)]
#[test]
fn stopped_child_is_reaped_and_drain_joined() {
    let mut child = Command::new("sleep")
        .arg("30")
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stderr = child.stderr.take();
    let drain = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(s) = stderr.as_mut() {
            let _ = s.read_to_end(&mut bytes);
        }
        bytes
    });

    let started = Instant::now();
    stop_child(&mut child, drain);
    assert!(started.elapsed() < Duration::from_secs(10));
    let status = child.try_wait().unwrap().expect("child already reaped");
    assert!(!status.success());
}

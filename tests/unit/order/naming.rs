use super::*;

fn sources<'a>(
    record_dir: &'a Path,
    order_root: &'a Path,
    hint: &'a str,
    out: &'a Path,
) -> NameSources<'a> {
    NameSources {
        order_id: "123-4567890-1234567",
        record_dir,
        order_root,
        customer_hint: hint,
        output_dir: out,
    }
}

#[test]
fn photo_fragment_wins() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Jane_Doe_123-4567890-1234567.jpg"), b"").unwrap();
    std::fs::write(dir.path().join("unrelated.png"), b"").unwrap();
    let out = dir.path().join("ready");
    let src = sources(dir.path(), dir.path(), "Hint", &out);
    assert_eq!(derive_base_name(&src), "Jane Doe");
}

#[test]
fn fragment_after_id_used_when_nothing_precedes() {
    assert_eq!(
        fragment_around("123-4567890-1234567 - Bob", "123-4567890-1234567").as_deref(),
        Some("Bob")
    );
    assert_eq!(fragment_around("nothing", "123"), None);
}

#[test]
fn generic_folder_falls_through_to_hint_then_output() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("Photos");
    std::fs::create_dir_all(&root).unwrap();
    let out = tmp.path().join("Ready Batch");

    let src = sources(&root, &root, "  Ann  Lee ", &out);
    assert_eq!(derive_base_name(&src), "Ann Lee");

    let src = sources(&root, &root, "", &out);
    assert_eq!(derive_base_name(&src), "Ready Batch");
}

#[test]
fn order_folder_name_is_sanitized() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("Smith_Family!");
    std::fs::create_dir_all(&root).unwrap();
    let src = sources(&root, &root, "hint", tmp.path());
    assert_eq!(derive_base_name(&src), "Smith Family");
}

#[test]
fn file_name_format() {
    assert_eq!(
        output_file_name(3, "Jane", "123-1", "15oz"),
        "x3Jane(123-1) 15oz.png"
    );
    assert_eq!(output_file_name(1, "Jane", "123-1", " "), "x1Jane(123-1).png");
}

#[test]
fn unique_path_skips_existing_and_reserved() {
    let dir = tempfile::tempdir().unwrap();
    let mut reserved = HashSet::new();
    let first = unique_output_path(dir.path(), 2, "A", "9", "s", &reserved);
    assert_eq!(first, dir.path().join("x2A(9) s.png"));

    std::fs::write(&first, b"").unwrap();
    let second = unique_output_path(dir.path(), 2, "A", "9", "s", &reserved);
    assert_eq!(second, dir.path().join("x2A(9) s (2).png"));

    reserved.insert(second.clone());
    let third = unique_output_path(dir.path(), 2, "A", "9", "s", &reserved);
    assert_eq!(third, dir.path().join("x2A(9) s (3).png"));
}

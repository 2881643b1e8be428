use super::*;

const RECORD: &str = r#"{
    "orderId": "111-2222222-3333333",
    "orderItemId": "44445555666677",
    "quantity": 2,
    "title": "Tumbler 20 oz",
    "items": [
        { "type": "ImageCustomization", "imageName": "front.png" }
    ]
}"#;

const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;

fn builder(scratch: &Path) -> OrderContextBuilder {
    OrderContextBuilder::new(Arc::new(TemplateCatalog::standard()), scratch)
}

#[test]
fn prepare_resolves_inputs_and_creates_scratch() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("Maria Lopez");
    std::fs::create_dir_all(root.join("art")).unwrap();
    std::fs::write(root.join("order.json"), RECORD).unwrap();
    std::fs::write(root.join("order.svg"), SVG).unwrap();
    std::fs::write(root.join("art/front.png"), b"png").unwrap();

    let out = tmp.path().join("ready");
    let b = builder(&tmp.path().join("scratch"));
    let ctx = b
        .prepare(&OrderJob::for_record(root.join("order.json")), &out, "20oz")
        .unwrap();

    assert_eq!(ctx.design_path, root.join("order.svg"));
    assert_eq!(ctx.template.capacity.0, 20);
    assert!(out.is_dir());
    assert_eq!(
        ctx.output_path,
        out.join("x2Maria Lopez(111-2222222-3333333) 20oz.png")
    );
    let scratch = ctx.scratch.path().to_path_buf();
    assert!(scratch.is_dir());
    drop(ctx);
    assert!(!scratch.exists());
}

#[test]
fn design_found_deeper_under_order_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("order");
    std::fs::create_dir_all(root.join("json")).unwrap();
    std::fs::create_dir_all(root.join("svg/nested")).unwrap();
    std::fs::write(root.join("json/order.json"), RECORD).unwrap();
    std::fs::write(root.join("svg/nested/design_44445555666677.svg"), SVG).unwrap();
    std::fs::write(root.join("svg/front.png"), b"png").unwrap();

    let job = OrderJob {
        record_path: root.join("json/order.json"),
        order_root: root.clone(),
        customer_hint: String::new(),
        total_quantity: Some(9),
    };
    let ctx = builder(&tmp.path().join("s"))
        .prepare(&job, &tmp.path().join("out"), "")
        .unwrap();
    assert_eq!(ctx.design_path, root.join("svg/nested/design_44445555666677.svg"));
    assert_eq!(ctx.info.total_quantity, 9);
}

#[test]
fn missing_design_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("order.json"), RECORD).unwrap();
    let err = builder(&tmp.path().join("s"))
        .prepare(
            &OrderJob::for_record(tmp.path().join("order.json")),
            &tmp.path().join("out"),
            "",
        )
        .unwrap_err();
    assert!(matches!(err, PrintError::MissingInput(_)));
}

#[test]
fn missing_declared_asset_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("order.json"), RECORD).unwrap();
    std::fs::write(tmp.path().join("order.svg"), SVG).unwrap();
    let err = builder(&tmp.path().join("s"))
        .prepare(
            &OrderJob::for_record(tmp.path().join("order.json")),
            &tmp.path().join("out"),
            "",
        )
        .unwrap_err();
    assert!(matches!(err, PrintError::MissingInput(_)));
    assert!(err.to_string().contains("front.png"));
}

#[test]
fn concurrent_prepares_reserve_distinct_names() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("order.json"), RECORD).unwrap();
    std::fs::write(tmp.path().join("order.svg"), SVG).unwrap();
    std::fs::write(tmp.path().join("front.png"), b"png").unwrap();

    let b = builder(&tmp.path().join("s"));
    let job = OrderJob::for_record(tmp.path().join("order.json"));
    let out = tmp.path().join("out");
    let a = b.prepare(&job, &out, "x").unwrap();
    let c = b.prepare(&job, &out, "x").unwrap();
    assert_ne!(a.output_path, c.output_path);
    assert!(
        c.output_path
            .to_string_lossy()
            .ends_with("(111-2222222-3333333) x (2).png")
    );
}

use super::*;

const SAMPLE: &str = r#"{
    "orderId": "123-4567890-1234567",
    "orderItemId": "98765432101234",
    "quantity": 3,
    "title": "Personalized Tumbler 15 oz",
    "customizationData": {
        "type": "CustomizationInfo",
        "children": [
            {
                "type": "PlacementContainerCustomization",
                "surfaceName": "Front Side",
                "children": [
                    { "type": "FontCustomization", "fontFamily": "Great Vibes" },
                    { "type": "ImageCustomization", "image": { "imageName": "photo_front.JPG" } },
                    { "type": "OptionCustomization", "name": "Design Side", "optionValue": "Front Only" },
                    { "type": "OptionCustomization", "name": "Tumbler Color", "displayValue": "Navy Blue" }
                ]
            }
        ]
    }
}"#;

#[test]
fn parse_extracts_all_signals() {
    let rec = OrderRecord::parse(SAMPLE).unwrap();
    let info = &rec.info;
    assert_eq!(info.order_id, "123-4567890-1234567");
    assert_eq!(info.order_item_id, "98765432101234");
    assert_eq!(info.quantity, 3);
    assert_eq!(info.total_quantity, 3);
    assert_eq!(info.font_name, "Great Vibes");
    assert_eq!(info.label, "Navy Blue");
    assert_eq!(info.design_side, DesignSide::FrontOnly);
    assert_eq!(info.capacity, Some(Capacity(15)));
    assert!(rec.declared_assets.contains("images/photo_front.jpg"));
    assert_eq!(rec.declared_assets.len(), 1);
}

#[test]
fn top_level_design_side_wins() {
    let json = r#"{"orderId":"1","orderItemId":"2","designSide":"BACK_ONLY",
        "items":[{"type":"OptionCustomization","name":"Design Side","optionValue":"Both"}]}"#;
    let rec = OrderRecord::parse(json).unwrap();
    assert_eq!(rec.info.design_side, DesignSide::BackOnly);
    assert_eq!(rec.info.quantity, 1);
    assert_eq!(rec.info.capacity, None);
}

#[test]
fn missing_required_fields_fail() {
    assert!(OrderRecord::parse(r#"{"orderItemId":"2"}"#).is_err());
    assert!(OrderRecord::parse(r#"{"orderId":"  ","orderItemId":"2"}"#).is_err());
    assert!(OrderRecord::parse(r#"{"orderId":"1","orderItemId":"2","quantity":0}"#).is_err());
    assert!(OrderRecord::parse("not json").is_err());
}

#[test]
fn quantity_accepts_numeric_strings() {
    let rec = OrderRecord::parse(r#"{"orderId":"1","orderItemId":"2","quantity":"4"}"#).unwrap();
    assert_eq!(rec.info.quantity, 4);
}

#[test]
fn design_side_parse_variants() {
    assert_eq!(DesignSide::parse("FRONT_ONLY"), Some(DesignSide::FrontOnly));
    assert_eq!(DesignSide::parse("back only"), Some(DesignSide::BackOnly));
    assert_eq!(DesignSide::parse("Front and Back"), Some(DesignSide::Both));
    assert_eq!(DesignSide::parse("Both Sides"), Some(DesignSide::Both));
    assert_eq!(DesignSide::parse("left"), None);
    assert!(DesignSide::FrontOnly.includes(Side::Front));
    assert!(!DesignSide::FrontOnly.includes(Side::Back));
}

#[test]
fn parse_capacity_handles_spacing() {
    assert_eq!(parse_capacity("15 oz"), Some(Capacity(15)));
    assert_eq!(parse_capacity("Skinny 20OZ"), Some(Capacity(20)));
    assert_eq!(parse_capacity("11-oz mug"), Some(Capacity(11)));
    assert_eq!(parse_capacity("ounce-free zone"), None);
}

#[test]
fn asset_names_normalize_case_and_directories() {
    assert_eq!(
        normalize_asset_name("Photos\\Front.PNG?x=1").as_deref(),
        Some("front.png")
    );
    assert_eq!(normalize_asset_name("dir/"), None);
    assert!(is_remote_reference("HTTPS://cdn.example.com/a.png"));
    assert!(!is_remote_reference("a.png"));
}

#[test]
fn item_suffix_takes_last_four() {
    let rec = OrderRecord::parse(r#"{"orderId":"1","orderItemId":"abc"}"#).unwrap();
    assert_eq!(rec.info.item_suffix(), "abc");
    let rec = OrderRecord::parse(SAMPLE).unwrap();
    assert_eq!(rec.info.item_suffix(), "1234");
}

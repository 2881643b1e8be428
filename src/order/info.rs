use std::collections::BTreeSet;

use serde_json::Value;

use crate::{
    foundation::error::{PrintError, PrintResult},
    template::catalog::{Capacity, Side},
};

/// Which print areas receive artwork.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DesignSide {
    /// Front and back.
    #[default]
    Both,
    /// Front only; the back paste region is filled white.
    FrontOnly,
    /// Back only; the front paste region is filled white.
    BackOnly,
}

impl DesignSide {
    /// Interpret free-form text such as `FRONT_ONLY`, `Front Only`, `back`, `Both Sides`.
    pub fn parse(raw: &str) -> Option<Self> {
        let norm = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        let front = norm.contains("FRONT");
        let back = norm.contains("BACK");
        if norm.contains("BOTH") || (front && back) {
            Some(Self::Both)
        } else if front {
            Some(Self::FrontOnly)
        } else if back {
            Some(Self::BackOnly)
        } else {
            None
        }
    }

    /// Whether `side` receives artwork.
    pub fn includes(self, side: Side) -> bool {
        match (self, side) {
            (Self::Both, _) => true,
            (Self::FrontOnly, Side::Front) => true,
            (Self::BackOnly, Side::Back) => true,
            _ => false,
        }
    }

    /// Short label printed in the overlay.
    pub fn label(self) -> &'static str {
        match self {
            Self::Both => "2 SIDES",
            Self::FrontOnly => "FRONT",
            Self::BackOnly => "BACK",
        }
    }
}

/// Raster image names the order record explicitly requires.
///
/// Names are stored normalized (see [`normalize_asset_name`]); the original spellings are kept so
/// they can be searched for on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclaredAssetSet {
    normalized: BTreeSet<String>,
    raw: BTreeSet<String>,
}

impl DeclaredAssetSet {
    /// Record a declared reference. Blank names are ignored.
    pub fn insert(&mut self, reference: &str) {
        let reference = reference.trim();
        let Some(norm) = normalize_asset_name(reference) else {
            return;
        };
        self.normalized.insert(norm);
        self.raw.insert(reference.to_string());
    }

    /// `true` when `reference` normalizes to a declared name.
    pub fn contains(&self, reference: &str) -> bool {
        normalize_asset_name(reference).is_some_and(|n| self.normalized.contains(&n))
    }

    /// Declared references as they appeared in the record.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.raw.iter().map(String::as_str)
    }

    /// Number of distinct declared references.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// `true` when nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for DeclaredAssetSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::default();
        for r in iter {
            set.insert(r);
        }
        set
    }
}

/// Lowercased file name of a reference with any query/fragment and directories removed.
pub fn normalize_asset_name(reference: &str) -> Option<String> {
    let no_query = reference.split(['?', '#']).next().unwrap_or_default();
    let name = no_query
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// `true` for `http://` / `https://` references.
pub fn is_remote_reference(reference: &str) -> bool {
    let r = reference.trim_start().to_ascii_lowercase();
    r.starts_with("http://") || r.starts_with("https://")
}

/// Order metadata extracted from one JSON record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderInfo {
    /// Marketplace order id.
    pub order_id: String,
    /// Order-item id within the order.
    pub order_item_id: String,
    /// Font family chosen by the customer, or empty.
    pub font_name: String,
    /// Copies of this design to print.
    pub quantity: u32,
    /// Human-readable variant label (drives overlay color).
    pub label: String,
    /// Total quantity across the batch this order belongs to.
    pub total_quantity: u32,
    /// Which sides receive artwork.
    pub design_side: DesignSide,
    /// Product capacity signal, if the record carries one.
    pub capacity: Option<Capacity>,
}

impl OrderInfo {
    /// Last four characters of the item id (fewer when the id is shorter).
    pub fn item_suffix(&self) -> &str {
        let id = self.order_item_id.as_str();
        let start = id
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &id[start..]
    }
}

/// Parsed order record: metadata plus the images it declares.
#[derive(Clone, Debug)]
pub struct OrderRecord {
    /// Order metadata.
    pub info: OrderInfo,
    /// Declared front/back images.
    pub declared_assets: DeclaredAssetSet,
}

const FONT_NODE: &str = "FontCustomization";
const OPTION_NODE: &str = "OptionCustomization";
const IMAGE_NODE: &str = "ImageCustomization";
const DESIGN_SIDE_OPTION: &str = "design side";
const CAPACITY_KEYS: [&str; 5] = ["surfaceName", "label", "name", "title", "productTitle"];

impl OrderRecord {
    /// Parse an order record from JSON text.
    pub fn parse(json: &str) -> PrintResult<Self> {
        let root: Value = serde_json::from_str(json)
            .map_err(|e| PrintError::validation(format!("order record is not valid JSON: {e}")))?;
        Self::from_value(&root)
    }

    /// Parse an order record from an already decoded JSON value.
    pub fn from_value(root: &Value) -> PrintResult<Self> {
        let order_id = required_str(root, "orderId")?;
        let order_item_id = required_str(root, "orderItemId")?;
        let quantity = match root.get("quantity") {
            None | Some(Value::Null) => 1,
            Some(v) => parse_quantity(v)?,
        };

        let mut scan = CustomizationScan::default();
        scan.visit(root);

        let design_side = root
            .get("designSide")
            .and_then(Value::as_str)
            .and_then(DesignSide::parse)
            .or(scan.design_side)
            .unwrap_or_default();

        Ok(Self {
            info: OrderInfo {
                order_id,
                order_item_id,
                font_name: scan.font_name.unwrap_or_default(),
                quantity,
                label: scan.color_label.or(scan.surface_label).unwrap_or_default(),
                total_quantity: quantity,
                design_side,
                capacity: scan.capacity,
            },
            declared_assets: scan.declared,
        })
    }
}

fn required_str(root: &Value, key: &str) -> PrintResult<String> {
    let v = match root.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if v.is_empty() {
        return Err(PrintError::validation(format!(
            "order record is missing required field '{key}'"
        )));
    }
    Ok(v)
}

fn parse_quantity(v: &Value) -> PrintResult<u32> {
    let q = match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match q {
        Some(q) if q >= 1 => {
            u32::try_from(q).map_err(|_| PrintError::validation("order quantity is out of range"))
        }
        _ => Err(PrintError::validation(format!(
            "order quantity must be a positive integer, got {v}"
        ))),
    }
}

/// Depth-first walk over the customization tree collecting the first value of each signal.
#[derive(Default)]
struct CustomizationScan {
    font_name: Option<String>,
    design_side: Option<DesignSide>,
    color_label: Option<String>,
    surface_label: Option<String>,
    capacity: Option<Capacity>,
    declared: DeclaredAssetSet,
}

impl CustomizationScan {
    fn visit(&mut self, v: &Value) {
        match v {
            Value::Object(map) => {
                let node_type = map.get("type").and_then(Value::as_str).unwrap_or_default();
                match node_type {
                    FONT_NODE => {
                        if self.font_name.is_none() {
                            self.font_name = first_str(v, &["fontFamily", "family", "fontName"]);
                        }
                    }
                    OPTION_NODE => self.visit_option(v),
                    IMAGE_NODE => {
                        for key in ["imageName", "fileName", "imageUrl"] {
                            if let Some(s) = map.get(key).and_then(Value::as_str) {
                                self.declared.insert(s);
                            }
                        }
                        if let Some(s) = v.pointer("/image/imageName").and_then(Value::as_str) {
                            self.declared.insert(s);
                        }
                    }
                    _ => {}
                }

                if self.surface_label.is_none()
                    && let Some(s) = map.get("surfaceName").and_then(Value::as_str)
                    && !s.trim().is_empty()
                {
                    self.surface_label = Some(s.trim().to_string());
                }
                if self.capacity.is_none() {
                    self.capacity = CAPACITY_KEYS
                        .iter()
                        .filter_map(|k| map.get(*k).and_then(Value::as_str))
                        .find_map(parse_capacity);
                }

                for child in map.values() {
                    self.visit(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            _ => {}
        }
    }

    fn visit_option(&mut self, v: &Value) {
        let name = first_str(v, &["name", "label"]).unwrap_or_default();
        let value = first_str(v, &["optionValue", "displayValue", "value"]).unwrap_or_default();
        let name_lc = name.to_lowercase();

        if self.design_side.is_none() && (name_lc == DESIGN_SIDE_OPTION || is_side_value(&value)) {
            self.design_side = DesignSide::parse(&value);
        }
        if self.color_label.is_none() && name_lc.contains("color") && !value.is_empty() {
            self.color_label = Some(value);
        }
    }
}

fn is_side_value(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    matches!(
        v.as_str(),
        "front" | "back" | "both" | "front only" | "back only" | "both sides" | "front and back"
    )
}

fn first_str(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extract an ounce count from text like `15 oz`, `20OZ Tumbler` or `11-oz`.
pub fn parse_capacity(text: &str) -> Option<Capacity> {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut search = 0;
    while let Some(pos) = lower[search..].find("oz") {
        let oz_at = search + pos;
        let mut end = oz_at;
        while end > 0 && matches!(bytes[end - 1], b' ' | b'-' | b'_') {
            end -= 1;
        }
        let mut start = end;
        while start > 0 && bytes[start - 1].is_ascii_digit() {
            start -= 1;
        }
        if start < end
            && let Ok(n) = lower[start..end].parse::<u32>()
            && n > 0
        {
            return Some(Capacity(n));
        }
        search = oz_at + 2;
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/order/info.rs"]
mod tests;

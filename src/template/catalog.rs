use std::collections::BTreeMap;

use crate::foundation::{
    error::{PrintError, PrintResult},
    geometry::PxRect,
};

/// Product capacity in fluid ounces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(pub u32);

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}oz", self.0)
    }
}

/// Which of the two print areas a rectangle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// First (front) print area.
    Front,
    /// Second (back) print area.
    Back,
}

impl Side {
    /// Both sides, front first.
    pub const ALL: [Side; 2] = [Side::Front, Side::Back];
}

/// Fixed geometric contract for one product capacity.
///
/// The vector design is rasterized into a `render_size` square master; each side's crop window is
/// read from that master and scaled into its paste region on a `final_width` x `final_height`
/// canvas. The info box holds the order overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Template {
    /// Capacity this template prints.
    pub capacity: Capacity,
    /// Output canvas width.
    pub final_width: u32,
    /// Output canvas height.
    pub final_height: u32,
    /// Edge length of the square rasterization master.
    pub render_size: u32,
    /// Front crop window within the master.
    pub crop_front: PxRect,
    /// Back crop window within the master.
    pub crop_back: PxRect,
    /// Front paste region on the canvas.
    pub paste_front: PxRect,
    /// Back paste region on the canvas.
    pub paste_back: PxRect,
    /// Overlay region on the canvas.
    pub info_box: PxRect,
}

impl Template {
    /// Crop window for `side`.
    pub fn crop(&self, side: Side) -> PxRect {
        match side {
            Side::Front => self.crop_front,
            Side::Back => self.crop_back,
        }
    }

    /// Paste region for `side`.
    pub fn paste(&self, side: Side) -> PxRect {
        match side {
            Side::Front => self.paste_front,
            Side::Back => self.paste_back,
        }
    }

    /// Check the geometric invariants: crops inside the master, pastes and info box inside the
    /// canvas, and no two canvas regions overlapping.
    pub fn validate(&self) -> PrintResult<()> {
        if self.final_width == 0 || self.final_height == 0 || self.render_size == 0 {
            return Err(PrintError::validation(format!(
                "template {} has a zero dimension",
                self.capacity
            )));
        }
        for side in Side::ALL {
            if !self.crop(side).fits_within(self.render_size, self.render_size) {
                return Err(PrintError::validation(format!(
                    "template {} {side:?} crop window exceeds the {}px master",
                    self.capacity, self.render_size
                )));
            }
            if !self.paste(side).fits_within(self.final_width, self.final_height) {
                return Err(PrintError::validation(format!(
                    "template {} {side:?} paste region exceeds the canvas",
                    self.capacity
                )));
            }
        }
        if !self.info_box.fits_within(self.final_width, self.final_height) {
            return Err(PrintError::validation(format!(
                "template {} info box exceeds the canvas",
                self.capacity
            )));
        }
        let regions = [self.paste_front, self.paste_back, self.info_box];
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                if a.intersects(b) {
                    return Err(PrintError::validation(format!(
                        "template {} has overlapping canvas regions",
                        self.capacity
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Immutable registry of templates keyed by capacity.
///
/// Built once at startup and shared read-only (usually behind an `Arc`) by every render.
#[derive(Clone, Debug)]
pub struct TemplateCatalog {
    templates: BTreeMap<Capacity, Template>,
    default: Template,
}

impl TemplateCatalog {
    /// Build a catalog, validating every template. `default_capacity` must be present.
    pub fn new(templates: Vec<Template>, default_capacity: Capacity) -> PrintResult<Self> {
        let mut map = BTreeMap::new();
        for t in templates {
            t.validate()?;
            if map.insert(t.capacity, t).is_some() {
                return Err(PrintError::validation(format!(
                    "duplicate template for {}",
                    t.capacity
                )));
            }
        }
        let default = *map.get(&default_capacity).ok_or_else(|| {
            PrintError::validation(format!(
                "default capacity {default_capacity} has no template"
            ))
        })?;
        Ok(Self {
            templates: map,
            default,
        })
    }

    /// The production catalog: 11 oz (default), 15 oz and 20 oz.
    pub fn standard() -> Self {
        Self {
            templates: STANDARD_TEMPLATES.iter().map(|t| (t.capacity, *t)).collect(),
            default: STANDARD_TEMPLATES[0],
        }
    }

    /// Template for `capacity`, or the default template when the capacity is unknown.
    pub fn template_for(&self, capacity: Capacity) -> &Template {
        self.templates.get(&capacity).unwrap_or(&self.default)
    }

    /// `true` when the catalog has a dedicated template for `capacity`.
    pub fn supports(&self, capacity: Capacity) -> bool {
        self.templates.contains_key(&capacity)
    }

    /// Capacity used when an order does not name one.
    pub fn default_capacity(&self) -> Capacity {
        self.default.capacity
    }

    /// All templates in ascending capacity order.
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }
}

const STANDARD_TEMPLATES: [Template; 3] = [
    Template {
        capacity: Capacity(11),
        final_width: 2400,
        final_height: 1300,
        render_size: 2000,
        crop_front: PxRect::new(0, 500, 1000, 1000),
        crop_back: PxRect::new(1000, 500, 1000, 1000),
        paste_front: PxRect::new(100, 50, 1000, 1000),
        paste_back: PxRect::new(1300, 50, 1000, 1000),
        info_box: PxRect::new(100, 1090, 2200, 180),
    },
    Template {
        capacity: Capacity(15),
        final_width: 2800,
        final_height: 1500,
        render_size: 2400,
        crop_front: PxRect::new(0, 600, 1200, 1200),
        crop_back: PxRect::new(1200, 600, 1200, 1200),
        paste_front: PxRect::new(100, 50, 1200, 1200),
        paste_back: PxRect::new(1500, 50, 1200, 1200),
        info_box: PxRect::new(100, 1290, 2600, 180),
    },
    Template {
        capacity: Capacity(20),
        final_width: 3200,
        final_height: 1700,
        render_size: 2800,
        crop_front: PxRect::new(0, 700, 1400, 1400),
        crop_back: PxRect::new(1400, 700, 1400, 1400),
        paste_front: PxRect::new(100, 50, 1400, 1400),
        paste_back: PxRect::new(1700, 50, 1400, 1400),
        info_box: PxRect::new(100, 1490, 3000, 180),
    },
];

#[cfg(test)]
#[path = "../../tests/unit/template/catalog.rs"]
mod tests;

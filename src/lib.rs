//! Tumblerprint produces print-ready PNGs for customized drinkware orders.
//!
//! Each order is a JSON customization record plus a vector design. Rendering an order:
//!
//! - resolves every input up front ([`OrderContextBuilder::prepare`]) and fails fast when the
//!   design or a declared image is missing
//! - personalizes the design (font placeholder, blank logo, fallback fonts) and converts local
//!   images to clean RGBA ([`AssetSanitizer`])
//! - rasterizes it, copies the front and back crop windows onto the capacity's canvas, and
//!   draws mirrored order text plus a Code 128 barcode ([`RenderPipeline`])
//!
//! [`BatchDriver`] runs many orders on a small worker pool and records failures in a CSV log
//! without stopping the batch. [`PrintService`] wires all of it from a [`PrintConfig`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod batch;
/// Runtime settings.
pub mod config;
pub(crate) mod order;
pub(crate) mod overlay;
pub(crate) mod render;
pub(crate) mod sanitize;
/// High-level entry point.
pub mod service;
pub(crate) mod template;

pub use crate::foundation::cancel::CancelFlag;
pub use crate::foundation::error::{PrintError, PrintResult};
pub use crate::foundation::geometry::PxRect;

pub use crate::batch::driver::{
    BatchDriver, BatchOptions, BatchSummary, FailureDetail, OrderOutcome, STAGE_PANIC,
    STAGE_PREPARE, STAGE_RENDER,
};
pub use crate::batch::failure_log::{FAILURE_LOG_COLUMNS, FailureLog, FailureRecord};
pub use crate::config::{NormalizerKind, PrintConfig};
pub use crate::order::context::{OrderContextBuilder, OrderJob, RenderContext};
pub use crate::order::info::{DeclaredAssetSet, DesignSide, OrderInfo, OrderRecord};
pub use crate::order::scratch::{ScratchDir, ScratchFile};
pub use crate::overlay::barcode::{BarcodeError, BarcodeRenderer, Code128, barcode_payload};
pub use crate::overlay::info::{InfoOverlayRenderer, label_color};
pub use crate::overlay::text::{TextRenderer, TextStyle, mirror};
pub use crate::render::pipeline::RenderPipeline;
pub use crate::render::raster::SvgRasterizer;
pub use crate::sanitize::markup::{
    AssetSanitizer, SanitizeOptions, SanitizeReport, SanitizedDesign, TRANSPARENT_PIXEL_URI,
};
pub use crate::sanitize::normalizer::{
    FallbackReason, ImageNormalizer, InProcessNormalizer, MagickNormalizer, NormalizeOutcome,
};
pub use crate::service::PrintService;
pub use crate::template::catalog::{Capacity, Side, Template, TemplateCatalog};

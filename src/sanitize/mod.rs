//! Design personalization and cleanup ahead of rasterization.

pub(crate) mod fonts;
pub(crate) mod markup;
pub(crate) mod normalizer;

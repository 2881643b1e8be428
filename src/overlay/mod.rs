//! Order identification drawn into the template's info box.

pub(crate) mod barcode;
pub(crate) mod info;
pub(crate) mod text;

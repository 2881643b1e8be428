//! Many orders on a bounded worker pool, with per-order failure isolation.

pub(crate) mod driver;
pub(crate) mod failure_log;

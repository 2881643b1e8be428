pub(crate) mod context;
pub(crate) mod info;
pub(crate) mod naming;
pub(crate) mod scratch;
pub(crate) mod search;

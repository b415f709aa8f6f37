pub(crate) mod path;
pub(crate) mod store;
pub(crate) mod value;

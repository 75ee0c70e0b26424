//! Deep merge of TOML values with restriction enforcement.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from an overlay never overrides the base layer.

mod deep;
mod enforce;
mod path;
mod restrict;
mod types;

pub use deep::{deep_merge, deep_merge_tracking};
pub(crate) use deep::record_leaves;
pub(crate) use path::set_nested;
pub use restrict::enforce_restrictions;
pub use types::{ConfigLayer, FieldSources};

#[cfg(test)]
mod tests;

//! Output generation for CLI searches.
//!
//! - [`json`]: writes a search's normalized items to a dated JSON file

pub mod json;

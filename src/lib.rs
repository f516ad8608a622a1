//! Asset conversion tools: a color-matrix extractor that turns numbered
//! coordinate records into a generated Lua module, and a property-list
//! transcoder that re-encodes binary plist documents as XML.
//!
//! The two pipelines are independent; both are driven by the thin binaries
//! in the `tools` workspace member.

pub mod convert;
pub mod error;
pub mod luagen;
pub mod matrix;
pub mod plist;
mod stream;

pub use error::Error;
pub use matrix::Point;
pub use plist::Plist;

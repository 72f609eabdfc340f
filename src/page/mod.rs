//! Page inspection: find image sources in fetched HTML and resolve them
//! against the page's host.

pub mod scan;
pub mod url;

pub use scan::image_sources;

//! HTML output for page reports.

pub mod html;

pub use html::{render_report_document, render_report_table};

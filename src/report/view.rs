//! Serializable summary of a page report (sizes only, no image bytes).

use crate::codec::{ImageFormat, OUTPUT_FORMATS};
use crate::report::{Outcome, PageReport};

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub src: String,
    pub original: ImageFormat,
    pub sizes: BTreeMap<ImageFormat, usize>,
    /// Output formats that could not be produced.
    pub failed: Vec<ImageFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub page: String,
    pub images: Vec<ImageView>,
    pub totals: BTreeMap<ImageFormat, usize>,
}

impl From<&PageReport> for ReportView {
    fn from(report: &PageReport) -> Self {
        let images = report
            .images
            .iter()
            .map(|img| ImageView {
                src: img.src.clone(),
                original: img.original,
                sizes: img.conversions.iter().map(|c| (c.format, c.size())).collect(),
                failed: img
                    .conversions
                    .iter()
                    .filter(|c| c.outcome == Outcome::Failed)
                    .map(|c| c.format)
                    .collect(),
            })
            .collect();

        Self {
            page: report.page.clone(),
            images,
            totals: OUTPUT_FORMATS
                .iter()
                .map(|&f| (f, report.total(f)))
                .collect(),
        }
    }
}

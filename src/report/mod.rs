//! Per-page image reports: every image on a page, re-encoded into each
//! output format, with the resulting sizes.

pub mod size;
pub mod view;

pub use size::format_bytes;
pub use view::ReportView;

use crate::codec::{self, ImageFormat, OUTPUT_FORMATS};
use crate::config::Settings;
use crate::convert::guess_format;
use crate::fetch::{FetchError, Fetcher};
use crate::page::{self, url};

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0} is not a web page address")]
    NotAWebPage(String),
    #[error("could not get page {url}: {source}")]
    Page {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("could not build the image scanner: {0}")]
    Scan(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The source is already in this format; `size` is the fetched length.
    Original { size: usize },
    Encoded(Vec<u8>),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub format: ImageFormat,
    pub outcome: Outcome,
}

impl Conversion {
    pub fn size(&self) -> usize {
        match &self.outcome {
            Outcome::Original { size } => *size,
            Outcome::Encoded(bytes) => bytes.len(),
            Outcome::Failed => 0,
        }
    }
}

/// One fetched image and its conversions, one per `OUTPUT_FORMATS` entry.
#[derive(Debug, Clone)]
pub struct ImgReport {
    pub src: String,
    pub original: ImageFormat,
    pub conversions: Vec<Conversion>,
}

impl ImgReport {
    /// Decode `bytes` and encode them into every output format.
    /// `None` when the format cannot be guessed or the image does not decode.
    pub fn generate(src: &str, bytes: &[u8], max_alloc: u64, jpeg_quality: u8) -> Option<Self> {
        let Some(original) = guess_format(src, bytes) else {
            info!("Could not guess format of {}", src);
            return None;
        };

        let decoded = match codec::decode(bytes, original, max_alloc) {
            Ok(img) => img,
            Err(err) => {
                error!("Could not decode {}: {}", src, err);
                return None;
            }
        };

        let conversions = OUTPUT_FORMATS
            .iter()
            .map(|&format| {
                let outcome = if format == original {
                    Outcome::Original { size: bytes.len() }
                } else {
                    match codec::encode(&decoded, format, jpeg_quality) {
                        Ok(encoded) if !encoded.is_empty() => Outcome::Encoded(encoded),
                        Ok(_) => {
                            error!("Could not convert {} to {}: empty output", src, format);
                            Outcome::Failed
                        }
                        Err(err) => {
                            error!("Could not convert {} to {}: {}", src, format, err);
                            Outcome::Failed
                        }
                    }
                };
                Conversion { format, outcome }
            })
            .collect();

        Some(Self {
            src: src.to_string(),
            original,
            conversions,
        })
    }

    pub fn conversion(&self, format: ImageFormat) -> Option<&Conversion> {
        self.conversions.iter().find(|c| c.format == format)
    }

    pub fn size(&self, format: ImageFormat) -> usize {
        self.conversion(format).map(Conversion::size).unwrap_or(0)
    }

    /// True when at least one format other than the original was produced.
    pub fn has_conversion(&self) -> bool {
        self.conversions
            .iter()
            .any(|c| matches!(c.outcome, Outcome::Encoded(_)))
    }
}

#[derive(Debug, Clone)]
pub struct PageReport {
    pub page: String,
    pub images: Vec<ImgReport>,
}

impl PageReport {
    /// Sum of `format` sizes over every image, including rows without conversions.
    pub fn total(&self, format: ImageFormat) -> usize {
        self.images.iter().map(|img| img.size(format)).sum()
    }
}

/// Fetch `page_url`, find its images and build a report for each, in page order.
///
/// With `prerender` the page is requested through the configured prerender
/// service. Images that fail to fetch, have an unknown format, or do not
/// decode are logged and left out.
pub async fn generate_page_report(
    fetcher: &Fetcher,
    settings: &Settings,
    page_url: &str,
    prerender: bool,
) -> Result<PageReport, ReportError> {
    if !url::has_protocol(page_url) {
        return Err(ReportError::NotAWebPage(page_url.to_string()));
    }
    let limits = &settings.limits;
    let host = url::host_of(page_url).to_string();

    let request_url = if prerender {
        info!("Using prerender for {}", page_url);
        format!("{}{}", settings.prerender_url, page_url)
    } else {
        page_url.to_string()
    };

    let body = fetcher
        .get(&request_url, limits.page_timeout, limits.max_page_bytes)
        .await
        .map_err(|source| ReportError::Page {
            url: request_url.clone(),
            source,
        })?;
    let html = String::from_utf8_lossy(&body);

    let sources: Vec<String> = page::image_sources(&html, limits.max_images_per_page)?
        .iter()
        .map(|src| url::resolve(&host, src))
        .collect();

    // Fetch, decode and encode each image inside the buffered future, so at
    // most `max_concurrent_fetches` bodies are held at once. `buffered` keeps
    // page order.
    let images: Vec<ImgReport> = stream::iter(sources)
        .map(|src| process_image(fetcher, settings, src))
        .buffered(limits.max_concurrent_fetches.max(1))
        .filter_map(|report| async move { report })
        .collect()
        .await;

    info!("Generated {} image reports for {}", images.len(), page_url);
    Ok(PageReport {
        page: page_url.to_string(),
        images,
    })
}

async fn process_image(fetcher: &Fetcher, settings: &Settings, src: String) -> Option<ImgReport> {
    let limits = &settings.limits;
    info!("Processing {}", src);
    let bytes = match fetcher
        .get(&src, limits.image_timeout, limits.max_image_bytes)
        .await
    {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Skipping image: {}", err);
            return None;
        }
    };

    let max_alloc = limits.max_decoded_bytes;
    let quality = settings.jpeg_quality;
    let worker = tokio::task::spawn_blocking(move || {
        ImgReport::generate(&src, &bytes, max_alloc, quality)
    });
    join_report(worker.await)
}

/// A worker that panicked or was cancelled costs only its own image.
fn join_report(joined: Result<Option<ImgReport>, JoinError>) -> Option<ImgReport> {
    joined.unwrap_or_else(|err| {
        error!("Conversion worker failed: {}", err);
        None
    })
}

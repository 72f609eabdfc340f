//! Runtime settings: CLI flags (with env fallbacks) folded into one immutable value.

use crate::rewrite::{PrefixPolicy, SrcPrefix};

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3456;
pub const DEFAULT_SRC_PREFIX: &str = "http://localhost:5500/";
pub const DEFAULT_PRERENDER_URL: &str = "http://localhost:3000/?t=5000&url=";
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_MAX_FETCHES: usize = 10;

pub const PAGE_TIMEOUT: Duration = Duration::from_millis(15_000);
pub const IMAGE_TIMEOUT: Duration = Duration::from_millis(5_000);

pub const MAX_PAGE_BYTES: usize = 1024 * 1024;
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
pub const MAX_DECODED_BYTES: u64 = 200 * 1024 * 1024;
pub const MAX_IMAGES_PER_PAGE: usize = 1000;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Port the relay server listens on.
    #[arg(long, env = "IMGRELAY_PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    /// Prefix prepended to image sources by the observer.
    #[arg(long, env = "IMGRELAY_PREFIX", default_value = DEFAULT_SRC_PREFIX, global = true)]
    pub prefix: String,

    /// Leave sources that already start with the prefix alone.
    #[arg(long, global = true)]
    pub skip_prefixed: bool,

    /// Directory static files are served from.
    #[arg(long, env = "IMGRELAY_ROOT", default_value = ".", global = true)]
    pub root: PathBuf,

    /// Base URL used for conversion links in reports. Defaults to http://localhost:<port>.
    #[arg(long, env = "IMGRELAY_PUBLIC_BASE", global = true)]
    pub public_base: Option<String>,

    /// Prerender service; the page URL is appended verbatim.
    #[arg(long, env = "IMGRELAY_PRERENDER_URL", default_value = DEFAULT_PRERENDER_URL, global = true)]
    pub prerender_url: String,

    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100), global = true)]
    pub jpeg_quality: u8,

    /// Maximum image fetches in flight per page report.
    #[arg(long, default_value_t = DEFAULT_MAX_FETCHES, global = true)]
    pub max_fetches: usize,
}

#[derive(Debug, Clone)]
pub struct Limits {
    pub page_timeout: Duration,
    pub image_timeout: Duration,
    pub max_page_bytes: usize,
    pub max_image_bytes: usize,
    pub max_decoded_bytes: u64,
    pub max_images_per_page: usize,
    pub max_concurrent_fetches: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            page_timeout: PAGE_TIMEOUT,
            image_timeout: IMAGE_TIMEOUT,
            max_page_bytes: MAX_PAGE_BYTES,
            max_image_bytes: MAX_IMAGE_BYTES,
            max_decoded_bytes: MAX_DECODED_BYTES,
            max_images_per_page: MAX_IMAGES_PER_PAGE,
            max_concurrent_fetches: DEFAULT_MAX_FETCHES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub src_prefix: SrcPrefix,
    pub prefix_policy: PrefixPolicy,
    pub static_root: PathBuf,
    pub public_base: String,
    pub prerender_url: String,
    pub jpeg_quality: u8,
    pub limits: Limits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            src_prefix: SrcPrefix::default(),
            prefix_policy: PrefixPolicy::default(),
            static_root: PathBuf::from("."),
            public_base: format!("http://localhost:{}", DEFAULT_PORT),
            prerender_url: DEFAULT_PRERENDER_URL.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            limits: Limits::default(),
        }
    }
}

impl From<GlobalArgs> for Settings {
    fn from(args: GlobalArgs) -> Self {
        let public_base = args
            .public_base
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", args.port));

        let prefix_policy = if args.skip_prefixed {
            PrefixPolicy::SkipPrefixed
        } else {
            PrefixPolicy::Always
        };

        Self {
            port: args.port,
            src_prefix: SrcPrefix::new(args.prefix),
            prefix_policy,
            static_root: args.root,
            public_base: public_base.trim_end_matches('/').to_string(),
            prerender_url: args.prerender_url,
            jpeg_quality: args.jpeg_quality,
            limits: Limits {
                max_concurrent_fetches: args.max_fetches.max(1),
                ..Limits::default()
            },
        }
    }
}

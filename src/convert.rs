//! Fetch one image URL and re-encode it.

use crate::codec::{self, ImageFormat};
use crate::config::Settings;
use crate::fetch::Fetcher;
use crate::page::url;
use crate::Result;

use anyhow::{Context, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

/// Input format from the URL's extension, falling back to the bytes' magic.
pub fn guess_format(src: &str, bytes: &[u8]) -> Option<ImageFormat> {
    url::extension(src)
        .and_then(ImageFormat::from_extension)
        .or_else(|| ImageFormat::sniff(bytes))
}

/// Fetch `src`, decode it and encode it as `out_format`.
pub async fn convert_url(
    fetcher: &Fetcher,
    settings: &Settings,
    src: &str,
    out_format: ImageFormat,
) -> Result<Vec<u8>> {
    info!("Getting {}", src);
    let limits = &settings.limits;
    let bytes = fetcher
        .get(src, limits.image_timeout, limits.max_image_bytes)
        .await?;

    let in_format =
        guess_format(src, &bytes).ok_or_else(|| anyhow!("could not guess image format of {}", src))?;

    info!("Encoding {} ({} -> {})", src, in_format, out_format);
    let max_alloc = limits.max_decoded_bytes;
    let quality = settings.jpeg_quality;
    let encoded = tokio::task::spawn_blocking(move || {
        let image = codec::decode(&bytes, in_format, max_alloc)?;
        codec::encode(&image, out_format, quality)
    })
    .await
    .context("conversion worker panicked")?
    .with_context(|| format!("convert {} to {}", src, out_format))?;

    Ok(encoded)
}

/// `<out_dir>/<file name of src>.<ext>`, e.g. `result/cat.png.webp`.
pub fn output_path(out_dir: &Path, src: &str, ext: &str) -> PathBuf {
    let name = url::file_name(src).unwrap_or("image");
    out_dir.join(format!("{}.{}", name, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::sample_png;
    use pretty_assertions::assert_eq;

    #[test]
    fn extension_wins_over_magic() {
        let png = sample_png(2, 2);
        assert_eq!(guess_format("https://s.example/a.jpg", &png), Some(ImageFormat::Jpeg));
        assert_eq!(guess_format("https://s.example/a", &png), Some(ImageFormat::Png));
        assert_eq!(guess_format("https://s.example/a.gif", b"GIF89a"), None);
    }

    #[test]
    fn output_path_keeps_source_name() {
        assert_eq!(
            output_path(Path::new("result"), "https://s.example/pics/cat.png?w=2", "webp"),
            PathBuf::from("result/cat.png.webp")
        );
        assert_eq!(
            output_path(Path::new("out"), "https://s.example/", "png"),
            PathBuf::from("out/image.png")
        );
    }
}

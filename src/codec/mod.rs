//! Image formats and the decode/encode pair used for conversions.

pub mod format;

pub use format::{ImageFormat, OUTPUT_FORMATS};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader, Limits};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{op} is not supported for {format}")]
    Unsupported { format: ImageFormat, op: &'static str },
    #[error("decoding {format} failed: {source}")]
    Decode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
    #[error("encoding {format} failed: {source}")]
    Encode {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
    #[error("decoded {format} image has no pixels")]
    Empty { format: ImageFormat },
}

/// Decode `bytes` as `format`, refusing to allocate more than `max_alloc` bytes.
pub fn decode(bytes: &[u8], format: ImageFormat, max_alloc: u64) -> Result<DynamicImage, CodecError> {
    let Some(image_format) = format.codec() else {
        return Err(CodecError::Unsupported {
            format,
            op: "decoding",
        });
    };

    let mut reader = ImageReader::with_format(Cursor::new(bytes), image_format);
    let mut limits = Limits::default();
    limits.max_alloc = Some(max_alloc);
    reader.limits(limits);

    let image = reader
        .decode()
        .map_err(|source| CodecError::Decode { format, source })?;
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::Empty { format });
    }
    Ok(image)
}

/// Encode `image` as `format`. JPEG drops alpha; WebP output is lossless.
pub fn encode(image: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let encode_err = |source| CodecError::Encode { format, source };

    match format {
        ImageFormat::Png => {
            let encoder = PngEncoder::new(&mut out);
            color_normalized(image)
                .write_with_encoder(encoder)
                .map_err(encode_err)?;
        }
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, jpeg_quality);
            DynamicImage::ImageRgb8(image.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(encode_err)?;
        }
        ImageFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut out);
            color_normalized(image)
                .write_with_encoder(encoder)
                .map_err(encode_err)?;
        }
        ImageFormat::Avif => {
            return Err(CodecError::Unsupported {
                format,
                op: "encoding",
            });
        }
    }
    Ok(out)
}

/// 8-bit RGB, or RGBA when the source carries alpha.
fn color_normalized(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

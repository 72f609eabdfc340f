use crate::codec::OUTPUT_FORMATS;
use crate::report::{Conversion, ImgReport, Outcome, PageReport, format_bytes};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write;

const ORIGINAL_STYLE: &str = "border: 5px solid green";

/// Shown in place of a conversion that failed.
const UNAVAILABLE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200"><rect width="200" height="200" fill="#eee"/><text x="100" y="105" font-family="sans-serif" font-size="18" text-anchor="middle" fill="#999">unavailable</text></svg>"##;

/// Render the comparison table for a page report.
///
/// One header cell per output format with its total size, then one row per
/// image that has at least one successful conversion. `convert_base` is the
/// server's public base URL, used for the full-size conversion links.
pub fn render_report_table(report: &PageReport, convert_base: &str) -> String {
    let mut out = String::from("<table>");

    for format in OUTPUT_FORMATS {
        let _ = write!(
            out,
            "<th><b>{} (total - {})</b><br></th>",
            format,
            format_bytes(report.total(format))
        );
    }

    for image in report.images.iter().filter(|img| img.has_conversion()) {
        out.push_str("<tr>");
        for conversion in &image.conversions {
            render_cell(&mut out, image, conversion, convert_base);
        }
        out.push_str("</tr>");
    }

    out.push_str("</table>");
    out
}

fn render_cell(out: &mut String, image: &ImgReport, conversion: &Conversion, convert_base: &str) {
    let is_original = matches!(conversion.outcome, Outcome::Original { .. });
    let (style, suffix) = if is_original {
        (ORIGINAL_STYLE, " (original)")
    } else {
        ("", "")
    };

    let href = if is_original {
        image.src.clone()
    } else {
        format!("{}/convert/{}/{}", convert_base, conversion.format, image.src)
    };

    let img_src = match &conversion.outcome {
        Outcome::Original { .. } => image.src.clone(),
        Outcome::Encoded(bytes) => data_uri(conversion.format.mime(), bytes),
        Outcome::Failed => data_uri("image/svg+xml", UNAVAILABLE_SVG.as_bytes()),
    };

    let _ = write!(
        out,
        "<td><a target=\"_blank\" href=\"{}\"><img style=\"{}\" src=\"{}\" height=\"200px\"></a><br>{}{}<br></td>",
        escape_attr(&href),
        style,
        escape_attr(&img_src),
        format_bytes(conversion.size()),
        suffix
    );
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Wrap the report table in a standalone document.
///
/// Built with `replace` rather than `format!` so the CSS braces need no escaping.
pub fn render_report_document(report: &PageReport, convert_base: &str) -> String {
    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Image report: __PAGE__</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 16px; }
  table { border-collapse: collapse; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: center; font-size: 14px; vertical-align: top; }
  th { position: sticky; top: 0; background: white; border-bottom: 1px solid #ddd; }
</style>
</head>
<body>
<h2>__PAGE__</h2>
__TABLE__
</body>
</html>
"#;

    TEMPLATE
        .replace("__PAGE__", &escape_attr(&report.page))
        .replace("__TABLE__", &render_report_table(report, convert_base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ImageFormat;
    use pretty_assertions::assert_eq;

    fn report() -> PageReport {
        PageReport {
            page: "https://s.example/".to_string(),
            images: vec![
                ImgReport {
                    src: "https://s.example/a.png?x=1&y=2".to_string(),
                    original: ImageFormat::Png,
                    conversions: vec![
                        Conversion {
                            format: ImageFormat::Png,
                            outcome: Outcome::Original { size: 2048 },
                        },
                        Conversion {
                            format: ImageFormat::Webp,
                            outcome: Outcome::Encoded(vec![1, 2, 3]),
                        },
                        Conversion {
                            format: ImageFormat::Jpeg,
                            outcome: Outcome::Failed,
                        },
                    ],
                },
                ImgReport {
                    src: "https://s.example/b.png".to_string(),
                    original: ImageFormat::Png,
                    conversions: vec![
                        Conversion {
                            format: ImageFormat::Png,
                            outcome: Outcome::Original { size: 10 },
                        },
                        Conversion {
                            format: ImageFormat::Webp,
                            outcome: Outcome::Failed,
                        },
                        Conversion {
                            format: ImageFormat::Jpeg,
                            outcome: Outcome::Failed,
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn headers_carry_totals_over_all_images() {
        let html = render_report_table(&report(), "http://localhost:3456");
        assert!(html.starts_with("<table><th><b>png (total - 2.01 KB)</b><br></th>"));
        assert!(html.contains("<th><b>webp (total - 3 B)</b><br></th>"));
        assert!(html.contains("<th><b>jpeg (total - 0 B)</b><br></th>"));
        assert!(html.ends_with("</table>"));
    }

    #[test]
    fn rows_without_conversions_are_skipped() {
        let html = render_report_table(&report(), "http://localhost:3456");
        assert_eq!(html.matches("<tr>").count(), 1);
        assert!(!html.contains("b.png"));
    }

    #[test]
    fn cells_link_original_and_conversions() {
        let html = render_report_table(&report(), "http://localhost:3456");
        assert!(html.contains(
            r#"<a target="_blank" href="https://s.example/a.png?x=1&amp;y=2"><img style="border: 5px solid green" src="https://s.example/a.png?x=1&amp;y=2" height="200px"></a><br>2.00 KB (original)<br>"#
        ));
        assert!(html.contains(
            r#"href="http://localhost:3456/convert/webp/https://s.example/a.png?x=1&amp;y=2"><img style="" src="data:image/webp;base64,AQID""#
        ));
        assert!(html.contains("data:image/svg+xml;base64,"));
    }

    #[test]
    fn document_embeds_page_and_table() {
        let html = render_report_document(&report(), "http://localhost:3456");
        assert!(html.contains("<title>Image report: https://s.example/</title>"));
        assert!(html.contains("<table>"));
    }
}

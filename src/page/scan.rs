use regex::Regex;

/// Collect the `src` values of `<img>` tags in document order.
///
/// Only double-quoted `src` attributes that appear before the tag's closing
/// `>` are recognized. `&amp;` is decoded; `data:` URIs are dropped. At most
/// `limit` sources are returned.
///
/// Example:
/// <img class="hero" src="/a.png?w=1&amp;h=2">   =>   /a.png?w=1&h=2
pub fn image_sources(html: &str, limit: usize) -> Result<Vec<String>, regex::Error> {
    // Capture:
    // 1) src value, up to the closing quote
    // `[^>]*?` keeps the attribute search inside the current tag, and the
    // whitespace before `src` rules out attributes like `data-src`.
    const IMG_SRC_RE: &str = r#"(?i)<img\s(?:[^>]*?\s)?src="([^"]*)""#;
    let re = Regex::new(IMG_SRC_RE)?;

    let mut out = Vec::new();
    for caps in re.captures_iter(html) {
        if out.len() >= limit {
            break;
        }
        let Some(value) = caps.get(1) else { continue };

        let src = value.as_str().replace("&amp;", "&");
        if src.is_empty() || src.starts_with("data:") {
            continue;
        }
        out.push(src);
    }
    Ok(out)
}

//! URL helpers for page and image addresses.
//!
//! These work on plain strings: image sources come straight out of page
//! HTML and are often not valid URLs, so nothing here rejects input.

pub fn has_protocol(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Scheme and authority: `https://a.example/b/c?d` => `https://a.example`.
/// Input without a scheme is returned whole up to the first `/`.
pub fn host_of(url: &str) -> &str {
    let authority_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    let end = url[authority_start..]
        .find(['/', '?', '#'])
        .map(|i| authority_start + i)
        .unwrap_or(url.len());
    &url[..end]
}

/// Everything before the query string (and fragment).
pub fn trim_query(url: &str) -> &str {
    match url.find(['?', '#']) {
        Some(i) => &url[..i],
        None => url,
    }
}

/// Make `src` absolute relative to `host` (as returned by `host_of`).
pub fn resolve(host: &str, src: &str) -> String {
    if has_protocol(src) {
        return src.to_string();
    }
    if let Some(rest) = src.strip_prefix("//") {
        let scheme = host.split_once("://").map(|(s, _)| s).unwrap_or("https");
        return format!("{}://{}", scheme, rest);
    }
    if src.starts_with('/') {
        format!("{}{}", host, src)
    } else {
        format!("{}/{}", host, src)
    }
}

fn last_path_segment(url: &str) -> &str {
    let trimmed = trim_query(url);
    let path = if has_protocol(trimmed) {
        &trimmed[host_of(trimmed).len()..]
    } else {
        trimmed
    };
    path.rsplit('/').next().unwrap_or(path)
}

/// Extension of the last path segment, ignoring the query: `/a/b.png?x=1` => `png`.
pub fn extension(url: &str) -> Option<&str> {
    let (_, ext) = last_path_segment(url).rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

/// Last path segment without query, if non-empty: `/a/b.png?x=1` => `b.png`.
pub fn file_name(url: &str) -> Option<&str> {
    let name = last_path_segment(url);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn host_is_scheme_and_authority() {
        assert_eq!(host_of("https://a.example/b/c?d"), "https://a.example");
        assert_eq!(host_of("http://a.example:8080"), "http://a.example:8080");
        assert_eq!(host_of("http://a.example?q=1"), "http://a.example");
    }

    #[test]
    fn resolves_relative_root_relative_and_absolute() {
        let host = "https://site.example";
        assert_eq!(resolve(host, "img/a.png"), "https://site.example/img/a.png");
        assert_eq!(resolve(host, "/img/a.png"), "https://site.example/img/a.png");
        assert_eq!(resolve(host, "//cdn.example/a.png"), "https://cdn.example/a.png");
        assert_eq!(resolve(host, "http://other.example/a.png"), "http://other.example/a.png");
        assert_eq!(
            resolve("http://plain.example", "//cdn.example/a.png"),
            "http://cdn.example/a.png"
        );
    }

    #[test]
    fn extension_ignores_query_and_host() {
        assert_eq!(extension("https://s.example/a/b.PNG?x=1.jpg"), Some("PNG"));
        assert_eq!(extension("/pic.jpeg#frag"), Some("jpeg"));
        assert_eq!(extension("https://s.example"), None);
        assert_eq!(extension("https://s.example/dir.d/file"), None);
        assert_eq!(extension("https://s.example/trailing."), None);
    }

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(file_name("https://s.example/a/b.png?x=1"), Some("b.png"));
        assert_eq!(file_name("https://s.example/a/"), None);
        assert_eq!(trim_query("https://s.example/a?b=c"), "https://s.example/a");
    }
}

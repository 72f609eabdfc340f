//! Browser-side observer script.
//!
//! Same rule as `ImageSrcRewriter`, expressed against the real DOM. Note that
//! the browser's `src` property is already resolved to an absolute URL, so
//! the relay sees `prefix + https://site/path.png`.

use crate::rewrite::{PrefixPolicy, SrcPrefix};

const OBSERVER_JS: &str = r#"(() => {
    const PREPEND = __PREFIX__;
    const SKIP_PREFIXED = __SKIP_PREFIXED__;

    const observer = new MutationObserver((mutationList) => {
        for (const m of mutationList) {
            for (const n of m.addedNodes) {
                if (n.tagName !== "IMG") continue;
                if (SKIP_PREFIXED && n.src.startsWith(PREPEND)) continue;
                n.src = PREPEND + n.src;
            }
        }
    });

    observer.observe(document, { childList: true, subtree: true });
})();
"#;

/// Render the observer script with `prefix` embedded as a JS string literal.
pub fn observer_script(prefix: &SrcPrefix, policy: PrefixPolicy) -> anyhow::Result<String> {
    // JSON string syntax is valid JS and takes care of quotes and backslashes.
    let literal = serde_json::to_string(prefix.as_str())?;
    let skip = match policy {
        PrefixPolicy::Always => "false",
        PrefixPolicy::SkipPrefixed => "true",
    };
    Ok(OBSERVER_JS
        .replace("__PREFIX__", &literal)
        .replace("__SKIP_PREFIXED__", skip))
}

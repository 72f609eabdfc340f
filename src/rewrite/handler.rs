//! Prefix the `src` of every image element added to the document.

use crate::config::DEFAULT_SRC_PREFIX;
use crate::rewrite::dom::{Document, DomError, MutationCallback, MutationRecord, ObserveOptions};

use tracing::debug;

const IMAGE_TAG: &str = "IMG";

/// URL prefix prepended to image sources. Fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcPrefix(String);

impl SrcPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `prefix + src`, with no validation of either side.
    pub fn apply(&self, src: &str) -> String {
        let mut out = String::with_capacity(self.0.len() + src.len());
        out.push_str(&self.0);
        out.push_str(src);
        out
    }

    pub fn is_applied_to(&self, src: &str) -> bool {
        !self.0.is_empty() && src.starts_with(&self.0)
    }
}

impl Default for SrcPrefix {
    fn default() -> Self {
        Self::new(DEFAULT_SRC_PREFIX)
    }
}

/// What to do with an image that is observed being added more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrefixPolicy {
    /// Prefix on every observed insertion, even if already prefixed.
    #[default]
    Always,
    /// Leave sources that already start with the prefix untouched.
    SkipPrefixed,
}

#[derive(Debug, Clone)]
pub struct ImageSrcRewriter {
    prefix: SrcPrefix,
    policy: PrefixPolicy,
}

impl ImageSrcRewriter {
    pub fn new(prefix: SrcPrefix, policy: PrefixPolicy) -> Self {
        Self { prefix, policy }
    }

    fn rewrite(&self, doc: &mut Document, records: &[MutationRecord]) {
        for record in records {
            for &node in &record.added_nodes {
                if doc.tag_name(node) != Some(IMAGE_TAG) {
                    continue;
                }
                // A missing attribute reads as the empty string.
                let src = doc.get_attribute(node, "src").unwrap_or_default();
                if self.policy == PrefixPolicy::SkipPrefixed && self.prefix.is_applied_to(src) {
                    continue;
                }
                let rewritten = self.prefix.apply(src);
                debug!(node = ?node, from = %src, to = %rewritten, "rewrite image src");
                doc.set_attribute(node, "src", rewritten);
            }
        }
    }
}

impl MutationCallback for ImageSrcRewriter {
    fn on_mutations(&mut self, records: &[MutationRecord], doc: &mut Document) {
        self.rewrite(doc, records);
    }
}

/// Observe the whole document for child-list changes and rewrite inserted images.
/// There is no way to uninstall it.
pub fn install(doc: &mut Document, prefix: SrcPrefix, policy: PrefixPolicy) -> Result<(), DomError> {
    let root = doc.root();
    doc.observe(
        root,
        ObserveOptions::child_list_subtree(),
        ImageSrcRewriter::new(prefix, policy),
    )
}

//! Rich-text facet indexing.
//!
//! Facet ranges are UTF-8 byte offsets into the post text, derived from the
//! first literal occurrence of each anchor. Callers never supply offsets.

use atproto_api::{ByteSlice, Facet, FacetFeature};

use crate::error::AnnotationNotFound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    Link,
    Mention,
    Tag,
}

/// A caller-side annotation: what to attach (`value`) and where (`anchor`).
///
/// `value` is a URI for links, a DID for mentions and the tag text for tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetSpec {
    pub kind: FacetKind,
    pub value: String,
    pub anchor: String,
}

impl FacetSpec {
    pub fn new(kind: FacetKind, value: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            anchor: anchor.into(),
        }
    }

    pub fn link(uri: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self::new(FacetKind::Link, uri, anchor)
    }

    pub fn mention(did: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self::new(FacetKind::Mention, did, anchor)
    }

    pub fn tag(tag: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self::new(FacetKind::Tag, tag, anchor)
    }

    fn feature(&self) -> FacetFeature {
        match self.kind {
            FacetKind::Link => FacetFeature::Link {
                uri: self.value.clone(),
            },
            FacetKind::Mention => FacetFeature::Mention {
                did: self.value.clone(),
            },
            FacetKind::Tag => FacetFeature::Tag {
                tag: self.value.clone(),
            },
        }
    }
}

/// Byte range of the first occurrence of `anchor` in `text`.
///
/// Matching is literal and case-sensitive. An empty anchor never matches.
pub fn find_anchor(text: &str, anchor: &str) -> Option<ByteSlice> {
    if anchor.is_empty() {
        return None;
    }
    text.find(anchor).map(|byte_start| ByteSlice {
        byte_start,
        byte_end: byte_start + anchor.len(),
    })
}

/// Resolve every [`FacetSpec`] against `text`, in input order.
///
/// Fails on the first missing anchor without returning any facets. Specs that
/// share an anchor resolve to the same range.
pub fn index_facets(text: &str, specs: &[FacetSpec]) -> Result<Vec<Facet>, AnnotationNotFound> {
    specs
        .iter()
        .map(|spec| {
            let index = find_anchor(text, &spec.anchor)
                .ok_or_else(|| AnnotationNotFound(spec.anchor.clone()))?;
            Ok(Facet {
                index,
                features: vec![spec.feature()],
            })
        })
        .collect()
}

//! Post record assembly.
//!
//! A post carries at most one embed. When both a link preview and images are
//! supplied, a link with a non-empty title wins and the images are dropped.
//! Images embed only when every image has a matching uploaded blob.

use atproto_api::lexicon::PostRecordType;
use atproto_api::{BlobRef, Embed, EmbedImage, External, PostRecord};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use url::Url;

use crate::error::BuildError;
use crate::richtext::{index_facets, FacetKind, FacetSpec};

/// An image attachment: where to fetch it from and its alt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub alt: String,
    pub uri: Url,
}

impl Image {
    pub fn new(alt: impl Into<String>, uri: Url) -> Self {
        Self {
            alt: alt.into(),
            uri,
        }
    }
}

/// Link preview card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLink {
    pub title: String,
    pub uri: Url,
    pub description: String,
    pub thumb: Option<BlobRef>,
}

impl ExternalLink {
    pub fn new(title: impl Into<String>, uri: Url, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri,
            description: description.into(),
            thumb: None,
        }
    }

    pub fn with_thumb(mut self, thumb: BlobRef) -> Self {
        self.thumb = Some(thumb);
        self
    }

    fn to_embed(&self) -> Embed {
        Embed::External {
            external: External {
                uri: self.uri.to_string(),
                title: self.title.clone(),
                description: self.description.clone(),
                thumb: self.thumb.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostBuilder {
    text: String,
    facets: Vec<FacetSpec>,
    link: Option<ExternalLink>,
    images: Vec<Image>,
    blobs: Vec<BlobRef>,
}

impl PostBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_facet(
        self,
        kind: FacetKind,
        value: impl Into<String>,
        anchor: impl Into<String>,
    ) -> Self {
        self.with_facet_spec(FacetSpec::new(kind, value, anchor))
    }

    pub fn with_facet_spec(mut self, spec: FacetSpec) -> Self {
        self.facets.push(spec);
        self
    }

    pub fn with_external_link(mut self, link: ExternalLink) -> Self {
        self.link = Some(link);
        self
    }

    /// Attach images with their uploaded blobs; `blobs[i]` belongs to `images[i]`.
    pub fn with_images(mut self, blobs: Vec<BlobRef>, images: Vec<Image>) -> Self {
        self.blobs = blobs;
        self.images = images;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Assemble the record, stamping `createdAt` with the current UTC time.
    ///
    /// An image/blob count mismatch yields a record without an embed.
    pub fn build(&self) -> Result<PostRecord, BuildError> {
        self.build_at(OffsetDateTime::now_utc())
    }

    /// Like [`PostBuilder::build`], but an image/blob count mismatch is an error
    /// unless a link preview takes precedence.
    pub fn build_strict(&self) -> Result<PostRecord, BuildError> {
        if !self.link_wins() && !self.images.is_empty() && self.images.len() != self.blobs.len() {
            return Err(BuildError::ImageCountMismatch {
                images: self.images.len(),
                blobs: self.blobs.len(),
            });
        }
        self.build()
    }

    pub fn build_at(&self, created_at: OffsetDateTime) -> Result<PostRecord, BuildError> {
        let created_at = created_at.format(&Rfc3339).map_err(BuildError::Clock)?;
        let facets = index_facets(&self.text, &self.facets)?;
        let embed = select_embed(self.link.as_ref(), &self.images, &self.blobs);

        if embed.is_none() && !self.images.is_empty() && !self.link_wins() {
            tracing::warn!(
                images = self.images.len(),
                blobs = self.blobs.len(),
                "image count does not match uploaded blobs; posting without embed"
            );
        }

        Ok(PostRecord {
            record_type: PostRecordType::Post,
            text: self.text.clone(),
            created_at,
            facets,
            embed,
        })
    }

    fn link_wins(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| !link.title.is_empty())
    }
}

/// Pick the single embed for a post.
///
/// 1) a link with a non-empty title
/// 2) images, when `images.len() == blobs.len()`, zipped by position
/// 3) nothing
pub fn select_embed(
    link: Option<&ExternalLink>,
    images: &[Image],
    blobs: &[BlobRef],
) -> Option<Embed> {
    if let Some(link) = link.filter(|link| !link.title.is_empty()) {
        return Some(link.to_embed());
    }

    if images.is_empty() || images.len() != blobs.len() {
        return None;
    }

    Some(Embed::Images {
        images: images
            .iter()
            .zip(blobs)
            .map(|(image, blob)| EmbedImage {
                alt: image.alt.clone(),
                image: blob.clone(),
            })
            .collect(),
    })
}

//! Attachment upload: fetch source bytes over plain HTTP, then hand them to the
//! PDS as a blob.
//!
//! Bodies are buffered whole in memory; attachments are expected to be small.

use atproto_api::{BlobRef, XrpcClient, XrpcError};
use futures_util::future::join_all;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::{BlobError, FetchError, UploadError};
use crate::post::Image;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Buffered source bytes of one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Uploads attachments through an authenticated transport.
///
/// Every call returns its own result; nothing accumulates across calls.
#[derive(Debug, Clone, Copy)]
pub struct BlobUploader<'a> {
    transport: &'a XrpcClient,
}

impl<'a> BlobUploader<'a> {
    pub fn new(transport: &'a XrpcClient) -> Self {
        Self { transport }
    }

    /// Fetch `image.uri` and upload it as a blob.
    pub async fn upload(&self, image: &Image) -> Result<BlobRef, BlobError> {
        self.ensure_session()?;
        let source = fetch_source(self.transport.http(), &image.uri).await?;
        Ok(self.submit(&image.uri, source).await?)
    }

    /// Upload many attachments; `result[i]` is the blob for `images[i]`.
    ///
    /// Fetches run concurrently; uploads are issued in input order. The first
    /// failure aborts the batch.
    pub async fn upload_many(&self, images: &[Image]) -> Result<Vec<BlobRef>, BlobError> {
        self.ensure_session()?;
        let http = self.transport.http();
        let sources = join_all(images.iter().map(|image| fetch_source(http, &image.uri))).await;

        let mut blobs = Vec::with_capacity(images.len());
        for (image, source) in images.iter().zip(sources) {
            blobs.push(self.submit(&image.uri, source?).await?);
        }
        Ok(blobs)
    }

    fn ensure_session(&self) -> Result<(), UploadError> {
        match self.transport.session() {
            Some(session) if !session.access_jwt.trim().is_empty() => Ok(()),
            _ => Err(UploadError::Unauthenticated),
        }
    }

    async fn submit(&self, origin: &Url, source: FetchedSource) -> Result<BlobRef, UploadError> {
        let size = source.bytes.len();
        let blob = self
            .transport
            .upload_blob(source.bytes, &source.content_type)
            .await
            .map_err(|error| match error {
                XrpcError::MissingSession { .. } => UploadError::Unauthenticated,
                other => UploadError::Transport(other),
            })?;
        tracing::debug!(
            origin = %origin,
            cid = blob.cid(),
            mime_type = %blob.mime_type,
            size,
            "uploaded blob"
        );
        Ok(blob)
    }
}

/// GET `uri` and buffer the body.
pub async fn fetch_source(http: &reqwest::Client, uri: &Url) -> Result<FetchedSource, FetchError> {
    let response = http
        .get(uri.clone())
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: uri.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(url = %uri, status = status.as_u16(), "attachment fetch rejected");
        return Err(FetchError::Status {
            url: uri.to_string(),
            status,
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_owned();
    let bytes = response
        .bytes()
        .await
        .map_err(|source| FetchError::Request {
            url: uri.to_string(),
            source,
        })?;

    Ok(FetchedSource {
        bytes: bytes.to_vec(),
        content_type,
    })
}

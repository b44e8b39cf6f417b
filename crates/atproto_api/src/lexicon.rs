//! Wire shapes for the subset of the `com.atproto` and `app.bsky` lexicons the
//! client speaks. Field names follow the lexicon JSON encoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod nsid {
    pub const CREATE_SESSION: &str = "com.atproto.server.createSession";
    pub const GET_SESSION: &str = "com.atproto.server.getSession";
    pub const CREATE_INVITE_CODE: &str = "com.atproto.server.createInviteCode";
    pub const CREATE_INVITE_CODES: &str = "com.atproto.server.createInviteCodes";
    pub const CREATE_ACCOUNT: &str = "com.atproto.server.createAccount";
    pub const UPLOAD_BLOB: &str = "com.atproto.repo.uploadBlob";
    pub const CREATE_RECORD: &str = "com.atproto.repo.createRecord";
    pub const GET_TIMELINE: &str = "app.bsky.feed.getTimeline";

    pub const ADMIN_PREFIX: &str = "com.atproto.admin.";
}

/// Collection NSID for feed posts.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionInput {
    pub identifier: String,
    pub password: String,
}

/// Authenticated session tokens for one account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_jwt: String,
    pub refresh_jwt: String,
    pub handle: String,
    pub did: String,
}

impl Session {
    pub fn new(
        access_jwt: impl Into<String>,
        refresh_jwt: impl Into<String>,
        handle: impl Into<String>,
        did: impl Into<String>,
    ) -> Self {
        Self {
            access_jwt: access_jwt.into(),
            refresh_jwt: refresh_jwt.into(),
            handle: handle.into(),
            did: did.into(),
        }
    }

    /// A session can authorize repo writes only with both a DID and an access token.
    pub fn is_usable(&self) -> bool {
        !self.did.trim().is_empty() && !self.access_jwt.trim().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_jwt", &"<redacted>")
            .field("refresh_jwt", &"<redacted>")
            .field("handle", &self.handle)
            .field("did", &self.did)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionOutput {
    pub handle: String,
    pub did: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteCodeInput {
    pub use_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_account: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInviteCodeOutput {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountInput {
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

/// Result of `com.atproto.server.createAccount`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccount {
    pub access_jwt: String,
    pub refresh_jwt: String,
    pub handle: String,
    pub did: String,
}

impl CreatedAccount {
    pub fn session(&self) -> Session {
        Session::new(
            self.access_jwt.clone(),
            self.refresh_jwt.clone(),
            self.handle.clone(),
            self.did.clone(),
        )
    }
}

impl fmt::Debug for CreatedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedAccount")
            .field("handle", &self.handle)
            .field("did", &self.did)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobType {
    #[default]
    #[serde(rename = "blob")]
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// Content-addressed reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    #[serde(rename = "$type", default)]
    pub blob_type: BlobType,
    #[serde(rename = "ref")]
    pub cid: CidLink,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: u64,
}

impl BlobRef {
    pub fn new(cid: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            blob_type: BlobType::Blob,
            cid: CidLink { link: cid.into() },
            mime_type: mime_type.into(),
            size,
        }
    }

    pub fn cid(&self) -> &str {
        &self.cid.link
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadBlobOutput {
    pub blob: BlobRef,
}

/// Half-open UTF-8 byte range into post text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct External {
    pub uri: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<BlobRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub alt: String,
    pub image: BlobRef,
}

/// The single rich-content block a post may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum Embed {
    #[serde(rename = "app.bsky.embed.external")]
    External { external: External },
    #[serde(rename = "app.bsky.embed.images")]
    Images { images: Vec<EmbedImage> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostRecordType {
    #[default]
    #[serde(rename = "app.bsky.feed.post")]
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub record_type: PostRecordType,
    pub text: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRecordInput<'a, R: Serialize> {
    pub repo: &'a str,
    pub collection: &'a str,
    pub record: &'a R,
}

/// Durable identity of a created record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub cid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileViewBasic,
    pub record: Value,
    pub indexed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repost_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedViewPost {
    pub post: PostView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub feed: Vec<FeedViewPost>,
}

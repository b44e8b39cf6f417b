//! Transport-only AT Protocol (XRPC) client primitives.
//!
//! This crate owns request building, credential selection and response
//! decoding for the PDS endpoints the agent uses: session creation and
//! validation, invite and account provisioning, blob upload, record creation
//! and timeline reads. It performs no retries and persists nothing.
//!
//! Responses are decoded into the strict shapes in [`lexicon`]; a response that
//! does not match fails with [`XrpcError::Decode`] at this boundary.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod lexicon;
pub mod url;

pub use client::XrpcClient;
pub use config::XrpcConfig;
pub use error::XrpcError;
pub use headers::XrpcAuth;
pub use lexicon::{
    BlobRef, ByteSlice, CreateAccountInput, CreatedAccount, Embed, EmbedImage, External, Facet,
    FacetFeature, FeedViewPost, PostRecord, PostView, RecordRef, Session, Timeline,
    POST_COLLECTION,
};
pub use url::{domain_of, normalize_base_url, xrpc_endpoint, DEFAULT_PDS_URL};

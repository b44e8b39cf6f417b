//! AT Protocol posting agent.
//!
//! # Public API Overview
//! - Log in, validate and re-establish PDS sessions through [`Agent`] or the
//!   server-address helpers ([`connect`], [`validate`], [`reconnect_if_stale`],
//!   [`ensure_session`]).
//! - Provision accounts with [`issue_invite_code`] and [`create_account`].
//! - Upload image attachments as blobs ([`Agent::upload_images`]); results line
//!   up with the inputs by position.
//! - Assemble posts with [`PostBuilder`]: facets are located by anchor text and
//!   at most one embed is attached.
//! - Submit with [`Agent::submit`] and read the home timeline with
//!   [`Agent::get_timeline`].
//!
//! Wire types and the XRPC transport live in the `atproto_api` crate.

pub mod agent;
pub mod blob;
pub mod config;
pub mod error;
pub mod handle;
pub mod post;
pub mod richtext;

pub use crate::agent::{
    connect, create_account, ensure_session, issue_invite_code, reconnect_if_stale, validate,
    Agent, SessionStatus, DEFAULT_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT, TIMELINE_ALGORITHM,
};
pub use crate::blob::{fetch_source, BlobUploader, FetchedSource};
pub use crate::config::AgentConfig;
pub use crate::error::{
    AnnotationNotFound, AuthError, BlobError, BuildError, FetchError, ProvisionError,
    SubmitError, TimelineError, UploadError,
};
pub use crate::handle::handle_from_username;
pub use crate::post::{select_embed, ExternalLink, Image, PostBuilder};
pub use crate::richtext::{find_anchor, index_facets, FacetKind, FacetSpec};

pub use atproto_api::{
    BlobRef, CreatedAccount, Embed, Facet, PostRecord, RecordRef, Session, Timeline,
};

//! S3 Client
//!
//! `s3c` is an async client for Amazon S3 and S3-compatible object stores
//! such as MinIO. It speaks the S3 REST wire protocol over HTTPS: AWS
//! Signature V4 signing, virtual-host and path-style addressing, streaming
//! uploads and downloads, multipart orchestration, server-side compose and
//! copy, presigned URLs and POST policies, and the SELECT event-stream.
//!
//! # Features
//!
//! - **Bucket and object operations**: one method per S3 API, from
//!   `MakeBucket` to `SelectObjectContent`, plus high-level helpers for
//!   multipart upload, compose, copy and file transfer
//! - **Signature V4**: canonical request construction, header and query
//!   presigning, and POST policy signing
//! - **Endpoint handling**: AWS, accelerate, dualstack and China endpoints
//!   with automatic region discovery and caching
//! - **Credential providers**: static, environment, config files, STS
//!   (AssumeRole, web identity, client grants, LDAP, certificate), EC2/ECS
//!   instance metadata, and provider chains
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use s3c::args::{BucketExistsArgs, MakeBucketArgs};
//! use s3c::client::ClientBuilder;
//! use s3c::creds::StaticProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3c::Error> {
//!     let provider = Arc::new(StaticProvider::new("minioadmin", "minioadmin", ""));
//!     let client = ClientBuilder::new("https://play.min.io").provider(provider).build()?;
//!
//!     if !client.bucket_exists(BucketExistsArgs::new("my-bucket")).await? {
//!         client.make_bucket(MakeBucketArgs::new("my-bucket")).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! A [`client::Client`] may be shared across tasks. Calls are sequential
//! per invocation; the library never uploads parts in parallel. Streaming
//! callbacks run on the transport's execution context and must not issue
//! further client calls on the same connection.

#![allow(
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_panics_doc, // the only panics are internal invariants
    clippy::cast_possible_truncation, // usize <-> u64 at transfer-size boundaries
)]

mod request;
mod transport;
mod xml;

pub mod args;
pub mod base_url;
pub mod client;
pub mod creds;
pub mod error;
pub mod multimap;
pub mod post_policy;
pub mod response;
pub mod select;
pub mod signer;
pub mod sse;
pub mod time;
pub mod types;
pub mod utils;

pub use self::client::{Client, ClientBuilder};
pub use self::error::{Error, Result, S3ServerError};
pub use self::multimap::Multimap;
pub use self::sse::Sse;
pub use self::time::UtcTime;

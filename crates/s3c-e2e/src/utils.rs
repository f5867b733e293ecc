use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context as _, Result};
use s3c::args::{BucketExistsArgs, MakeBucketArgs, RemoveBucketArgs, RemoveObjectsArgs};
use s3c::client::ClientBuilder;
use s3c::creds::StaticProvider;
use s3c::types::DeleteObject;

pub fn client() -> Result<s3c::Client> {
    let endpoint = std::env::var("S3C_E2E_ENDPOINT").unwrap_or_else(|_| "https://play.min.io".to_owned());
    let access_key = std::env::var("S3C_E2E_ACCESS_KEY").unwrap_or_else(|_| "Q3AM3UQ867SPQQA43P2F".to_owned());
    let secret_key =
        std::env::var("S3C_E2E_SECRET_KEY").unwrap_or_else(|_| "zuf+tfteSlswRu7BJ86wekitnifILbZam1KYY3TG".to_owned());

    ClientBuilder::new(&endpoint)
        .provider(Arc::new(StaticProvider::new(access_key, secret_key, "")))
        .build()
        .context("unable to build client")
}

/// Distinct bucket name per invocation.
pub fn unique_bucket(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{nanos}-{n}", std::process::id())
}

/// Deterministic pseudo-random payload.
pub fn payload(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    while out.len() < len {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

pub async fn ensure_bucket(client: &s3c::Client, bucket: &str) -> Result<()> {
    if !client.bucket_exists(BucketExistsArgs::new(bucket)).await? {
        client.make_bucket(MakeBucketArgs::new(bucket)).await?;
    }
    Ok(())
}

/// Removes every object (and the bucket) best effort.
pub async fn cleanup_bucket(client: &s3c::Client, bucket: &str) {
    let listing = client.list_objects(s3c::args::ListObjectsArgs {
        recursive: true,
        ..s3c::args::ListObjectsArgs::new(bucket)
    });
    if let Ok(items) = listing.collect().await {
        let objects = items.into_iter().filter(|i| !i.is_prefix).map(|i| DeleteObject {
            name: i.name,
            version_id: String::new(),
        });
        let mut removal = client.remove_objects(RemoveObjectsArgs::new(bucket), objects);
        while removal.next().await.is_some() {}
    }
    let _ = client.remove_bucket(RemoveBucketArgs::new(bucket)).await;
}

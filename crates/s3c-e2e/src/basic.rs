use anyhow::{Result, ensure};
use bytes::Bytes;

use s3c::args::{
    BucketExistsArgs, GetObjectArgs, MakeBucketArgs, PutObjectArgs, RemoveBucketArgs, RemoveObjectArgs, StatObjectArgs,
};

use crate::utils;

/// MakeBucket / BucketExists / RemoveBucket.
pub async fn bucket_lifecycle(client: &s3c::Client) -> Result<()> {
    let bucket = utils::unique_bucket("s3c-e2e-bucket");

    client.make_bucket(MakeBucketArgs::new(&bucket)).await?;
    ensure!(client.bucket_exists(BucketExistsArgs::new(&bucket)).await?, "bucket must exist after creation");

    client.remove_bucket(RemoveBucketArgs::new(&bucket)).await?;
    ensure!(
        !client.bucket_exists(BucketExistsArgs::new(&bucket)).await?,
        "bucket must not exist after removal"
    );
    Ok(())
}

/// Put "hello", read it back, check stat.
pub async fn small_round_trip(client: &s3c::Client) -> Result<()> {
    let bucket = utils::unique_bucket("s3c-e2e-small");
    utils::ensure_bucket(client, &bucket).await?;

    let result = async {
        let body = Bytes::from_static(b"hello");
        let mut reader = &body[..];
        client
            .put_object(PutObjectArgs::new(&bucket, "obj", Some(body.len() as u64)), &mut reader)
            .await?;

        let stat = client.stat_object(StatObjectArgs::new(&bucket, "obj")).await?;
        ensure!(stat.size == 5, "expected size 5, got {}", stat.size);
        ensure!(!stat.etag.is_empty(), "etag must not be empty");

        let mut data = Vec::new();
        let mut on_data = |chunk: &[u8]| {
            data.extend_from_slice(chunk);
            true
        };
        client.get_object(GetObjectArgs::new(&bucket, "obj"), &mut on_data).await?;
        ensure!(data == b"hello", "body mismatch");

        client.remove_object(RemoveObjectArgs::new(&bucket, "obj")).await?;
        Ok(())
    }
    .await;

    utils::cleanup_bucket(client, &bucket).await;
    result
}

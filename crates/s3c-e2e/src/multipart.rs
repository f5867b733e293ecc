use anyhow::{Result, ensure};

use s3c::args::{GetObjectArgs, PutObjectArgs};

use crate::utils;

/// 64 MiB + 1 upload goes multipart and reads back byte-identical.
pub async fn multipart_put(client: &s3c::Client) -> Result<()> {
    let bucket = utils::unique_bucket("s3c-e2e-multipart");
    utils::ensure_bucket(client, &bucket).await?;

    let result = async {
        let body = utils::payload(64 * 1024 * 1024 + 1);
        let mut reader = &body[..];

        let mut args = PutObjectArgs::new(&bucket, "big-obj", Some(body.len() as u64));
        args.part_size = 32 * 1024 * 1024;
        let resp = client.put_object(args, &mut reader).await?;
        ensure!(!resp.etag.is_empty(), "etag must not be empty");

        let mut data = Vec::with_capacity(body.len());
        let mut on_data = |chunk: &[u8]| {
            data.extend_from_slice(chunk);
            true
        };
        client.get_object(GetObjectArgs::new(&bucket, "big-obj"), &mut on_data).await?;
        ensure!(data.len() == body.len(), "expected {} bytes, got {}", body.len(), data.len());
        ensure!(data == body, "body mismatch");
        Ok(())
    }
    .await;

    utils::cleanup_bucket(client, &bucket).await;
    result
}

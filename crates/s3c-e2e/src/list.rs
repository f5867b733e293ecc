use std::collections::BTreeSet;

use anyhow::{Result, ensure};
use bytes::Bytes;

use s3c::args::{ListObjectsArgs, PutObjectArgs};

use crate::utils;

/// 1010 zero-byte objects paginate across at least two pages.
pub async fn list_many_objects(client: &s3c::Client) -> Result<()> {
    let bucket = utils::unique_bucket("s3c-e2e-list");
    utils::ensure_bucket(client, &bucket).await?;

    let result = async {
        const COUNT: usize = 1010;
        for i in 0..COUNT {
            let body = Bytes::new();
            let mut reader = &body[..];
            client
                .put_object(PutObjectArgs::new(&bucket, format!("obj-{i:04}"), Some(0)), &mut reader)
                .await?;
        }

        let mut names = BTreeSet::new();
        let mut listing = client.list_objects(ListObjectsArgs {
            recursive: true,
            ..ListObjectsArgs::new(&bucket)
        });
        while let Some(item) = listing.next().await {
            let item = item?;
            names.insert(item.name);
        }
        ensure!(names.len() == COUNT, "expected {COUNT} distinct names, got {}", names.len());
        Ok(())
    }
    .await;

    utils::cleanup_bucket(client, &bucket).await;
    result
}

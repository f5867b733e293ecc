use anyhow::{Result, ensure};

use s3c::args::{ComposeObjectArgs, ComposeSource, GetObjectArgs, PutObjectArgs, StatObjectArgs};

use crate::utils;

/// Compose two 8 MiB sources; the destination is their concatenation.
pub async fn compose_two_sources(client: &s3c::Client) -> Result<()> {
    let bucket = utils::unique_bucket("s3c-e2e-compose");
    utils::ensure_bucket(client, &bucket).await?;

    let result = async {
        const SIZE: usize = 8 * 1024 * 1024;
        let first = utils::payload(SIZE);
        let second: Vec<u8> = first.iter().map(|b| b.wrapping_add(1)).collect();

        for (name, body) in [("s1", &first), ("s2", &second)] {
            let mut reader = &body[..];
            client
                .put_object(PutObjectArgs::new(&bucket, name, Some(SIZE as u64)), &mut reader)
                .await?;
        }

        let sources = vec![ComposeSource::new(&bucket, "s1"), ComposeSource::new(&bucket, "s2")];
        client
            .compose_object(ComposeObjectArgs::new(&bucket, "dst", sources))
            .await?;

        let stat = client.stat_object(StatObjectArgs::new(&bucket, "dst")).await?;
        ensure!(stat.size == 2 * SIZE as u64, "expected {} bytes, got {}", 2 * SIZE, stat.size);

        let mut data = Vec::with_capacity(2 * SIZE);
        let mut on_data = |chunk: &[u8]| {
            data.extend_from_slice(chunk);
            true
        };
        client.get_object(GetObjectArgs::new(&bucket, "dst"), &mut on_data).await?;
        ensure!(data[..SIZE] == first[..], "first half mismatch");
        ensure!(data[SIZE..] == second[..], "second half mismatch");
        Ok(())
    }
    .await;

    utils::cleanup_bucket(client, &bucket).await;
    result
}

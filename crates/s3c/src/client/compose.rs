//! Server-side copy and compose orchestration.

use http::Method;
use tracing::debug;

use super::Client;
use crate::args::{
    AbortMultipartUploadArgs, CompleteMultipartUploadArgs, ComposeObjectArgs, ComposeSource, CopyObjectArgs,
    CreateMultipartUploadArgs, StatObjectArgs, UploadPartCopyArgs,
};
use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::response::{PutObjectResponse, trim_etag};
use crate::types::Part;
use crate::utils::{MAX_MULTIPART_COUNT, MAX_OBJECT_SIZE, MAX_PART_SIZE, MIN_PART_SIZE};

impl Client {
    fn check_sse(&self, sse: Option<&crate::sse::Sse>) -> Result<()> {
        if let Some(sse) = sse
            && sse.tls_required()
            && !self.base_url().https
        {
            return Err(Error::invalid_arg("SSE operation must be performed over a secure connection"));
        }
        Ok(())
    }

    /// Copies an object server-side. A ranged source or a source larger
    /// than one part (5 GiB) is delegated to [`Client::compose_object`].
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn copy_object(&self, args: CopyObjectArgs) -> Result<PutObjectResponse> {
        args.validate()?;
        self.check_sse(args.write_opts.sse.as_ref())?;
        if args.source.ssec.is_some() && !self.base_url().https {
            return Err(Error::invalid_arg(
                "SSE-C operation must be performed over a secure connection",
            ));
        }

        let stat = self
            .stat_object(StatObjectArgs {
                extra_headers: args.source.extra_headers.clone(),
                extra_query_params: args.source.extra_query_params.clone(),
                bucket: args.source.bucket.clone(),
                region: args.source.region.clone(),
                object: args.source.object.clone(),
                version_id: args.source.version_id.clone(),
                ssec: args.source.ssec.clone(),
                ..StatObjectArgs::default()
            })
            .await?;

        if args.source.conditions.is_ranged() || stat.size > MAX_PART_SIZE {
            if args.metadata_directive == Some(crate::types::Directive::Copy) {
                return Err(Error::invalid_arg(
                    "COPY metadata directive is not applicable to source object size greater than 5 GiB",
                ));
            }
            if args.tagging_directive == Some(crate::types::Directive::Copy) {
                return Err(Error::invalid_arg(
                    "COPY tagging directive is not applicable to source object size greater than 5 GiB",
                ));
            }

            let compose_args = ComposeObjectArgs {
                extra_headers: args.extra_headers,
                extra_query_params: args.extra_query_params,
                bucket: args.bucket,
                region: args.region,
                object: args.object,
                write_opts: args.write_opts,
                sources: vec![ComposeSource::from_source(args.source)],
            };
            return self.compose_object(compose_args).await;
        }

        let mut headers = Multimap::new();
        headers.add_all(&args.write_opts.to_headers()?);
        if let Some(directive) = args.metadata_directive {
            headers.add("x-amz-metadata-directive", directive.as_str());
        }
        if let Some(directive) = args.tagging_directive {
            headers.add("x-amz-tagging-directive", directive.as_str());
        }
        headers.add_all(&args.source.copy_headers()?);

        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::PUT, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        req.headers.add_all(&headers);

        let resp = self.execute(req).await?;
        let mut etag = crate::response::parse_copy_etag(&resp.body)?;
        if etag.is_empty() {
            etag = trim_etag(resp.headers.get_front("etag").unwrap_or_default());
        }
        Ok(PutObjectResponse {
            etag,
            version_id: resp.headers.get_front("x-amz-version-id").unwrap_or_default().to_owned(),
        })
    }

    /// Pre-flights every source with `StatObject`, pinning size and ETag,
    /// and returns the total part count of the compose.
    async fn calc_compose_part_count(&self, sources: &mut [ComposeSource]) -> Result<u64> {
        let source_count = sources.len();
        let mut object_size: u64 = 0;
        let mut part_count: u64 = 0;

        for (i, source) in sources.iter_mut().enumerate() {
            if source.source.ssec.is_some() && !self.base_url().https {
                return Err(Error::invalid_arg(format!(
                    "source {}/{}: SSE-C operation must be performed over a secure connection",
                    source.source.bucket, source.source.object
                )));
            }

            let stat = self
                .stat_object(StatObjectArgs {
                    extra_headers: source.source.extra_headers.clone(),
                    extra_query_params: source.source.extra_query_params.clone(),
                    bucket: source.source.bucket.clone(),
                    region: source.source.region.clone(),
                    object: source.source.object.clone(),
                    version_id: source.source.version_id.clone(),
                    ssec: source.source.ssec.clone(),
                    ..StatObjectArgs::default()
                })
                .await?;

            source.resolve(stat.size, &stat.etag)?;
            let size = source.effective_size();
            let is_last = i + 1 == source_count;

            if size < MIN_PART_SIZE && source_count != 1 && !is_last {
                return Err(Error::invalid_arg(format!(
                    "source {}/{}: size {size} must be greater than {MIN_PART_SIZE}",
                    source.source.bucket, source.source.object
                )));
            }

            object_size += size;
            if object_size > MAX_OBJECT_SIZE {
                return Err(Error::invalid_arg(format!(
                    "destination object size must be less than {MAX_OBJECT_SIZE}"
                )));
            }

            if size > MAX_PART_SIZE {
                let mut count = size / MAX_PART_SIZE;
                let mut last_part_size = size - count * MAX_PART_SIZE;
                if last_part_size > 0 {
                    count += 1;
                } else {
                    last_part_size = MAX_PART_SIZE;
                }

                if last_part_size < MIN_PART_SIZE && source_count != 1 && !is_last {
                    return Err(Error::invalid_arg(format!(
                        "source {}/{}: size {size} for multipart split upload of {size}, \
                         last part size is less than {MIN_PART_SIZE}",
                        source.source.bucket, source.source.object
                    )));
                }
                part_count += count;
            } else {
                part_count += 1;
            }

            if part_count > MAX_MULTIPART_COUNT {
                return Err(Error::invalid_arg(format!(
                    "compose sources create more than allowed multipart count {MAX_MULTIPART_COUNT}"
                )));
            }
        }

        Ok(part_count)
    }

    async fn compose_object_parts(&self, args: &mut ComposeObjectArgs, upload_id: &mut String) -> Result<PutObjectResponse> {
        let part_count = self.calc_compose_part_count(&mut args.sources).await?;

        // A single whole source degrades to a plain server-side copy.
        if part_count == 1 {
            let source = &args.sources[0];
            if !source.source.conditions.is_ranged() {
                let copy_args = CopyObjectArgs {
                    extra_headers: args.extra_headers.clone(),
                    extra_query_params: args.extra_query_params.clone(),
                    bucket: args.bucket.clone(),
                    region: args.region.clone(),
                    object: args.object.clone(),
                    write_opts: args.write_opts.clone(),
                    source: source.source.clone(),
                    metadata_directive: None,
                    tagging_directive: None,
                };
                return Box::pin(self.copy_object(copy_args)).await;
            }
        }

        let headers = args.write_opts.to_headers()?;
        *upload_id = self
            .create_multipart_upload(CreateMultipartUploadArgs {
                extra_headers: args.extra_headers.clone(),
                extra_query_params: args.extra_query_params.clone(),
                bucket: args.bucket.clone(),
                region: args.region.clone(),
                object: args.object.clone(),
                headers,
                ..CreateMultipartUploadArgs::default()
            })
            .await?;
        debug!(bucket = %args.bucket, object = %args.object, upload_id = %upload_id, part_count, "compose started");

        let mut sse_headers = Multimap::new();
        if let Some(sse) = &args.write_opts.sse
            && sse.is_customer_key()
        {
            sse_headers.add_all(&sse.headers());
        }

        let mut part_number: u32 = 0;
        let mut parts: Vec<Part> = Vec::new();

        for source in &args.sources {
            let size = source.effective_size();
            let mut offset = source.source.conditions.offset.unwrap_or(0);

            let mut headers = Multimap::new();
            headers.add_all(source.resolved_headers());
            headers.add_all(&sse_headers);

            if size <= MAX_PART_SIZE {
                part_number += 1;
                let mut part_headers = headers.clone();
                if source.source.conditions.is_ranged() {
                    part_headers.add("x-amz-copy-source-range", format!("bytes={offset}-{}", offset + size - 1));
                }

                let etag = self
                    .upload_part_copy(UploadPartCopyArgs {
                        bucket: args.bucket.clone(),
                        region: args.region.clone(),
                        object: args.object.clone(),
                        upload_id: upload_id.clone(),
                        part_number,
                        headers: part_headers,
                        ..UploadPartCopyArgs::default()
                    })
                    .await?;
                parts.push(Part { number: part_number, etag });
                continue;
            }

            // Split an oversized source into 5 GiB sub-ranges.
            let mut remaining = size;
            while remaining > 0 {
                part_number += 1;
                let chunk = remaining.min(MAX_PART_SIZE);

                let mut part_headers = headers.clone();
                part_headers.add("x-amz-copy-source-range", format!("bytes={offset}-{}", offset + chunk - 1));

                let etag = self
                    .upload_part_copy(UploadPartCopyArgs {
                        bucket: args.bucket.clone(),
                        region: args.region.clone(),
                        object: args.object.clone(),
                        upload_id: upload_id.clone(),
                        part_number,
                        headers: part_headers,
                        ..UploadPartCopyArgs::default()
                    })
                    .await?;
                parts.push(Part { number: part_number, etag });

                offset += chunk;
                remaining -= chunk;
            }
        }

        let resp = self
            .complete_multipart_upload(CompleteMultipartUploadArgs {
                bucket: args.bucket.clone(),
                region: args.region.clone(),
                object: args.object.clone(),
                upload_id: upload_id.clone(),
                parts,
                ..CompleteMultipartUploadArgs::default()
            })
            .await?;
        Ok(PutObjectResponse {
            etag: resp.etag,
            version_id: resp.version_id,
        })
    }

    /// Concatenates existing objects server-side via `UploadPartCopy`
    /// ranges. On any failure after the multipart upload was created, the
    /// upload is aborted (best effort) before the original error is
    /// returned.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn compose_object(&self, args: ComposeObjectArgs) -> Result<PutObjectResponse> {
        args.validate()?;
        self.check_sse(args.write_opts.sse.as_ref())?;

        let mut args = args;
        let mut upload_id = String::new();
        let result = self.compose_object_parts(&mut args, &mut upload_id).await;

        if result.is_err() && !upload_id.is_empty() {
            let abort = self
                .abort_multipart_upload(AbortMultipartUploadArgs {
                    bucket: args.bucket.clone(),
                    region: args.region.clone(),
                    object: args.object.clone(),
                    upload_id,
                    ..AbortMultipartUploadArgs::default()
                })
                .await;
            if let Err(err) = abort {
                debug!(bucket = %args.bucket, object = %args.object, %err, "abort multipart upload failed");
            }
        }

        result
    }
}

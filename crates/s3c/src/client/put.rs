//! Streaming uploads: single PUT or sequential multipart.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt as _};
use tracing::debug;

use super::Client;
use crate::args::{
    AbortMultipartUploadArgs, CompleteMultipartUploadArgs, CreateMultipartUploadArgs, PutObjectApiArgs, PutObjectArgs,
    UploadObjectArgs, UploadPartArgs,
};
use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::response::PutObjectResponse;
use crate::types::Part;
use crate::utils::{PartInfo, calc_part_info};

/// Reads until `buf` is full or the stream ends; returns the bytes read.
async fn read_part<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

impl Client {
    #[allow(clippy::too_many_lines)]
    async fn put_object_parts<R>(
        &self,
        args: &PutObjectArgs,
        reader: &mut R,
        info: PartInfo,
        headers: &Multimap,
        upload_id: &mut String,
    ) -> Result<PutObjectResponse>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let object_size = args.object_size.unwrap_or(0);
        let mut part_size = info.part_size;
        let mut part_count = info.part_count;

        let mut uploaded_size: u64 = 0;
        let mut part_number: u32 = 0;
        let mut one_byte: Option<u8> = None;
        let mut stop = false;
        let mut parts: Vec<Part> = Vec::new();

        let part_size_usize = usize::try_from(part_size).map_err(|_| Error::invalid_arg("part size too large"))?;
        // Unknown-size uploads read one extra byte of look-ahead.
        let buf_size = if part_count > 0 { part_size_usize } else { part_size_usize + 1 };
        let mut buf = vec![0u8; buf_size];

        while !stop {
            part_number += 1;

            let bytes_in_part: usize;
            if part_count > 0 {
                if i64::from(part_number) == part_count {
                    part_size = object_size - uploaded_size;
                    stop = true;
                }
                let want = usize::try_from(part_size).map_err(|_| Error::invalid_arg("part size too large"))?;
                let n = read_part(reader, &mut buf[..want]).await?;
                if n != want {
                    return Err(Error::invalid_arg(format!(
                        "not enough data in the stream; expected: {want}, got: {n} bytes"
                    )));
                }
                bytes_in_part = want;
            } else {
                // Unknown total size: read one byte beyond the part size to
                // detect the final part, carrying that byte into the next
                // iteration.
                let mut offset = 0;
                if let Some(b) = one_byte.take() {
                    buf[0] = b;
                    offset = 1;
                }
                let n = read_part(reader, &mut buf[offset..part_size_usize + 1]).await?;
                let total = offset + n;

                if total <= part_size_usize {
                    part_count = i64::from(part_number);
                    bytes_in_part = total;
                    stop = true;
                } else {
                    one_byte = Some(buf[part_size_usize]);
                    bytes_in_part = part_size_usize;
                }
            }

            let data = Bytes::copy_from_slice(&buf[..bytes_in_part]);
            uploaded_size += data.len() as u64;

            if part_count == 1 {
                return self
                    .put_object_api(PutObjectApiArgs {
                        extra_headers: args.extra_headers.clone(),
                        extra_query_params: args.extra_query_params.clone(),
                        bucket: args.bucket.clone(),
                        region: args.region.clone(),
                        object: args.object.clone(),
                        headers: headers.clone(),
                        data,
                        ..PutObjectApiArgs::default()
                    })
                    .await;
            }

            if upload_id.is_empty() {
                *upload_id = self
                    .create_multipart_upload(CreateMultipartUploadArgs {
                        extra_headers: args.extra_headers.clone(),
                        extra_query_params: args.extra_query_params.clone(),
                        bucket: args.bucket.clone(),
                        region: args.region.clone(),
                        object: args.object.clone(),
                        headers: headers.clone(),
                        ..CreateMultipartUploadArgs::default()
                    })
                    .await?;
                debug!(bucket = %args.bucket, object = %args.object, upload_id = %upload_id, "multipart upload started");
            }

            let mut part_headers = Multimap::new();
            if let Some(sse) = &args.write_opts.sse
                && sse.is_customer_key()
            {
                part_headers.add_all(&sse.headers());
            }

            let resp = self
                .upload_part(UploadPartArgs {
                    bucket: args.bucket.clone(),
                    region: args.region.clone(),
                    object: args.object.clone(),
                    upload_id: upload_id.clone(),
                    part_number,
                    data,
                    headers: part_headers,
                    ..UploadPartArgs::default()
                })
                .await?;
            parts.push(Part {
                number: part_number,
                etag: resp.etag,
            });
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

    /// Uploads an object from a reader, splitting into sequential parts
    /// when the size requires it. On any failure after the multipart upload
    /// was created, the upload is aborted (best effort) before the original
    /// error is returned.
    ///
    /// # Errors
    /// Returns an error on validation, I/O or request failure
    pub async fn put_object<R>(&self, args: PutObjectArgs, reader: &mut R) -> Result<PutObjectResponse>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        args.validate()?;
        if let Some(sse) = &args.write_opts.sse
            && sse.tls_required()
            && !self.base_url().https
        {
            return Err(Error::invalid_arg("SSE operation must be performed over a secure connection"));
        }

        let info = calc_part_info(args.object_size, args.part_size)?;

        let mut headers = args.write_opts.to_headers()?;
        if !headers.contains("Content-Type") {
            if args.content_type.is_empty() {
                headers.add("Content-Type", "application/octet-stream");
            } else {
                headers.add("Content-Type", args.content_type.clone());
            }
        }

        let mut upload_id = String::new();
        let result = self.put_object_parts(&args, reader, info, &headers, &mut upload_id).await;

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

    /// Uploads a local file.
    ///
    /// # Errors
    /// Returns an error on validation, I/O or request failure
    pub async fn upload_object(&self, args: UploadObjectArgs) -> Result<PutObjectResponse> {
        args.validate()?;

        let mut file = tokio::fs::File::open(&args.filename)
            .await
            .map_err(|e| Error::invalid_arg(format!("unable to open file {}; {e}", args.filename.display())))?;
        let object_size = file.metadata().await?.len();

        let put_args = PutObjectArgs {
            extra_headers: args.extra_headers,
            extra_query_params: args.extra_query_params,
            bucket: args.bucket,
            region: args.region,
            object: args.object,
            write_opts: args.write_opts,
            object_size: Some(object_size),
            part_size: args.part_size,
            content_type: args.content_type,
        };
        self.put_object(put_args, &mut file).await
    }
}

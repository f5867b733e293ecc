//! Multipart upload primitives.

use bytes::Bytes;
use http::Method;

use super::Client;
use crate::args::{
    AbortMultipartUploadArgs, CompleteMultipartUploadArgs, CreateMultipartUploadArgs, PutObjectApiArgs, UploadPartArgs,
    UploadPartCopyArgs,
};
use crate::error::Result;
use crate::multimap::Multimap;
use crate::response::{
    CompleteMultipartUploadResponse, PutObjectResponse, parse_complete_multipart_upload, parse_create_multipart_upload,
    trim_etag,
};
use crate::utils::md5sum_base64;
use crate::xml::XmlWriter;

impl Client {
    /// Starts a multipart upload and returns its upload id.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn create_multipart_upload(&self, args: CreateMultipartUploadArgs) -> Result<String> {
        args.validate()?;

        let mut headers = args.headers.clone();
        if !headers.contains("Content-Type") {
            headers.add("Content-Type", "application/octet-stream");
        }

        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::POST, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        req.query_params.add("uploads", "");
        req.headers.add_all(&headers);

        let resp = self.execute(req).await?;
        parse_create_multipart_upload(&resp.body)
    }

    /// Best-effort abort of an in-flight multipart upload.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn abort_multipart_upload(&self, args: AbortMultipartUploadArgs) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::DELETE, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        req.query_params.add("uploadId", args.upload_id);
        self.execute(req).await?;
        Ok(())
    }

    /// Completes a multipart upload with the parts in transmission order.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn complete_multipart_upload(
        &self,
        args: CompleteMultipartUploadArgs,
    ) -> Result<CompleteMultipartUploadResponse> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::POST, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        req.query_params.add("uploadId", args.upload_id);

        let mut w = XmlWriter::new();
        w.start("CompleteMultipartUpload");
        for part in &args.parts {
            w.start("Part");
            w.leaf("PartNumber", &part.number.to_string());
            w.leaf("ETag", &format!("\"{}\"", part.etag));
            w.end("Part");
        }
        w.end("CompleteMultipartUpload");
        let body = w.finish();

        req.headers.add("Content-Type", "application/xml");
        req.headers.add("Content-MD5", md5sum_base64(body.as_bytes()));
        req.body = Bytes::from(body);

        let resp = self.execute(req).await?;
        let version_id = resp.headers.get_front("x-amz-version-id").unwrap_or_default().to_owned();
        parse_complete_multipart_upload(&resp.body, version_id)
    }

    /// Uploads one part of a multipart upload.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn upload_part(&self, args: UploadPartArgs) -> Result<PutObjectResponse> {
        args.validate()?;

        let mut query_params = Multimap::new();
        query_params.add("partNumber", args.part_number.to_string());
        query_params.add("uploadId", args.upload_id);

        self.put_object_api(PutObjectApiArgs {
            extra_headers: args.extra_headers,
            extra_query_params: args.extra_query_params,
            bucket: args.bucket,
            region: args.region,
            object: args.object,
            headers: args.headers,
            query_params,
            data: args.data,
        })
        .await
    }

    /// Copies a server-side byte range into one part of a multipart
    /// upload; the range and source come in as headers.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn upload_part_copy(&self, args: UploadPartCopyArgs) -> Result<String> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::PUT, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        req.query_params.add("partNumber", args.part_number.to_string());
        req.query_params.add("uploadId", args.upload_id);
        req.headers.add_all(&args.headers);

        let resp = self.execute(req).await?;
        let etag = crate::response::parse_copy_etag(&resp.body)?;
        if !etag.is_empty() {
            return Ok(etag);
        }
        Ok(trim_etag(resp.headers.get_front("etag").unwrap_or_default()))
    }
}

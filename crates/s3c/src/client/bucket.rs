//! Bucket-level operations.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::Method;

use super::Client;
use crate::args::{
    BucketArgs, BucketExistsArgs, DeleteBucketEncryptionArgs, DeleteBucketLifecycleArgs, DeleteBucketNotificationArgs,
    DeleteBucketPolicyArgs, DeleteBucketReplicationArgs, DeleteBucketTagsArgs, DeleteObjectLockConfigArgs,
    GetBucketEncryptionArgs, GetBucketLifecycleArgs, GetBucketNotificationArgs, GetBucketPolicyArgs,
    GetBucketReplicationArgs, GetBucketTagsArgs, GetBucketVersioningArgs, GetObjectLockConfigArgs, ListBucketsArgs,
    ListenBucketNotificationArgs, MakeBucketArgs, RemoveBucketArgs, SetBucketEncryptionArgs, SetBucketLifecycleArgs,
    SetBucketNotificationArgs, SetBucketPolicyArgs, SetBucketReplicationArgs, SetBucketTagsArgs,
    SetBucketVersioningArgs, SetObjectLockConfigArgs,
};
use crate::error::{Error, Result};
use crate::response::{
    GetBucketVersioningResponse, parse_bucket_encryption, parse_bucket_lifecycle, parse_bucket_notification,
    parse_bucket_replication, parse_bucket_versioning, parse_list_buckets, parse_object_lock_config, parse_tags,
};
use crate::types::{Bucket, LifecycleConfig, NotificationConfig, NotificationRecord, ObjectLockConfig, ReplicationConfig, SseConfig, tags_to_xml};
use crate::utils::md5sum_base64;
use crate::xml::XmlWriter;

impl Client {
    /// Creates a bucket, priming the region cache on success.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn make_bucket(&self, args: MakeBucketArgs) -> Result<()> {
        args.validate()?;

        let base_region = &self.base_url().region;
        let mut region = args.region.clone();
        if !base_region.is_empty() && !region.is_empty() && base_region != &region {
            return Err(Error::invalid_arg(format!(
                "region must be {base_region}, but passed {region}"
            )));
        }
        if region.is_empty() {
            region = base_region.clone();
        }
        if region.is_empty() {
            region = "us-east-1".to_owned();
        }

        let mut req = self.new_request(Method::PUT, region.clone(), &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        if args.object_lock {
            req.headers.add("x-amz-bucket-object-lock-enabled", "true");
        }

        if region != "us-east-1" {
            let mut w = XmlWriter::new();
            w.start("CreateBucketConfiguration")
                .leaf("LocationConstraint", &region)
                .end("CreateBucketConfiguration");
            req.body = Bytes::from(w.finish());
        }

        self.execute(req).await?;
        self.store_region(&args.bucket, &region);
        Ok(())
    }

    /// # Errors
    /// Returns an error on request failure
    pub async fn list_buckets(&self, args: &ListBucketsArgs) -> Result<Vec<Bucket>> {
        let req = self.new_request(
            Method::GET,
            self.base_url().region.clone(),
            &args.extra_headers,
            &args.extra_query_params,
        );
        let resp = self.execute(req).await?;
        parse_list_buckets(&resp.body)
    }

    /// `NoSuchBucket` answers, including during region resolution, map to
    /// `Ok(false)`.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn bucket_exists(&self, args: BucketExistsArgs) -> Result<bool> {
        args.validate()?;

        let region = match self.get_region(&args.bucket, &args.region).await {
            Ok(region) => region,
            Err(err) if err.is_s3_code("NoSuchBucket") => return Ok(false),
            Err(err) => return Err(err),
        };

        let mut req = self.new_request(Method::HEAD, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        match self.execute(req).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_s3_code("NoSuchBucket") => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn remove_bucket(&self, args: RemoveBucketArgs) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::DELETE, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        self.execute(req).await?;
        Ok(())
    }

    async fn bucket_subresource_get(&self, args: &BucketArgs, subresource: &str) -> Result<Bytes> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params.add(subresource, "");
        let resp = self.execute(req).await?;
        Ok(resp.body)
    }

    async fn bucket_subresource_delete(&self, args: &BucketArgs, subresource: &str) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::DELETE, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params.add(subresource, "");
        self.execute(req).await?;
        Ok(())
    }

    async fn bucket_subresource_put(&self, args: &BucketArgs, subresource: &str, body: String) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::PUT, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params.add(subresource, "");
        req.headers.add("Content-MD5", md5sum_base64(body.as_bytes()));
        req.body = Bytes::from(body);
        self.execute(req).await?;
        Ok(())
    }

    fn plain_bucket_args(bucket: &str, region: &str, extra_headers: &crate::multimap::Multimap, extra_query: &crate::multimap::Multimap) -> BucketArgs {
        BucketArgs {
            extra_headers: extra_headers.clone(),
            extra_query_params: extra_query.clone(),
            bucket: bucket.to_owned(),
            region: region.to_owned(),
        }
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_bucket_policy(&self, args: GetBucketPolicyArgs) -> Result<String> {
        let body = self.bucket_subresource_get(&args, "policy").await?;
        String::from_utf8(body.to_vec()).map_err(|e| Error::invalid_response(format!("policy is not UTF-8: {e}")))
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_bucket_policy(&self, args: SetBucketPolicyArgs) -> Result<()> {
        args.validate()?;
        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "policy", args.policy).await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_bucket_policy(&self, args: DeleteBucketPolicyArgs) -> Result<()> {
        self.bucket_subresource_delete(&args, "policy").await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_bucket_notification(&self, args: GetBucketNotificationArgs) -> Result<NotificationConfig> {
        let body = self.bucket_subresource_get(&args, "notification").await?;
        parse_bucket_notification(&body)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_bucket_notification(&self, args: SetBucketNotificationArgs) -> Result<()> {
        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "notification", args.config.to_xml()).await
    }

    /// Deleting the bucket notification is setting an empty configuration.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_bucket_notification(&self, args: DeleteBucketNotificationArgs) -> Result<()> {
        self.set_bucket_notification(SetBucketNotificationArgs {
            extra_headers: args.extra_headers,
            extra_query_params: args.extra_query_params,
            bucket: args.bucket,
            region: args.region,
            config: NotificationConfig::default(),
        })
        .await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_bucket_encryption(&self, args: GetBucketEncryptionArgs) -> Result<SseConfig> {
        let body = self.bucket_subresource_get(&args, "encryption").await?;
        parse_bucket_encryption(&body)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_bucket_encryption(&self, args: SetBucketEncryptionArgs) -> Result<()> {
        args.validate()?;
        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "encryption", args.config.to_xml()).await
    }

    /// A missing server-side-encryption configuration collapses to success.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_bucket_encryption(&self, args: DeleteBucketEncryptionArgs) -> Result<()> {
        match self.bucket_subresource_delete(&args, "encryption").await {
            Err(err) if err.is_s3_code("ServerSideEncryptionConfigurationNotFoundError") => Ok(()),
            other => other,
        }
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_bucket_versioning(&self, args: GetBucketVersioningArgs) -> Result<GetBucketVersioningResponse> {
        let body = self.bucket_subresource_get(&args, "versioning").await?;
        parse_bucket_versioning(&body)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_bucket_versioning(&self, args: SetBucketVersioningArgs) -> Result<()> {
        let mut w = XmlWriter::new();
        w.start("VersioningConfiguration");
        w.leaf("Status", if args.status { "Enabled" } else { "Suspended" });
        if let Some(mfa_delete) = args.mfa_delete {
            w.leaf("MFADelete", if mfa_delete { "Enabled" } else { "Disabled" });
        }
        w.end("VersioningConfiguration");

        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "versioning", w.finish()).await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_bucket_replication(&self, args: GetBucketReplicationArgs) -> Result<ReplicationConfig> {
        let body = self.bucket_subresource_get(&args, "replication").await?;
        parse_bucket_replication(&body)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_bucket_replication(&self, args: SetBucketReplicationArgs) -> Result<()> {
        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "replication", args.config.to_xml()).await
    }

    /// A missing replication configuration collapses to success.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_bucket_replication(&self, args: DeleteBucketReplicationArgs) -> Result<()> {
        match self.bucket_subresource_delete(&args, "replication").await {
            Err(err) if err.is_s3_code("ReplicationConfigurationNotFoundError") => Ok(()),
            other => other,
        }
    }

    /// A missing lifecycle configuration yields an empty config, not an
    /// error.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_bucket_lifecycle(&self, args: GetBucketLifecycleArgs) -> Result<LifecycleConfig> {
        match self.bucket_subresource_get(&args, "lifecycle").await {
            Ok(body) => parse_bucket_lifecycle(&body),
            Err(err) if err.is_s3_code("NoSuchLifecycleConfiguration") => Ok(LifecycleConfig::default()),
            Err(err) => Err(err),
        }
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_bucket_lifecycle(&self, args: SetBucketLifecycleArgs) -> Result<()> {
        let body = args.config.to_xml()?;
        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "lifecycle", body).await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_bucket_lifecycle(&self, args: DeleteBucketLifecycleArgs) -> Result<()> {
        self.bucket_subresource_delete(&args, "lifecycle").await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_bucket_tags(&self, args: GetBucketTagsArgs) -> Result<BTreeMap<String, String>> {
        let body = self.bucket_subresource_get(&args, "tagging").await?;
        parse_tags(&body)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_bucket_tags(&self, args: SetBucketTagsArgs) -> Result<()> {
        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "tagging", tags_to_xml(&args.tags)).await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_bucket_tags(&self, args: DeleteBucketTagsArgs) -> Result<()> {
        self.bucket_subresource_delete(&args, "tagging").await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_object_lock_config(&self, args: GetObjectLockConfigArgs) -> Result<ObjectLockConfig> {
        let body = self.bucket_subresource_get(&args, "object-lock").await?;
        parse_object_lock_config(&body)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_object_lock_config(&self, args: SetObjectLockConfigArgs) -> Result<()> {
        args.validate()?;
        let bucket_args = Self::plain_bucket_args(&args.bucket, &args.region, &args.extra_headers, &args.extra_query_params);
        self.bucket_subresource_put(&bucket_args, "object-lock", args.config.to_xml()).await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_object_lock_config(&self, args: DeleteObjectLockConfigArgs) -> Result<()> {
        self.bucket_subresource_delete(&args, "object-lock").await
    }

    /// Listens for bucket notifications (MinIO extension, not available on
    /// AWS). `on_records` is invoked once per parsed record batch;
    /// returning `false` closes the stream.
    ///
    /// # Errors
    /// Returns an error on validation, request failure or a malformed
    /// notification frame
    pub async fn listen_bucket_notification(
        &self,
        args: ListenBucketNotificationArgs,
        on_records: &mut (dyn FnMut(Vec<NotificationRecord>) -> bool + Send),
    ) -> Result<()> {
        args.validate()?;
        if self.base_url().aws_host {
            return Err(Error::invalid_arg(
                "ListenBucketNotification API is not supported in Amazon S3",
            ));
        }

        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params.add("prefix", args.prefix.clone());
        req.query_params.add("suffix", args.suffix.clone());
        if args.events.is_empty() {
            req.query_params.add("events", "s3:ObjectCreated:*");
            req.query_params.add("events", "s3:ObjectRemoved:*");
            req.query_params.add("events", "s3:ObjectAccessed:*");
        } else {
            for event in &args.events {
                req.query_params.add("events", event.clone());
            }
        }

        let mut pending: Vec<u8> = Vec::new();
        let mut decode_error: Option<Error> = None;
        let mut on_data = |chunk: &[u8]| -> bool {
            pending.extend_from_slice(chunk);
            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw[..pos]).trim().to_owned();
                if line.is_empty() {
                    continue;
                }

                let json: serde_json::Value = match serde_json::from_str(&line) {
                    Ok(json) => json,
                    Err(err) => {
                        decode_error = Some(Error::Json(err));
                        return false;
                    }
                };
                let Some(raw_records) = json.get("Records").and_then(|v| v.as_array()) else {
                    continue;
                };

                let mut records = Vec::with_capacity(raw_records.len());
                for raw in raw_records {
                    match serde_json::from_value::<NotificationRecord>(raw.clone()) {
                        Ok(record) => records.push(record),
                        Err(err) => {
                            decode_error = Some(Error::Json(err));
                            return false;
                        }
                    }
                }
                if records.is_empty() {
                    continue;
                }
                if !on_records(records) {
                    return false;
                }
            }
            true
        };

        self.execute_with_data_fn(req, &mut on_data).await?;
        match decode_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

//! Argument structs for every operation.
//!
//! Each struct validates itself before any I/O happens; validation failures
//! are returned as [`Error::InvalidArgument`] with no side effects.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;
use http::Method;

use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::select::SelectRequest;
use crate::sse::Sse;
use crate::time::UtcTime;
use crate::types::{Directive, LifecycleConfig, NotificationConfig, ObjectLockConfig, Part, ReplicationConfig, Retention, SseConfig};
use crate::utils::{check_bucket_name, is_valid_non_empty_string};

pub(crate) fn validate_object_name(object: &str) -> Result<()> {
    if !is_valid_non_empty_string(object) {
        return Err(Error::invalid_arg("object name cannot be empty"));
    }
    Ok(())
}

fn validate_upload_id(upload_id: &str) -> Result<()> {
    if !is_valid_non_empty_string(upload_id) {
        return Err(Error::invalid_arg("upload ID cannot be empty"));
    }
    Ok(())
}

fn validate_part_number(part_number: u32) -> Result<()> {
    if !(1..=10_000).contains(&part_number) {
        return Err(Error::invalid_arg("part number must be between 1 and 10000"));
    }
    Ok(())
}

/// Arguments common to all operations targeting a bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
}

impl BucketArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)
    }
}

pub type BucketExistsArgs = BucketArgs;
pub type RemoveBucketArgs = BucketArgs;
pub type GetBucketPolicyArgs = BucketArgs;
pub type DeleteBucketPolicyArgs = BucketArgs;
pub type GetBucketNotificationArgs = BucketArgs;
pub type DeleteBucketNotificationArgs = BucketArgs;
pub type GetBucketEncryptionArgs = BucketArgs;
pub type DeleteBucketEncryptionArgs = BucketArgs;
pub type GetBucketVersioningArgs = BucketArgs;
pub type GetBucketReplicationArgs = BucketArgs;
pub type DeleteBucketReplicationArgs = BucketArgs;
pub type GetBucketLifecycleArgs = BucketArgs;
pub type DeleteBucketLifecycleArgs = BucketArgs;
pub type GetBucketTagsArgs = BucketArgs;
pub type DeleteBucketTagsArgs = BucketArgs;
pub type GetObjectLockConfigArgs = BucketArgs;
pub type DeleteObjectLockConfigArgs = BucketArgs;

#[derive(Debug, Clone, Default)]
pub struct ListBucketsArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
}

#[derive(Debug, Clone, Default)]
pub struct MakeBucketArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object_lock: bool,
}

impl MakeBucketArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, true)
    }
}

/// Arguments common to all operations targeting an object.
#[derive(Debug, Clone, Default)]
pub struct ObjectArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
}

impl ObjectArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectVersionArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub version_id: String,
}

impl ObjectVersionArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

pub type RemoveObjectArgs = ObjectVersionArgs;
pub type GetObjectTagsArgs = ObjectVersionArgs;
pub type DeleteObjectTagsArgs = ObjectVersionArgs;
pub type EnableObjectLegalHoldArgs = ObjectVersionArgs;
pub type DisableObjectLegalHoldArgs = ObjectVersionArgs;
pub type IsObjectLegalHoldEnabledArgs = ObjectVersionArgs;
pub type GetObjectRetentionArgs = ObjectVersionArgs;

/// Byte-range and conditional-read options.
#[derive(Debug, Clone, Default)]
pub struct ReadConditions {
    pub offset: Option<u64>,
    pub length: Option<u64>,
    pub match_etag: String,
    pub not_match_etag: String,
    pub modified_since: Option<UtcTime>,
    pub unmodified_since: Option<UtcTime>,
}

impl ReadConditions {
    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.offset.is_some() || self.length.is_some()
    }

    /// `Range` and `if-*` headers for direct reads.
    pub(crate) fn headers(&self, ssec: Option<&Sse>) -> Result<Multimap> {
        let mut h = Multimap::new();

        let offset = match (self.offset, self.length) {
            (None, Some(_)) => Some(0),
            (offset, _) => offset,
        };
        if let Some(offset) = offset {
            let range = match self.length {
                Some(length) => format!("bytes={offset}-{}", offset + length - 1),
                None => format!("bytes={offset}-"),
            };
            h.add("Range", range);
        }

        if !self.match_etag.is_empty() {
            h.add("if-match", self.match_etag.clone());
        }
        if !self.not_match_etag.is_empty() {
            h.add("if-none-match", self.not_match_etag.clone());
        }
        if let Some(t) = self.modified_since {
            h.add("if-modified-since", t.to_http_header_value()?);
        }
        if let Some(t) = self.unmodified_since {
            h.add("if-unmodified-since", t.to_http_header_value()?);
        }
        if let Some(ssec) = ssec {
            h.add_all(&ssec.headers());
        }
        Ok(h)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatObjectArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub version_id: String,
    /// SSE-C key used to read the object.
    pub ssec: Option<Sse>,
    pub conditions: ReadConditions,
}

impl StatObjectArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

pub type GetObjectArgs = StatObjectArgs;

#[derive(Debug, Clone, Default)]
pub struct DownloadObjectArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub version_id: String,
    pub ssec: Option<Sse>,
    pub filename: PathBuf,
    pub overwrite: bool,
}

impl DownloadObjectArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        if self.filename.as_os_str().is_empty() {
            return Err(Error::invalid_arg("filename cannot be empty"));
        }
        if !self.overwrite && self.filename.exists() {
            return Err(Error::invalid_arg(format!(
                "file {} already exists",
                self.filename.display()
            )));
        }
        Ok(())
    }
}

/// Metadata, encryption, tags and lock options shared by write operations.
#[derive(Debug, Clone, Default)]
pub struct ObjectWriteOpts {
    pub headers: Multimap,
    pub user_metadata: Multimap,
    pub sse: Option<Sse>,
    pub tags: BTreeMap<String, String>,
    pub retention: Option<Retention>,
    pub legal_hold: bool,
}

impl ObjectWriteOpts {
    /// Merged request headers for the write.
    pub(crate) fn to_headers(&self) -> Result<Multimap> {
        let mut h = Multimap::new();
        h.add_all(&self.headers);
        for (key, value) in &self.user_metadata {
            if key.to_ascii_lowercase().starts_with("x-amz-meta-") {
                h.add(key, value);
            } else {
                h.add(format!("x-amz-meta-{key}"), value);
            }
        }
        if let Some(sse) = &self.sse {
            h.add_all(&sse.headers());
        }

        let tagging = self
            .tags
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        if !tagging.is_empty() {
            h.add("x-amz-tagging", tagging);
        }

        if let Some(retention) = &self.retention {
            h.add("x-amz-object-lock-mode", retention.mode.as_str());
            h.add(
                "x-amz-object-lock-retain-until-date",
                retention.retain_until_date.to_iso8601_utc()?,
            );
        }
        if self.legal_hold {
            h.add("x-amz-object-lock-legal-hold", "ON");
        }
        Ok(h)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PutObjectArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub write_opts: ObjectWriteOpts,
    /// Total size, or `None` for unknown-length streaming.
    pub object_size: Option<u64>,
    /// 0 means "choose a part size for me".
    pub part_size: u64,
    pub content_type: String,
}

impl PutObjectArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, object_size: Option<u64>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            object_size,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

/// Low-level single-PUT arguments; `query_params` carries the multipart
/// part-number/upload-id pair when used as `UploadPart`.
#[derive(Debug, Clone, Default)]
pub struct PutObjectApiArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub headers: Multimap,
    pub query_params: Multimap,
    pub data: Bytes,
}

impl PutObjectApiArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, data: Bytes) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            data,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadObjectArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub write_opts: ObjectWriteOpts,
    pub part_size: u64,
    pub content_type: String,
    pub filename: PathBuf,
}

impl UploadObjectArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        if self.filename.as_os_str().is_empty() {
            return Err(Error::invalid_arg("filename cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateMultipartUploadArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub headers: Multimap,
}

impl CreateMultipartUploadArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbortMultipartUploadArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub upload_id: String,
}

impl AbortMultipartUploadArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        validate_upload_id(&self.upload_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompleteMultipartUploadArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub upload_id: String,
    pub parts: Vec<Part>,
}

impl CompleteMultipartUploadArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        validate_upload_id(&self.upload_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadPartArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub upload_id: String,
    pub part_number: u32,
    pub data: Bytes,
    /// Per-part headers (SSE-C).
    pub headers: Multimap,
}

impl UploadPartArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        validate_upload_id(&self.upload_id)?;
        validate_part_number(self.part_number)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadPartCopyArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub upload_id: String,
    pub part_number: u32,
    pub headers: Multimap,
}

impl UploadPartCopyArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        validate_upload_id(&self.upload_id)?;
        validate_part_number(self.part_number)
    }
}

/// The source side of a copy or compose.
#[derive(Debug, Clone, Default)]
pub struct CopySource {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub version_id: String,
    pub ssec: Option<Sse>,
    pub conditions: ReadConditions,
}

impl CopySource {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }

    /// `x-amz-copy-source*` headers for this source.
    pub(crate) fn copy_headers(&self) -> Result<Multimap> {
        let mut h = Multimap::new();

        let mut copy_source = urlencoding::encode(&format!("/{}/{}", self.bucket, self.object)).into_owned();
        if !self.version_id.is_empty() {
            copy_source.push_str("?versionId=");
            copy_source.push_str(&urlencoding::encode(&self.version_id));
        }
        h.add("x-amz-copy-source", copy_source);

        if let Some(ssec) = &self.ssec {
            h.add_all(&ssec.copy_headers());
        }
        if !self.conditions.match_etag.is_empty() {
            h.add("x-amz-copy-source-if-match", self.conditions.match_etag.clone());
        }
        if !self.conditions.not_match_etag.is_empty() {
            h.add("x-amz-copy-source-if-none-match", self.conditions.not_match_etag.clone());
        }
        if let Some(t) = self.conditions.modified_since {
            h.add("x-amz-copy-source-if-modified-since", t.to_http_header_value()?);
        }
        if let Some(t) = self.conditions.unmodified_since {
            h.add("x-amz-copy-source-if-unmodified-since", t.to_http_header_value()?);
        }
        Ok(h)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CopyObjectArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub write_opts: ObjectWriteOpts,
    pub source: CopySource,
    pub metadata_directive: Option<Directive>,
    pub tagging_directive: Option<Directive>,
}

impl CopyObjectArgs {
    #[must_use]
    pub fn new(source: CopySource, bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            source,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        self.source.validate()?;

        if self.source.conditions.is_ranged() {
            if self.metadata_directive == Some(Directive::Copy) {
                return Err(Error::invalid_arg(
                    "COPY metadata directive is not applicable to source object with range",
                ));
            }
            if self.tagging_directive == Some(Directive::Copy) {
                return Err(Error::invalid_arg(
                    "COPY tagging directive is not applicable to source object with range",
                ));
            }
        }
        Ok(())
    }
}

/// One source of a compose. `resolve` pins the source to the size and ETag
/// learned from `StatObject` before the copy ranges are issued.
#[derive(Debug, Clone, Default)]
pub struct ComposeSource {
    pub source: CopySource,
    resolved_size: Option<u64>,
    resolved_headers: Option<Multimap>,
}

impl ComposeSource {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            source: CopySource::new(bucket, object),
            resolved_size: None,
            resolved_headers: None,
        }
    }

    #[must_use]
    pub fn from_source(source: CopySource) -> Self {
        Self {
            source,
            resolved_size: None,
            resolved_headers: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.source.validate()
    }

    fn describe(&self) -> String {
        let mut msg = format!("source {}/{}", self.source.bucket, self.source.object);
        if !self.source.version_id.is_empty() {
            msg.push_str("?versionId=");
            msg.push_str(&self.source.version_id);
        }
        msg
    }

    pub(crate) fn resolve(&mut self, object_size: u64, etag: &str) -> Result<()> {
        if let Some(offset) = self.source.conditions.offset
            && offset >= object_size
        {
            return Err(Error::invalid_arg(format!(
                "{}: offset {offset} is beyond object size {object_size}",
                self.describe()
            )));
        }
        if let Some(length) = self.source.conditions.length {
            if length > object_size {
                return Err(Error::invalid_arg(format!(
                    "{}: length {length} is beyond object size {object_size}",
                    self.describe()
                )));
            }
            let offset = self.source.conditions.offset.unwrap_or(0);
            if offset + length > object_size {
                return Err(Error::invalid_arg(format!(
                    "{}: compose size {} is beyond object size {object_size}",
                    self.describe(),
                    offset + length
                )));
            }
        }

        let mut headers = self.source.copy_headers()?;
        if !headers.contains("x-amz-copy-source-if-match") {
            headers.add("x-amz-copy-source-if-match", etag);
        }
        self.resolved_size = Some(object_size);
        self.resolved_headers = Some(headers);
        Ok(())
    }

    /// Number of bytes this source contributes.
    pub(crate) fn effective_size(&self) -> u64 {
        let object_size = self.resolved_size.expect("compose source is resolved");
        match (self.source.conditions.offset, self.source.conditions.length) {
            (_, Some(length)) => length,
            (Some(offset), None) => object_size - offset,
            (None, None) => object_size,
        }
    }

    pub(crate) fn resolved_headers(&self) -> &Multimap {
        self.resolved_headers.as_ref().expect("compose source is resolved")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComposeObjectArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub write_opts: ObjectWriteOpts,
    pub sources: Vec<ComposeSource>,
}

impl ComposeObjectArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, sources: Vec<ComposeSource>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            sources,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        if self.sources.is_empty() {
            return Err(Error::invalid_arg("compose sources cannot be empty"));
        }
        for (i, source) in self.sources.iter().enumerate() {
            source
                .validate()
                .map_err(|err| Error::invalid_arg(format!("source {}: {err}", i + 1)))?;
        }
        Ok(())
    }
}

/// Unified listing arguments; the client picks V1, V2 or the versions API.
#[derive(Debug, Clone)]
pub struct ListObjectsArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub delimiter: String,
    pub use_url_encoding_type: bool,
    /// Only for `ListObjectsV1`.
    pub marker: String,
    /// Only for `ListObjectsV2`.
    pub start_after: String,
    /// Only for `ListObjectVersions`.
    pub key_marker: String,
    pub max_keys: u32,
    pub prefix: String,
    /// Only for `ListObjectsV2`.
    pub continuation_token: String,
    /// Only for `ListObjectsV2`.
    pub fetch_owner: bool,
    /// Only for `ListObjectVersions`.
    pub version_id_marker: String,
    /// MinIO extension for `ListObjectsV2`.
    pub include_user_metadata: bool,
    pub recursive: bool,
    pub use_api_v1: bool,
    pub include_versions: bool,
}

impl Default for ListObjectsArgs {
    fn default() -> Self {
        Self {
            extra_headers: Multimap::new(),
            extra_query_params: Multimap::new(),
            bucket: String::new(),
            region: String::new(),
            delimiter: String::new(),
            use_url_encoding_type: true,
            marker: String::new(),
            start_after: String::new(),
            key_marker: String::new(),
            max_keys: 1000,
            prefix: String::new(),
            continuation_token: String::new(),
            fetch_owner: false,
            version_id_marker: String::new(),
            include_user_metadata: false,
            recursive: false,
            use_api_v1: false,
            include_versions: false,
        }
    }
}

impl ListObjectsArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemoveObjectsArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub bypass_governance_mode: bool,
    /// Quiet mode suppresses per-key success entries in the response.
    pub quiet: bool,
}

impl RemoveObjectsArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            quiet: true,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)
    }
}

#[derive(Debug, Clone)]
pub struct SelectObjectContentArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub ssec: Option<Sse>,
    pub request: SelectRequest,
}

impl SelectObjectContentArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, request: SelectRequest) -> Self {
        Self {
            extra_headers: Multimap::new(),
            extra_query_params: Multimap::new(),
            bucket: bucket.into(),
            region: String::new(),
            object: object.into(),
            ssec: None,
            request,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        if !is_valid_non_empty_string(&self.request.expression) {
            return Err(Error::invalid_arg("SQL expression cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListenBucketNotificationArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub prefix: String,
    pub suffix: String,
    pub events: Vec<String>,
}

impl ListenBucketNotificationArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)
    }
}

pub const DEFAULT_EXPIRY_SECONDS: u32 = 60 * 60 * 24 * 7; // 7 days

#[derive(Debug, Clone)]
pub struct GetPresignedObjectUrlArgs {
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub version_id: String,
    pub method: Method,
    pub expiry_seconds: u32,
    /// Signing time override; defaults to now.
    pub request_time: Option<UtcTime>,
}

impl GetPresignedObjectUrlArgs {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, method: Method) -> Self {
        Self {
            extra_query_params: Multimap::new(),
            bucket: bucket.into(),
            region: String::new(),
            object: object.into(),
            version_id: String::new(),
            method,
            expiry_seconds: DEFAULT_EXPIRY_SECONDS,
            request_time: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)?;
        if !(1..=DEFAULT_EXPIRY_SECONDS).contains(&self.expiry_seconds) {
            return Err(Error::invalid_arg(format!(
                "expiry seconds must be between 1 and {DEFAULT_EXPIRY_SECONDS}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetBucketPolicyArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub policy: String,
}

impl SetBucketPolicyArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        if !is_valid_non_empty_string(&self.policy) {
            return Err(Error::invalid_arg("bucket policy cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetBucketNotificationArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub config: NotificationConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SetBucketEncryptionArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub config: SseConfig,
}

impl SetBucketEncryptionArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        if self.config.sse_algorithm.is_empty() {
            return Err(Error::invalid_arg("SSE algorithm cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetBucketVersioningArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub status: bool,
    pub mfa_delete: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SetBucketReplicationArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub config: ReplicationConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SetBucketLifecycleArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub config: LifecycleConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SetBucketTagsArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct SetObjectLockConfigArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub config: ObjectLockConfig,
}

impl SetObjectLockConfigArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        if self.config.retention_days.is_some() && self.config.retention_years.is_some() {
            return Err(Error::invalid_arg("only one of retention days or years must be set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SetObjectRetentionArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub version_id: String,
    pub retention_mode: crate::types::RetentionMode,
    pub retain_until_date: UtcTime,
}

impl SetObjectRetentionArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetObjectTagsArgs {
    pub extra_headers: Multimap,
    pub extra_query_params: Multimap,
    pub bucket: String,
    pub region: String,
    pub object: String,
    pub version_id: String,
    pub tags: BTreeMap<String, String>,
}

impl SetObjectTagsArgs {
    pub(crate) fn validate(&self) -> Result<()> {
        check_bucket_name(&self.bucket, false)?;
        validate_object_name(&self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_args_validation() {
        assert!(BucketArgs::new("valid-bucket").validate().is_ok());
        assert!(BucketArgs::new("").validate().is_err());
        assert!(BucketArgs::new(" padded ").validate().is_err());
    }

    #[test]
    fn object_args_validation() {
        assert!(ObjectArgs::new("bkt", "obj").validate().is_ok());
        assert!(ObjectArgs::new("bkt", "").validate().is_err());
        assert!(ObjectArgs::new("bkt", "  ").validate().is_err());
    }

    #[test]
    fn upload_part_validation() {
        let mut args = UploadPartArgs {
            bucket: "bkt".to_owned(),
            object: "obj".to_owned(),
            upload_id: "uid".to_owned(),
            part_number: 1,
            ..UploadPartArgs::default()
        };
        assert!(args.validate().is_ok());
        args.part_number = 0;
        assert!(args.validate().is_err());
        args.part_number = 10_001;
        assert!(args.validate().is_err());
        args.part_number = 10_000;
        assert!(args.validate().is_ok());
        args.upload_id = String::new();
        assert!(args.validate().is_err());
    }

    #[test]
    fn read_conditions_range_header() {
        let conditions = ReadConditions {
            offset: Some(100),
            length: Some(50),
            ..ReadConditions::default()
        };
        let headers = conditions.headers(None).unwrap();
        assert_eq!(headers.get_front("Range"), Some("bytes=100-149"));

        let conditions = ReadConditions {
            length: Some(10),
            ..ReadConditions::default()
        };
        let headers = conditions.headers(None).unwrap();
        assert_eq!(headers.get_front("Range"), Some("bytes=0-9"));

        let conditions = ReadConditions {
            offset: Some(5),
            ..ReadConditions::default()
        };
        let headers = conditions.headers(None).unwrap();
        assert_eq!(headers.get_front("Range"), Some("bytes=5-"));
    }

    #[test]
    fn copy_source_headers() {
        let mut source = CopySource::new("src-bkt", "dir/obj");
        source.version_id = "v1".to_owned();
        source.conditions.match_etag = "etag123".to_owned();
        let headers = source.copy_headers().unwrap();
        assert_eq!(
            headers.get_front("x-amz-copy-source"),
            Some("%2Fsrc-bkt%2Fdir%2Fobj?versionId=v1")
        );
        assert_eq!(headers.get_front("x-amz-copy-source-if-match"), Some("etag123"));
    }

    #[test]
    fn copy_args_reject_copy_directive_with_range() {
        let mut source = CopySource::new("src", "obj");
        source.conditions.offset = Some(1);
        let mut args = CopyObjectArgs::new(source, "dst", "obj");
        args.metadata_directive = Some(Directive::Copy);
        assert!(args.validate().is_err());

        args.metadata_directive = Some(Directive::Replace);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn compose_source_resolution() {
        let mut source = ComposeSource::new("bkt", "obj");
        source.source.conditions.offset = Some(10);
        assert!(source.resolve(5, "etag").is_err());

        let mut source = ComposeSource::new("bkt", "obj");
        source.source.conditions.length = Some(100);
        assert!(source.resolve(50, "etag").is_err());

        let mut source = ComposeSource::new("bkt", "obj");
        source.resolve(64, "etag").unwrap();
        assert_eq!(source.effective_size(), 64);
        assert_eq!(source.resolved_headers().get_front("x-amz-copy-source-if-match"), Some("etag"));

        let mut source = ComposeSource::new("bkt", "obj");
        source.source.conditions.offset = Some(16);
        source.resolve(64, "etag").unwrap();
        assert_eq!(source.effective_size(), 48);
    }

    #[test]
    fn write_opts_headers() {
        let mut opts = ObjectWriteOpts::default();
        opts.user_metadata.add("project", "s3c");
        opts.tags.insert("env".to_owned(), "dev".to_owned());
        opts.legal_hold = true;
        let headers = opts.to_headers().unwrap();
        assert_eq!(headers.get_front("x-amz-meta-project"), Some("s3c"));
        assert_eq!(headers.get_front("x-amz-tagging"), Some("env=dev"));
        assert_eq!(headers.get_front("x-amz-object-lock-legal-hold"), Some("ON"));
    }

    #[test]
    fn presigned_url_expiry_bounds() {
        let mut args = GetPresignedObjectUrlArgs::new("bkt", "obj", Method::GET);
        assert!(args.validate().is_ok());
        args.expiry_seconds = 0;
        assert!(args.validate().is_err());
        args.expiry_seconds = DEFAULT_EXPIRY_SECONDS + 1;
        assert!(args.validate().is_err());
    }
}

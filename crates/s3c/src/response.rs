//! Typed responses and XML response-document parsing.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::time::UtcTime;
use crate::types::{
    Bucket, DeleteError, Item, LifecycleConfig, LifecycleRule, NotificationConfig, NotificationDestination,
    ObjectLockConfig, Owner, Retention, RetentionMode, SseConfig,
};

pub(crate) fn from_xml<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(data).map_err(|e| Error::invalid_response(format!("response is not UTF-8: {e}")))?;
    Ok(quick_xml::de::from_str(text)?)
}

pub(crate) fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_owned()
}

/// `<Error>` document body of a failed request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub(crate) struct ErrorDocument {
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
    pub host_id: String,
    pub bucket_name: String,
    pub key: String,
}

// --- ListBuckets ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlBucket {
    name: String,
    creation_date: Option<UtcTime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlBuckets {
    bucket: Vec<XmlBucket>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlListAllMyBucketsResult {
    buckets: XmlBuckets,
}

pub(crate) fn parse_list_buckets(data: &[u8]) -> Result<Vec<Bucket>> {
    let parsed: XmlListAllMyBucketsResult = from_xml(data)?;
    Ok(parsed
        .buckets
        .bucket
        .into_iter()
        .map(|b| Bucket {
            name: b.name,
            creation_date: b.creation_date,
        })
        .collect())
}

// --- listings ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlOwner {
    #[serde(rename = "ID")]
    id: String,
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlObject {
    key: String,
    last_modified: Option<UtcTime>,
    e_tag: String,
    size: Option<u64>,
    storage_class: String,
    owner: Option<XmlOwner>,
    version_id: String,
    is_latest: Option<bool>,
    user_metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlCommonPrefix {
    prefix: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlListBucketResult {
    is_truncated: Option<bool>,
    encoding_type: Option<String>,
    contents: Vec<XmlObject>,
    common_prefixes: Vec<XmlCommonPrefix>,
    next_marker: String,
    next_continuation_token: String,
    next_key_marker: String,
    next_version_id_marker: String,
    version: Vec<XmlObject>,
    delete_marker: Vec<XmlObject>,
}

/// One page of a listing, V1, V2 or versions.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsResponse {
    pub contents: Vec<Item>,
    pub is_truncated: bool,
    pub next_marker: String,
    pub next_continuation_token: String,
    pub next_key_marker: String,
    pub next_version_id_marker: String,
}

fn decode_key(key: &str, url_encoded: bool) -> Result<String> {
    if url_encoded {
        Ok(urlencoding::decode(key)
            .map_err(|e| Error::invalid_response(format!("invalid url-encoded key {key}: {e}")))?
            .into_owned())
    } else {
        Ok(key.to_owned())
    }
}

fn item_of(entry: XmlObject, url_encoded: bool, is_delete_marker: bool) -> Result<Item> {
    Ok(Item {
        name: decode_key(&entry.key, url_encoded)?,
        last_modified: entry.last_modified,
        etag: trim_etag(&entry.e_tag),
        size: entry.size.unwrap_or(0),
        owner: entry.owner.map(|o| Owner {
            id: o.id,
            display_name: o.display_name,
        }),
        storage_class: entry.storage_class,
        version_id: entry.version_id,
        is_latest: entry.is_latest.unwrap_or(false),
        is_delete_marker,
        is_prefix: false,
        user_metadata: entry.user_metadata.unwrap_or_default(),
    })
}

pub(crate) fn parse_list_objects(data: &[u8], include_versions: bool) -> Result<ListObjectsResponse> {
    let parsed: XmlListBucketResult = from_xml(data)?;
    let url_encoded = parsed.encoding_type.as_deref() == Some("url");

    let mut contents = Vec::new();
    if include_versions {
        for entry in parsed.version {
            contents.push(item_of(entry, url_encoded, false)?);
        }
        for entry in parsed.delete_marker {
            contents.push(item_of(entry, url_encoded, true)?);
        }
    } else {
        for entry in parsed.contents {
            contents.push(item_of(entry, url_encoded, false)?);
        }
    }
    for prefix in parsed.common_prefixes {
        contents.push(Item {
            name: decode_key(&prefix.prefix, url_encoded)?,
            is_prefix: true,
            ..Item::default()
        });
    }

    Ok(ListObjectsResponse {
        contents,
        is_truncated: parsed.is_truncated.unwrap_or(false),
        next_marker: decode_key(&parsed.next_marker, url_encoded)?,
        next_continuation_token: parsed.next_continuation_token,
        next_key_marker: decode_key(&parsed.next_key_marker, url_encoded)?,
        next_version_id_marker: parsed.next_version_id_marker,
    })
}

// --- multipart ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlInitiateMultipartUploadResult {
    upload_id: String,
}

pub(crate) fn parse_create_multipart_upload(data: &[u8]) -> Result<String> {
    let parsed: XmlInitiateMultipartUploadResult = from_xml(data)?;
    if parsed.upload_id.is_empty() {
        return Err(Error::invalid_response("InitiateMultipartUploadResult carries no UploadId"));
    }
    Ok(parsed.upload_id)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlCompleteMultipartUploadResult {
    bucket: String,
    key: String,
    e_tag: String,
    location: String,
}

/// Result of `CompleteMultipartUpload`.
#[derive(Debug, Clone, Default)]
pub struct CompleteMultipartUploadResponse {
    pub bucket_name: String,
    pub object_name: String,
    pub etag: String,
    pub location: String,
    pub version_id: String,
}

pub(crate) fn parse_complete_multipart_upload(data: &[u8], version_id: String) -> Result<CompleteMultipartUploadResponse> {
    let parsed: XmlCompleteMultipartUploadResult = from_xml(data)?;
    Ok(CompleteMultipartUploadResponse {
        bucket_name: parsed.bucket,
        object_name: parsed.key,
        etag: trim_etag(&parsed.e_tag),
        location: parsed.location,
        version_id,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlCopyPartResult {
    e_tag: String,
}

/// ETag of an `UploadPartCopy`/`CopyObject` result document; empty when the
/// body carries none.
pub(crate) fn parse_copy_etag(data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let parsed: XmlCopyPartResult = from_xml(data)?;
    Ok(trim_etag(&parsed.e_tag))
}

// --- bulk delete ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlDeleteError {
    key: String,
    version_id: String,
    code: String,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlDeleted {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlDeleteResult {
    deleted: Vec<XmlDeleted>,
    error: Vec<XmlDeleteError>,
}

/// Result of one bulk-delete request.
#[derive(Debug, Clone, Default)]
pub struct RemoveObjectsResponse {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteError>,
}

pub(crate) fn parse_remove_objects(data: &[u8]) -> Result<RemoveObjectsResponse> {
    let parsed: XmlDeleteResult = from_xml(data)?;
    Ok(RemoveObjectsResponse {
        deleted: parsed.deleted.into_iter().map(|d| d.key).collect(),
        errors: parsed
            .error
            .into_iter()
            .map(|e| DeleteError {
                code: e.code,
                message: e.message,
                object_name: e.key,
                version_id: e.version_id,
            })
            .collect(),
    })
}

// --- location ---

#[derive(Debug, Default, Deserialize)]
struct XmlLocationConstraint {
    #[serde(rename = "$text", default)]
    value: String,
}

pub(crate) fn parse_location_constraint(data: &[u8]) -> Result<String> {
    let parsed: XmlLocationConstraint = from_xml(data)?;
    Ok(parsed.value)
}

// --- bucket configs ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlVersioningConfiguration {
    status: Option<String>,
    #[serde(rename = "MFADelete")]
    mfa_delete: Option<String>,
}

/// Versioning state; `None` fields were absent from the document.
#[derive(Debug, Clone, Default)]
pub struct GetBucketVersioningResponse {
    pub status: Option<bool>,
    pub mfa_delete: Option<bool>,
}

pub(crate) fn parse_bucket_versioning(data: &[u8]) -> Result<GetBucketVersioningResponse> {
    let parsed: XmlVersioningConfiguration = from_xml(data)?;
    Ok(GetBucketVersioningResponse {
        status: parsed.status.map(|s| s == "Enabled"),
        mfa_delete: parsed.mfa_delete.map(|s| s == "Enabled"),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlApplyDefault {
    #[serde(rename = "SSEAlgorithm")]
    sse_algorithm: String,
    #[serde(rename = "KMSMasterKeyID")]
    kms_master_key_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlSseRule {
    apply_server_side_encryption_by_default: XmlApplyDefault,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlSseConfiguration {
    rule: XmlSseRule,
}

pub(crate) fn parse_bucket_encryption(data: &[u8]) -> Result<SseConfig> {
    let parsed: XmlSseConfiguration = from_xml(data)?;
    let inner = parsed.rule.apply_server_side_encryption_by_default;
    Ok(SseConfig {
        sse_algorithm: inner.sse_algorithm,
        kms_master_key_id: inner.kms_master_key_id,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlTag {
    key: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlTagSet {
    tag: Vec<XmlTag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlTagging {
    tag_set: XmlTagSet,
}

pub(crate) fn parse_tags(data: &[u8]) -> Result<BTreeMap<String, String>> {
    let parsed: XmlTagging = from_xml(data)?;
    Ok(parsed.tag_set.tag.into_iter().map(|t| (t.key, t.value)).collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlLifecycleExpiration {
    date: Option<UtcTime>,
    days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlLifecycleTransition {
    date: Option<UtcTime>,
    days: Option<u32>,
    storage_class: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlNoncurrentExpiration {
    noncurrent_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlAbortIncomplete {
    days_after_initiation: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlLifecycleFilter {
    prefix: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlLifecycleRule {
    #[serde(rename = "ID")]
    id: String,
    status: String,
    prefix: String,
    filter: Option<XmlLifecycleFilter>,
    expiration: Option<XmlLifecycleExpiration>,
    transition: Option<XmlLifecycleTransition>,
    noncurrent_version_expiration: Option<XmlNoncurrentExpiration>,
    abort_incomplete_multipart_upload: Option<XmlAbortIncomplete>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlLifecycleConfiguration {
    rule: Vec<XmlLifecycleRule>,
}

pub(crate) fn parse_bucket_lifecycle(data: &[u8]) -> Result<LifecycleConfig> {
    let parsed: XmlLifecycleConfiguration = from_xml(data)?;
    let rules = parsed
        .rule
        .into_iter()
        .map(|r| {
            let prefix = match &r.filter {
                Some(filter) if !filter.prefix.is_empty() => filter.prefix.clone(),
                _ => r.prefix,
            };
            LifecycleRule {
                id: r.id,
                enabled: r.status == "Enabled",
                prefix,
                expiration_days: r.expiration.as_ref().and_then(|e| e.days),
                expiration_date: r.expiration.as_ref().and_then(|e| e.date),
                noncurrent_expiration_days: r.noncurrent_version_expiration.and_then(|e| e.noncurrent_days),
                transition_days: r.transition.as_ref().and_then(|t| t.days),
                transition_date: r.transition.as_ref().and_then(|t| t.date),
                transition_storage_class: r.transition.map(|t| t.storage_class).unwrap_or_default(),
                abort_incomplete_multipart_days: r.abort_incomplete_multipart_upload.and_then(|a| a.days_after_initiation),
            }
        })
        .collect();
    Ok(LifecycleConfig { rules })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlReplicationDestination {
    bucket: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlStatusHolder {
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlReplicationRule {
    #[serde(rename = "ID")]
    id: String,
    status: String,
    priority: Option<u32>,
    filter: Option<XmlLifecycleFilter>,
    delete_marker_replication: Option<XmlStatusHolder>,
    destination: XmlReplicationDestination,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlReplicationConfiguration {
    role: String,
    rule: Vec<XmlReplicationRule>,
}

pub(crate) fn parse_bucket_replication(data: &[u8]) -> Result<crate::types::ReplicationConfig> {
    let parsed: XmlReplicationConfiguration = from_xml(data)?;
    Ok(crate::types::ReplicationConfig {
        role: parsed.role,
        rules: parsed
            .rule
            .into_iter()
            .map(|r| crate::types::ReplicationRule {
                id: r.id,
                enabled: r.status == "Enabled",
                priority: r.priority,
                prefix: r.filter.map(|f| f.prefix).unwrap_or_default(),
                delete_marker_replication: r.delete_marker_replication.is_some_and(|s| s.status == "Enabled"),
                destination_bucket_arn: r.destination.bucket,
            })
            .collect(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlDefaultRetention {
    mode: String,
    days: Option<u32>,
    years: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlObjectLockRule {
    default_retention: Option<XmlDefaultRetention>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlObjectLockConfiguration {
    rule: Option<XmlObjectLockRule>,
}

pub(crate) fn parse_object_lock_config(data: &[u8]) -> Result<ObjectLockConfig> {
    let parsed: XmlObjectLockConfiguration = from_xml(data)?;
    let Some(retention) = parsed.rule.and_then(|r| r.default_retention) else {
        return Ok(ObjectLockConfig::default());
    };
    Ok(ObjectLockConfig {
        retention_mode: Some(RetentionMode::parse(&retention.mode)?),
        retention_days: retention.days,
        retention_years: retention.years,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlLegalHold {
    status: String,
}

pub(crate) fn parse_legal_hold(data: &[u8]) -> Result<bool> {
    let parsed: XmlLegalHold = from_xml(data)?;
    Ok(parsed.status == "ON")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlRetention {
    mode: String,
    retain_until_date: Option<UtcTime>,
}

pub(crate) fn parse_object_retention(data: &[u8]) -> Result<Option<Retention>> {
    let parsed: XmlRetention = from_xml(data)?;
    if parsed.mode.is_empty() {
        return Ok(None);
    }
    let retain_until_date = parsed
        .retain_until_date
        .ok_or_else(|| Error::invalid_response("Retention carries no RetainUntilDate"))?;
    Ok(Some(Retention {
        mode: RetentionMode::parse(&parsed.mode)?,
        retain_until_date,
    }))
}

// --- bucket notification ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlFilterRule {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlS3Key {
    filter_rule: Vec<XmlFilterRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlNotificationFilter {
    s3_key: XmlS3Key,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlNotificationDestination {
    id: String,
    queue: String,
    topic: String,
    cloud_function: String,
    event: Vec<String>,
    filter: Option<XmlNotificationFilter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlNotificationConfiguration {
    queue_configuration: Vec<XmlNotificationDestination>,
    topic_configuration: Vec<XmlNotificationDestination>,
    cloud_function_configuration: Vec<XmlNotificationDestination>,
}

fn destination_of(entry: XmlNotificationDestination) -> NotificationDestination {
    let mut dest = NotificationDestination {
        id: entry.id,
        arn: String::new(),
        events: entry.event,
        prefix_filter: String::new(),
        suffix_filter: String::new(),
    };
    for candidate in [entry.queue, entry.topic, entry.cloud_function] {
        if !candidate.is_empty() {
            dest.arn = candidate;
            break;
        }
    }
    if let Some(filter) = entry.filter {
        for rule in filter.s3_key.filter_rule {
            match rule.name.as_str() {
                "prefix" => dest.prefix_filter = rule.value,
                "suffix" => dest.suffix_filter = rule.value,
                _ => {}
            }
        }
    }
    dest
}

pub(crate) fn parse_bucket_notification(data: &[u8]) -> Result<NotificationConfig> {
    let parsed: XmlNotificationConfiguration = from_xml(data)?;
    Ok(NotificationConfig {
        queue_configs: parsed.queue_configuration.into_iter().map(destination_of).collect(),
        topic_configs: parsed.topic_configuration.into_iter().map(destination_of).collect(),
        cloud_func_configs: parsed.cloud_function_configuration.into_iter().map(destination_of).collect(),
    })
}

// --- header-derived responses ---

/// Result of a single or multipart PUT.
#[derive(Debug, Clone, Default)]
pub struct PutObjectResponse {
    pub etag: String,
    pub version_id: String,
}

/// Result of `StatObject`.
#[derive(Debug, Clone, Default)]
pub struct StatObjectResponse {
    pub bucket_name: String,
    pub object_name: String,
    pub version_id: String,
    pub etag: String,
    pub size: u64,
    pub last_modified: Option<UtcTime>,
    pub retention_mode: Option<RetentionMode>,
    pub retention_retain_until_date: Option<UtcTime>,
    pub legal_hold: Option<bool>,
    pub delete_marker: bool,
    pub user_metadata: BTreeMap<String, String>,
    pub headers: Multimap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_document() {
        let xml = b"<Error><Code>NoSuchKey</Code><Message>The resource you requested does not exist</Message>\
                    <Resource>/mybucket/myfoto.jpg</Resource><RequestId>4442587FB7D0A2F9</RequestId></Error>";
        let parsed: ErrorDocument = from_xml(xml).unwrap();
        assert_eq!(parsed.code, "NoSuchKey");
        assert_eq!(parsed.resource, "/mybucket/myfoto.jpg");
        assert_eq!(parsed.request_id, "4442587FB7D0A2F9");
    }

    #[test]
    fn list_buckets() {
        let xml = b"<ListAllMyBucketsResult><Owner><ID>minio</ID></Owner><Buckets>\
                    <Bucket><Name>first</Name><CreationDate>2024-01-15T10:00:00.000Z</CreationDate></Bucket>\
                    <Bucket><Name>second</Name></Bucket>\
                    </Buckets></ListAllMyBucketsResult>";
        let buckets = parse_list_buckets(xml).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].name, "first");
        assert!(buckets[0].creation_date.is_some());
        assert!(buckets[1].creation_date.is_none());
    }

    #[test]
    fn list_objects_v2_page() {
        let xml = b"<ListBucketResult><Name>bkt</Name><IsTruncated>true</IsTruncated>\
                    <NextContinuationToken>tok</NextContinuationToken>\
                    <Contents><Key>a.txt</Key><LastModified>2024-01-15T10:00:00.000Z</LastModified>\
                    <ETag>\"abc\"</ETag><Size>5</Size><StorageClass>STANDARD</StorageClass></Contents>\
                    <Contents><Key>b.txt</Key><Size>7</Size></Contents>\
                    <CommonPrefixes><Prefix>dir/</Prefix></CommonPrefixes>\
                    </ListBucketResult>";
        let page = parse_list_objects(xml, false).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token, "tok");
        assert_eq!(page.contents.len(), 3);
        assert_eq!(page.contents[0].name, "a.txt");
        assert_eq!(page.contents[0].etag, "abc");
        assert_eq!(page.contents[0].size, 5);
        assert!(page.contents[2].is_prefix);
        assert_eq!(page.contents[2].name, "dir/");
    }

    #[test]
    fn list_objects_url_encoded_keys() {
        let xml = b"<ListBucketResult><EncodingType>url</EncodingType>\
                    <Contents><Key>a%20b.txt</Key></Contents></ListBucketResult>";
        let page = parse_list_objects(xml, false).unwrap();
        assert_eq!(page.contents[0].name, "a b.txt");
    }

    #[test]
    fn list_object_versions_page() {
        let xml = b"<ListVersionsResult><IsTruncated>false</IsTruncated>\
                    <Version><Key>a.txt</Key><VersionId>v1</VersionId><IsLatest>true</IsLatest><Size>5</Size></Version>\
                    <DeleteMarker><Key>b.txt</Key><VersionId>v2</VersionId></DeleteMarker>\
                    </ListVersionsResult>";
        let page = parse_list_objects(xml, true).unwrap();
        assert_eq!(page.contents.len(), 2);
        assert_eq!(page.contents[0].version_id, "v1");
        assert!(page.contents[0].is_latest);
        assert!(!page.contents[0].is_delete_marker);
        assert!(page.contents[1].is_delete_marker);
    }

    #[test]
    fn create_multipart_upload_result() {
        let xml = b"<InitiateMultipartUploadResult><Bucket>bkt</Bucket><Key>obj</Key>\
                    <UploadId>upload-123</UploadId></InitiateMultipartUploadResult>";
        assert_eq!(parse_create_multipart_upload(xml).unwrap(), "upload-123");
        assert!(parse_create_multipart_upload(b"<InitiateMultipartUploadResult/>").is_err());
    }

    #[test]
    fn complete_multipart_upload_result() {
        let xml = b"<CompleteMultipartUploadResult><Bucket>bkt</Bucket><Key>obj</Key>\
                    <ETag>\"final-etag\"</ETag><Location>https://play.min.io/bkt/obj</Location>\
                    </CompleteMultipartUploadResult>";
        let resp = parse_complete_multipart_upload(xml, "v7".to_owned()).unwrap();
        assert_eq!(resp.etag, "final-etag");
        assert_eq!(resp.version_id, "v7");
        assert_eq!(resp.object_name, "obj");
    }

    #[test]
    fn delete_result() {
        let xml = b"<DeleteResult><Deleted><Key>ok.txt</Key></Deleted>\
                    <Error><Key>locked.txt</Key><Code>AccessDenied</Code><Message>Access Denied</Message></Error>\
                    </DeleteResult>";
        let resp = parse_remove_objects(xml).unwrap();
        assert_eq!(resp.deleted, vec!["ok.txt".to_owned()]);
        assert_eq!(resp.errors.len(), 1);
        assert_eq!(resp.errors[0].code, "AccessDenied");
        assert_eq!(resp.errors[0].object_name, "locked.txt");
    }

    #[test]
    fn location_constraint() {
        assert_eq!(
            parse_location_constraint(b"<LocationConstraint>eu-west-1</LocationConstraint>").unwrap(),
            "eu-west-1"
        );
        assert_eq!(parse_location_constraint(b"<LocationConstraint/>").unwrap(), "");
    }

    #[test]
    fn bucket_versioning() {
        let resp = parse_bucket_versioning(b"<VersioningConfiguration><Status>Enabled</Status></VersioningConfiguration>")
            .unwrap();
        assert_eq!(resp.status, Some(true));
        assert_eq!(resp.mfa_delete, None);

        let resp = parse_bucket_versioning(b"<VersioningConfiguration/>").unwrap();
        assert_eq!(resp.status, None);

        let resp =
            parse_bucket_versioning(b"<VersioningConfiguration><Status>Suspended</Status></VersioningConfiguration>")
                .unwrap();
        assert_eq!(resp.status, Some(false));
    }

    #[test]
    fn bucket_encryption() {
        let xml = b"<ServerSideEncryptionConfiguration><Rule><ApplyServerSideEncryptionByDefault>\
                    <SSEAlgorithm>aws:kms</SSEAlgorithm><KMSMasterKeyID>key-1</KMSMasterKeyID>\
                    </ApplyServerSideEncryptionByDefault></Rule></ServerSideEncryptionConfiguration>";
        let config = parse_bucket_encryption(xml).unwrap();
        assert_eq!(config.sse_algorithm, "aws:kms");
        assert_eq!(config.kms_master_key_id, "key-1");
    }

    #[test]
    fn tagging() {
        let xml = b"<Tagging><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag>\
                    <Tag><Key>team</Key><Value>storage</Value></Tag></TagSet></Tagging>";
        let tags = parse_tags(xml).unwrap();
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn lifecycle_config() {
        let xml = b"<LifecycleConfiguration><Rule><ID>expire-logs</ID><Status>Enabled</Status>\
                    <Filter><Prefix>logs/</Prefix></Filter><Expiration><Days>30</Days></Expiration>\
                    </Rule></LifecycleConfiguration>";
        let config = parse_bucket_lifecycle(xml).unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].id, "expire-logs");
        assert!(config.rules[0].enabled);
        assert_eq!(config.rules[0].prefix, "logs/");
        assert_eq!(config.rules[0].expiration_days, Some(30));
    }

    #[test]
    fn replication_config() {
        let xml = b"<ReplicationConfiguration><Role>arn:aws:iam::1:role/rep</Role>\
                    <Rule><ID>r1</ID><Status>Enabled</Status><Priority>1</Priority>\
                    <DeleteMarkerReplication><Status>Disabled</Status></DeleteMarkerReplication>\
                    <Filter><Prefix>docs/</Prefix></Filter>\
                    <Destination><Bucket>arn:aws:s3:::backup</Bucket></Destination>\
                    </Rule></ReplicationConfiguration>";
        let config = parse_bucket_replication(xml).unwrap();
        assert_eq!(config.role, "arn:aws:iam::1:role/rep");
        assert_eq!(config.rules[0].destination_bucket_arn, "arn:aws:s3:::backup");
        assert!(!config.rules[0].delete_marker_replication);
    }

    #[test]
    fn object_lock_config() {
        let xml = b"<ObjectLockConfiguration><ObjectLockEnabled>Enabled</ObjectLockEnabled>\
                    <Rule><DefaultRetention><Mode>COMPLIANCE</Mode><Years>1</Years></DefaultRetention></Rule>\
                    </ObjectLockConfiguration>";
        let config = parse_object_lock_config(xml).unwrap();
        assert_eq!(config.retention_mode, Some(RetentionMode::Compliance));
        assert_eq!(config.retention_years, Some(1));

        let empty = parse_object_lock_config(
            b"<ObjectLockConfiguration><ObjectLockEnabled>Enabled</ObjectLockEnabled></ObjectLockConfiguration>",
        )
        .unwrap();
        assert!(empty.retention_mode.is_none());
    }

    #[test]
    fn legal_hold() {
        assert!(parse_legal_hold(b"<LegalHold><Status>ON</Status></LegalHold>").unwrap());
        assert!(!parse_legal_hold(b"<LegalHold><Status>OFF</Status></LegalHold>").unwrap());
    }

    #[test]
    fn object_retention() {
        let xml = b"<Retention><Mode>GOVERNANCE</Mode>\
                    <RetainUntilDate>2030-01-01T00:00:00.000Z</RetainUntilDate></Retention>";
        let retention = parse_object_retention(xml).unwrap().unwrap();
        assert_eq!(retention.mode, RetentionMode::Governance);
        assert!(parse_object_retention(b"<Retention/>").unwrap().is_none());
    }

    #[test]
    fn bucket_notification() {
        let xml = b"<NotificationConfiguration><QueueConfiguration><Id>1</Id>\
                    <Queue>arn:minio:sqs::primary:webhook</Queue>\
                    <Event>s3:ObjectCreated:*</Event>\
                    <Filter><S3Key><FilterRule><Name>prefix</Name><Value>images/</Value></FilterRule>\
                    <FilterRule><Name>suffix</Name><Value>.jpg</Value></FilterRule></S3Key></Filter>\
                    </QueueConfiguration></NotificationConfiguration>";
        let config = parse_bucket_notification(xml).unwrap();
        assert_eq!(config.queue_configs.len(), 1);
        let dest = &config.queue_configs[0];
        assert_eq!(dest.arn, "arn:minio:sqs::primary:webhook");
        assert_eq!(dest.events, vec!["s3:ObjectCreated:*".to_owned()]);
        assert_eq!(dest.prefix_filter, "images/");
        assert_eq!(dest.suffix_filter, ".jpg");
    }
}

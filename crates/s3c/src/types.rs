//! Domain types shared across operations.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::time::UtcTime;
use crate::xml::XmlWriter;

/// One uploaded part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub number: u32,
    pub etag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionMode {
    Governance,
    Compliance,
}

impl RetentionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Governance => "GOVERNANCE",
            Self::Compliance => "COMPLIANCE",
        }
    }

    /// # Errors
    /// Returns an error for an unknown mode string
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "GOVERNANCE" => Ok(Self::Governance),
            "COMPLIANCE" => Ok(Self::Compliance),
            _ => Err(Error::invalid_response(format!("unknown retention mode {s}"))),
        }
    }
}

/// Object retention: mode plus retain-until date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retention {
    pub mode: RetentionMode,
    pub retain_until_date: UtcTime,
}

/// `x-amz-metadata-directive` / `x-amz-tagging-directive` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Copy,
    Replace,
}

impl Directive {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "COPY",
            Self::Replace => "REPLACE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bucket {
    pub name: String,
    pub creation_date: Option<UtcTime>,
}

#[derive(Debug, Clone, Default)]
pub struct Owner {
    pub id: String,
    pub display_name: String,
}

/// One entry yielded by the listing iterator: an object, a version, or a
/// common prefix.
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub name: String,
    pub last_modified: Option<UtcTime>,
    pub etag: String,
    pub size: u64,
    pub owner: Option<Owner>,
    pub storage_class: String,
    pub version_id: String,
    pub is_latest: bool,
    pub is_delete_marker: bool,
    /// True for a common-prefix (directory-style) entry.
    pub is_prefix: bool,
    pub user_metadata: BTreeMap<String, String>,
}

/// A key (and optional version) to delete in a bulk delete.
#[derive(Debug, Clone, Default)]
pub struct DeleteObject {
    pub name: String,
    pub version_id: String,
}

/// A per-key failure reported inside a bulk-delete response.
#[derive(Debug, Clone, Default)]
pub struct DeleteError {
    pub code: String,
    pub message: String,
    pub object_name: String,
    pub version_id: String,
}

/// Default bucket encryption.
#[derive(Debug, Clone, Default)]
pub struct SseConfig {
    pub sse_algorithm: String,
    pub kms_master_key_id: String,
}

impl SseConfig {
    #[must_use]
    pub fn s3() -> Self {
        Self {
            sse_algorithm: "AES256".to_owned(),
            kms_master_key_id: String::new(),
        }
    }

    #[must_use]
    pub fn kms(kms_master_key_id: impl Into<String>) -> Self {
        Self {
            sse_algorithm: "aws:kms".to_owned(),
            kms_master_key_id: kms_master_key_id.into(),
        }
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.start("ServerSideEncryptionConfiguration")
            .start("Rule")
            .start("ApplyServerSideEncryptionByDefault")
            .leaf("SSEAlgorithm", &self.sse_algorithm);
        if !self.kms_master_key_id.is_empty() {
            w.leaf("KMSMasterKeyID", &self.kms_master_key_id);
        }
        w.end("ApplyServerSideEncryptionByDefault").end("Rule").end("ServerSideEncryptionConfiguration");
        w.finish()
    }
}

/// One lifecycle rule. Only the commonly used fields are modeled; the
/// filter is a plain prefix.
#[derive(Debug, Clone, Default)]
pub struct LifecycleRule {
    pub id: String,
    pub enabled: bool,
    pub prefix: String,
    pub expiration_days: Option<u32>,
    pub expiration_date: Option<UtcTime>,
    pub noncurrent_expiration_days: Option<u32>,
    pub transition_days: Option<u32>,
    pub transition_date: Option<UtcTime>,
    pub transition_storage_class: String,
    pub abort_incomplete_multipart_days: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct LifecycleConfig {
    pub rules: Vec<LifecycleRule>,
}

impl LifecycleConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn to_xml(&self) -> Result<String> {
        let mut w = XmlWriter::new();
        w.start("LifecycleConfiguration");
        for rule in &self.rules {
            w.start("Rule");
            if !rule.id.is_empty() {
                w.leaf("ID", &rule.id);
            }
            w.leaf("Status", if rule.enabled { "Enabled" } else { "Disabled" });
            w.start("Filter").leaf("Prefix", &rule.prefix).end("Filter");
            if let Some(days) = rule.abort_incomplete_multipart_days {
                w.start("AbortIncompleteMultipartUpload")
                    .leaf("DaysAfterInitiation", &days.to_string())
                    .end("AbortIncompleteMultipartUpload");
            }
            if rule.expiration_days.is_some() || rule.expiration_date.is_some() {
                w.start("Expiration");
                if let Some(date) = rule.expiration_date {
                    w.leaf("Date", &date.to_iso8601_utc()?);
                }
                if let Some(days) = rule.expiration_days {
                    w.leaf("Days", &days.to_string());
                }
                w.end("Expiration");
            }
            if let Some(days) = rule.noncurrent_expiration_days {
                w.start("NoncurrentVersionExpiration")
                    .leaf("NoncurrentDays", &days.to_string())
                    .end("NoncurrentVersionExpiration");
            }
            if rule.transition_days.is_some() || rule.transition_date.is_some() {
                w.start("Transition");
                if let Some(date) = rule.transition_date {
                    w.leaf("Date", &date.to_iso8601_utc()?);
                }
                if let Some(days) = rule.transition_days {
                    w.leaf("Days", &days.to_string());
                }
                if !rule.transition_storage_class.is_empty() {
                    w.leaf("StorageClass", &rule.transition_storage_class);
                }
                w.end("Transition");
            }
            w.end("Rule");
        }
        w.end("LifecycleConfiguration");
        Ok(w.finish())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplicationRule {
    pub id: String,
    pub enabled: bool,
    pub priority: Option<u32>,
    pub prefix: String,
    pub delete_marker_replication: bool,
    /// Destination bucket ARN, `arn:aws:s3:::<bucket>`.
    pub destination_bucket_arn: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReplicationConfig {
    pub role: String,
    pub rules: Vec<ReplicationRule>,
}

impl ReplicationConfig {
    pub(crate) fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.start("ReplicationConfiguration");
        if !self.role.is_empty() {
            w.leaf("Role", &self.role);
        }
        for rule in &self.rules {
            w.start("Rule");
            if !rule.id.is_empty() {
                w.leaf("ID", &rule.id);
            }
            w.leaf("Status", if rule.enabled { "Enabled" } else { "Disabled" });
            if let Some(priority) = rule.priority {
                w.leaf("Priority", &priority.to_string());
            }
            w.start("DeleteMarkerReplication")
                .leaf("Status", if rule.delete_marker_replication { "Enabled" } else { "Disabled" })
                .end("DeleteMarkerReplication");
            w.start("Filter").leaf("Prefix", &rule.prefix).end("Filter");
            w.start("Destination").leaf("Bucket", &rule.destination_bucket_arn).end("Destination");
            w.end("Rule");
        }
        w.end("ReplicationConfiguration");
        w.finish()
    }
}

/// Default object-lock retention for a bucket.
#[derive(Debug, Clone, Default)]
pub struct ObjectLockConfig {
    pub retention_mode: Option<RetentionMode>,
    pub retention_days: Option<u32>,
    pub retention_years: Option<u32>,
}

impl ObjectLockConfig {
    pub(crate) fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.start("ObjectLockConfiguration");
        w.leaf("ObjectLockEnabled", "Enabled");
        if let Some(mode) = self.retention_mode {
            w.start("Rule").start("DefaultRetention");
            w.leaf("Mode", mode.as_str());
            if let Some(days) = self.retention_days {
                w.leaf("Days", &days.to_string());
            }
            if let Some(years) = self.retention_years {
                w.leaf("Years", &years.to_string());
            }
            w.end("DefaultRetention").end("Rule");
        }
        w.end("ObjectLockConfiguration");
        w.finish()
    }
}

/// One notification destination (queue, topic or cloud function).
#[derive(Debug, Clone, Default)]
pub struct NotificationDestination {
    pub id: String,
    pub arn: String,
    pub events: Vec<String>,
    pub prefix_filter: String,
    pub suffix_filter: String,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub queue_configs: Vec<NotificationDestination>,
    pub topic_configs: Vec<NotificationDestination>,
    pub cloud_func_configs: Vec<NotificationDestination>,
}

impl NotificationConfig {
    fn write_destination(w: &mut XmlWriter, config_tag: &str, arn_tag: &str, dest: &NotificationDestination) {
        w.start(config_tag);
        if !dest.id.is_empty() {
            w.leaf("Id", &dest.id);
        }
        w.leaf(arn_tag, &dest.arn);
        for event in &dest.events {
            w.leaf("Event", event);
        }
        if !dest.prefix_filter.is_empty() || !dest.suffix_filter.is_empty() {
            w.start("Filter").start("S3Key");
            if !dest.prefix_filter.is_empty() {
                w.start("FilterRule").leaf("Name", "prefix").leaf("Value", &dest.prefix_filter).end("FilterRule");
            }
            if !dest.suffix_filter.is_empty() {
                w.start("FilterRule").leaf("Name", "suffix").leaf("Value", &dest.suffix_filter).end("FilterRule");
            }
            w.end("S3Key").end("Filter");
        }
        w.end(config_tag);
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.start("NotificationConfiguration");
        for dest in &self.queue_configs {
            Self::write_destination(&mut w, "QueueConfiguration", "Queue", dest);
        }
        for dest in &self.topic_configs {
            Self::write_destination(&mut w, "TopicConfiguration", "Topic", dest);
        }
        for dest in &self.cloud_func_configs {
            Self::write_destination(&mut w, "CloudFunctionConfiguration", "CloudFunction", dest);
        }
        w.end("NotificationConfiguration");
        w.finish()
    }
}

/// Writes a `<Tagging>` document from a tag map.
pub(crate) fn tags_to_xml(tags: &BTreeMap<String, String>) -> String {
    let mut w = XmlWriter::new();
    w.start("Tagging");
    if !tags.is_empty() {
        w.start("TagSet");
        for (key, value) in tags {
            w.start("Tag").leaf("Key", key).leaf("Value", value).end("Tag");
        }
        w.end("TagSet");
    }
    w.end("Tagging");
    w.finish()
}

// --- bucket notification records (newline-delimited JSON frames) ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationRecord {
    #[serde(rename = "eventVersion")]
    pub event_version: String,
    #[serde(rename = "eventSource")]
    pub event_source: String,
    #[serde(rename = "awsRegion")]
    pub aws_region: String,
    #[serde(rename = "eventTime")]
    pub event_time: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "userIdentity")]
    pub user_identity: NotificationIdentity,
    #[serde(rename = "requestParameters")]
    pub request_parameters: NotificationRequestParameters,
    #[serde(rename = "responseElements")]
    pub response_elements: NotificationResponseElements,
    pub s3: NotificationS3,
    pub source: NotificationSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationIdentity {
    #[serde(rename = "principalId")]
    pub principal_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationRequestParameters {
    #[serde(rename = "principalId")]
    pub principal_id: String,
    pub region: String,
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationResponseElements {
    #[serde(rename = "content-length")]
    pub content_length: String,
    #[serde(rename = "x-amz-request-id")]
    pub x_amz_request_id: String,
    #[serde(rename = "x-minio-deployment-id")]
    pub x_minio_deployment_id: String,
    #[serde(rename = "x-minio-origin-endpoint")]
    pub x_minio_origin_endpoint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationS3 {
    #[serde(rename = "s3SchemaVersion")]
    pub s3_schema_version: String,
    #[serde(rename = "configurationId")]
    pub configuration_id: String,
    pub bucket: NotificationBucket,
    pub object: NotificationObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationBucket {
    pub name: String,
    pub arn: String,
    #[serde(rename = "ownerIdentity")]
    pub owner_identity: NotificationIdentity,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationObject {
    pub key: String,
    pub size: u64,
    #[serde(rename = "eTag")]
    pub etag: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub sequencer: String,
    #[serde(rename = "userMetadata")]
    pub user_metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationSource {
    pub host: String,
    pub port: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
}

/// Extracts `x-amz-meta-*` entries, with the prefix stripped.
pub(crate) fn user_metadata_of(headers: &Multimap) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for (key, value) in headers {
        if let Some(stripped) = key.to_ascii_lowercase().strip_prefix("x-amz-meta-") {
            metadata.insert(stripped.to_owned(), value.to_owned());
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_mode_round_trip() {
        assert_eq!(RetentionMode::parse("GOVERNANCE").unwrap(), RetentionMode::Governance);
        assert_eq!(RetentionMode::Compliance.as_str(), "COMPLIANCE");
        assert!(RetentionMode::parse("OTHER").is_err());
    }

    #[test]
    fn tags_document() {
        let mut tags = BTreeMap::new();
        tags.insert("b".to_owned(), "2".to_owned());
        tags.insert("a".to_owned(), "1".to_owned());
        assert_eq!(
            tags_to_xml(&tags),
            "<Tagging><TagSet>\
             <Tag><Key>a</Key><Value>1</Value></Tag>\
             <Tag><Key>b</Key><Value>2</Value></Tag>\
             </TagSet></Tagging>"
        );
        assert_eq!(tags_to_xml(&BTreeMap::new()), "<Tagging></Tagging>");
    }

    #[test]
    fn sse_config_document() {
        assert_eq!(
            SseConfig::s3().to_xml(),
            "<ServerSideEncryptionConfiguration><Rule><ApplyServerSideEncryptionByDefault>\
             <SSEAlgorithm>AES256</SSEAlgorithm>\
             </ApplyServerSideEncryptionByDefault></Rule></ServerSideEncryptionConfiguration>"
        );
        assert!(SseConfig::kms("key-1").to_xml().contains("<KMSMasterKeyID>key-1</KMSMasterKeyID>"));
    }

    #[test]
    fn object_lock_document() {
        let config = ObjectLockConfig {
            retention_mode: Some(RetentionMode::Governance),
            retention_days: Some(30),
            retention_years: None,
        };
        assert_eq!(
            config.to_xml(),
            "<ObjectLockConfiguration><ObjectLockEnabled>Enabled</ObjectLockEnabled>\
             <Rule><DefaultRetention><Mode>GOVERNANCE</Mode><Days>30</Days></DefaultRetention></Rule>\
             </ObjectLockConfiguration>"
        );
    }

    #[test]
    fn notification_config_document() {
        let config = NotificationConfig {
            queue_configs: vec![NotificationDestination {
                id: "1".to_owned(),
                arn: "arn:minio:sqs::primary:webhook".to_owned(),
                events: vec!["s3:ObjectCreated:*".to_owned()],
                prefix_filter: "images/".to_owned(),
                suffix_filter: ".jpg".to_owned(),
            }],
            ..NotificationConfig::default()
        };
        let xml = config.to_xml();
        assert!(xml.starts_with("<NotificationConfiguration><QueueConfiguration>"));
        assert!(xml.contains("<Queue>arn:minio:sqs::primary:webhook</Queue>"));
        assert!(xml.contains("<FilterRule><Name>prefix</Name><Value>images/</Value></FilterRule>"));
        assert_eq!(NotificationConfig::default().to_xml(), "<NotificationConfiguration></NotificationConfiguration>");
    }

    #[test]
    fn notification_record_json() {
        let json = r#"{
            "eventVersion": "2.0",
            "eventSource": "minio:s3",
            "awsRegion": "",
            "eventTime": "2024-05-01T00:00:00.000Z",
            "eventName": "s3:ObjectCreated:Put",
            "userIdentity": {"principalId": "minio"},
            "s3": {
                "bucket": {"name": "photos", "arn": "arn:aws:s3:::photos"},
                "object": {"key": "cat.jpg", "size": 1234, "eTag": "abc"}
            }
        }"#;
        let record: NotificationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.event_name, "s3:ObjectCreated:Put");
        assert_eq!(record.s3.bucket.name, "photos");
        assert_eq!(record.s3.object.size, 1234);
    }

    #[test]
    fn user_metadata_extraction() {
        let mut headers = Multimap::new();
        headers.add("X-Amz-Meta-Project", "s3c");
        headers.add("Content-Type", "text/plain");
        let metadata = user_metadata_of(&headers);
        assert_eq!(metadata.get("project").map(String::as_str), Some("s3c"));
        assert_eq!(metadata.len(), 1);
    }
}

//! Hashing, encoding, name validation and part-size arithmetic.

use hmac::KeyInit as _;
use hmac::Mac as _;
use numeric_cast::TruncatingCast as _;

use crate::error::{Error, Result};

pub const MAX_MULTIPART_COUNT: u64 = 10_000;
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024; // 5MiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024; // 5GiB
pub const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024 * 1024; // 5TiB

/// Hex-encoded SHA-256.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::Digest as _;
    let digest = sha2::Sha256::digest(data);
    hex_simd::encode_to_string(digest, hex_simd::AsciiCase::Lower)
}

/// Raw HMAC-SHA256.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Base64-encoded MD5, the `Content-MD5` header value.
#[must_use]
pub fn md5sum_base64(data: &[u8]) -> String {
    use md5::Digest as _;
    let digest = md5::Md5::digest(data);
    base64_simd::STANDARD.encode_to_string(digest)
}

#[must_use]
pub fn base64_encode(data: &[u8]) -> String {
    base64_simd::STANDARD.encode_to_string(data)
}

/// CRC32 (IEEE), as used by the S3 event-stream framing.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut digest = crc_fast::Digest::new(crc_fast::CrcAlgorithm::Crc32IsoHdlc);
    digest.update(data);
    digest.finalize().truncating_cast::<u32>()
}

/// Big-endian u32 from the first four bytes.
#[must_use]
pub fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn is_ipv4_octet(part: &str) -> bool {
    if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if part.len() > 1 && part.starts_with('0') {
        return false;
    }
    part.parse::<u16>().is_ok_and(|v| v <= 255)
}

fn is_ipv4_address(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| is_ipv4_octet(p))
}

fn matches_strict_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    let edge = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let inner = |b: u8| edge(b) || b == b'.' || b == b'-';
    edge(bytes[0]) && edge(bytes[bytes.len() - 1]) && bytes[1..bytes.len() - 1].iter().all(|&b| inner(b))
}

fn matches_loose_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    let edge = |b: u8| b.is_ascii_alphanumeric();
    let inner = |b: u8| edge(b) || b == b'.' || b == b'-' || b == b'_' || b == b':';
    edge(bytes[0]) && edge(bytes[bytes.len() - 1]) && bytes[1..bytes.len() - 1].iter().all(|&b| inner(b))
}

/// Validates a bucket name. Strict mode applies the S3 naming rules used by
/// bucket creation; loose mode additionally accepts legacy names with
/// underscores, colons and uppercase letters.
///
/// # Errors
/// Returns a validation error describing the first violated rule
pub fn check_bucket_name(bucket_name: &str, strict: bool) -> Result<()> {
    let name = bucket_name.trim();
    if name.is_empty() {
        return Err(Error::invalid_arg("bucket name cannot be empty"));
    }
    if name.len() < 3 {
        return Err(Error::invalid_arg("bucket name cannot be less than 3 characters"));
    }
    if name.len() > 63 {
        return Err(Error::invalid_arg("bucket name cannot be greater than 63 characters"));
    }
    if is_ipv4_address(name) {
        return Err(Error::invalid_arg("bucket name cannot be an IP address"));
    }
    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return Err(Error::invalid_arg(
            "bucket name contains invalid successive characters '..', '.-' or '-.'",
        ));
    }
    if strict {
        if !matches_strict_name(name) {
            return Err(Error::invalid_arg("bucket name does not follow S3 standards strictly"));
        }
    } else if !matches_loose_name(name) {
        return Err(Error::invalid_arg("bucket name does not follow S3 standards"));
    }
    Ok(())
}

/// Rejects empty or whitespace-padded strings.
#[must_use]
pub fn is_valid_non_empty_string(s: &str) -> bool {
    !s.is_empty() && s.trim() == s
}

/// Percent-encodes a path segment-by-segment, normalizing repeated slashes.
/// A leading `/` is preserved; a trailing `/` is preserved unless the result
/// is just `/`.
#[must_use]
pub fn encode_path(path: &str) -> String {
    let mut out = String::new();
    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&urlencoding::encode(segment));
    }

    if path.starts_with('/') {
        out.insert(0, '/');
    }
    if path.ends_with('/') && out != "/" {
        out.push('/');
    }
    out
}

/// Part sizing for a (possibly unknown-length) upload.
///
/// `part_count == -1` means the total size is unknown and parts are
/// discovered by look-ahead while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartInfo {
    pub part_size: u64,
    pub part_count: i64,
}

/// Derives `(part_size, part_count)` from the object size and a caller
/// supplied part size (0 meaning "choose for me").
///
/// # Errors
/// Returns a validation error when the inputs violate the S3 multipart
/// limits (5MiB..5GiB parts, 10000 parts, 5TiB objects)
pub fn calc_part_info(object_size: Option<u64>, part_size: u64) -> Result<PartInfo> {
    if part_size > 0 {
        if part_size < MIN_PART_SIZE {
            return Err(Error::invalid_arg(format!(
                "part size {part_size} is not supported; minimum allowed 5MiB"
            )));
        }
        if part_size > MAX_PART_SIZE {
            return Err(Error::invalid_arg(format!(
                "part size {part_size} is not supported; maximum allowed 5GiB"
            )));
        }
    }

    let Some(object_size) = object_size else {
        if part_size == 0 {
            return Err(Error::invalid_arg(
                "valid part size must be provided when object size is unknown",
            ));
        }
        return Ok(PartInfo { part_size, part_count: -1 });
    };

    if object_size > MAX_OBJECT_SIZE {
        return Err(Error::invalid_arg(format!(
            "object size {object_size} is not supported; maximum allowed 5TiB"
        )));
    }

    let mut part_size = part_size;
    if part_size == 0 {
        let psize = object_size.div_ceil(MAX_MULTIPART_COUNT);
        part_size = psize.div_ceil(MIN_PART_SIZE) * MIN_PART_SIZE;
    }
    if part_size > object_size {
        part_size = object_size;
    }

    let part_count = if part_size > 0 { object_size.div_ceil(part_size) } else { 1 };
    if part_count > MAX_MULTIPART_COUNT {
        return Err(Error::invalid_arg(format!(
            "object size {object_size} and part size {part_size} make more than {MAX_MULTIPART_COUNT} parts for upload"
        )));
    }

    Ok(PartInfo {
        part_size,
        part_count: i64::try_from(part_count).unwrap_or(i64::MAX),
    })
}

/// Home directory for config-file credential providers.
#[must_use]
pub fn home_dir() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(std::path::PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_answer() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn hmac_known_answer() {
        let out = hmac_sha256(b"key", b"message");
        assert_eq!(
            hex_simd::encode_to_string(out, hex_simd::AsciiCase::Lower),
            "6e9ef29b75fffc5b7abae527d58fdadb2fe42e7219011976917343065f58ed4a"
        );
    }

    #[test]
    fn md5_base64() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(md5sum_base64(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn crc32_ieee() {
        // IEEE CRC32 of "123456789"
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn bucket_names_strict() {
        assert!(check_bucket_name("abc", true).is_ok());
        assert!(check_bucket_name("my-bucket.1", true).is_ok());

        assert!(check_bucket_name("", true).is_err());
        assert!(check_bucket_name("ab", true).is_err());
        assert!(check_bucket_name(&"a".repeat(64), true).is_err());
        assert!(check_bucket_name("Abc", true).is_err());
        assert!(check_bucket_name("abc_def", true).is_err());
        assert!(check_bucket_name("-abc", true).is_err());
        assert!(check_bucket_name("abc-", true).is_err());
        assert!(check_bucket_name("a..b", true).is_err());
        assert!(check_bucket_name("a.-b", true).is_err());
        assert!(check_bucket_name("a-.b", true).is_err());
        assert!(check_bucket_name("192.168.11.158", true).is_err());
    }

    #[test]
    fn bucket_names_loose() {
        assert!(check_bucket_name("abc_def", false).is_ok());
        assert!(check_bucket_name("Abc", false).is_ok());
        assert!(check_bucket_name("a:b", false).is_ok());
        assert!(check_bucket_name("255.255.255.255", false).is_err());
        // leading zero octets are not an IPv4 literal
        assert!(check_bucket_name("01.02.03.04", false).is_ok());
    }

    #[test]
    fn path_encoding() {
        assert_eq!(encode_path("a/b c/d"), "a/b%20c/d");
        assert_eq!(encode_path("/a//b/"), "/a/b/");
        assert_eq!(encode_path("/"), "/");
        assert_eq!(encode_path("key~1.txt"), "key~1.txt");
        assert_eq!(encode_path("a+b=c"), "a%2Bb%3Dc");
    }

    #[test]
    fn part_info_explicit_size() {
        let info = calc_part_info(Some(64 * 1024 * 1024 + 1), 32 * 1024 * 1024).unwrap();
        assert_eq!(info.part_size, 32 * 1024 * 1024);
        assert_eq!(info.part_count, 3);
    }

    #[test]
    fn part_info_derived_size() {
        // Small objects collapse to one part of the full size.
        let info = calc_part_info(Some(1024), 0).unwrap();
        assert_eq!(info.part_size, 1024);
        assert_eq!(info.part_count, 1);

        let info = calc_part_info(Some(0), 0).unwrap();
        assert_eq!(info.part_size, 0);
        assert_eq!(info.part_count, 1);

        // Huge objects pick a multiple of 5MiB that stays under 10000 parts.
        let info = calc_part_info(Some(MAX_OBJECT_SIZE), 0).unwrap();
        assert_eq!(info.part_size % MIN_PART_SIZE, 0);
        assert!(info.part_count <= 10_000);
    }

    #[test]
    fn part_info_bounds() {
        assert!(calc_part_info(Some(10), MIN_PART_SIZE - 1).is_err());
        assert!(calc_part_info(Some(10), MAX_PART_SIZE + 1).is_err());
        assert!(calc_part_info(Some(MAX_OBJECT_SIZE + 1), 0).is_err());
        assert!(calc_part_info(None, 0).is_err());
        assert!(calc_part_info(Some(MAX_OBJECT_SIZE), MIN_PART_SIZE).is_err());

        let info = calc_part_info(None, MIN_PART_SIZE).unwrap();
        assert_eq!(info.part_count, -1);
    }

    #[test]
    fn part_info_invariant_holds() {
        for (object_size, part_size) in [(1u64, 0u64), (MIN_PART_SIZE, 0), (MIN_PART_SIZE + 1, 0), (100 << 20, 6 << 20)] {
            let info = calc_part_info(Some(object_size), part_size).unwrap();
            let count = u64::try_from(info.part_count).unwrap();
            assert!(count * info.part_size >= object_size);
            assert!((count - 1) * info.part_size < object_size);
        }
    }
}

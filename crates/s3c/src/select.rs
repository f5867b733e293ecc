//! SelectObjectContent: request document and event-stream decoding.
//!
//! The response body is a framed binary stream:
//!
//! ```text
//! [ prelude(8) ][ prelude_crc(4) ][ headers+payload ][ message_crc(4) ]
//! ```
//!
//! Prelude is `total_length(4be) || headers_length(4be)`. Both CRCs are
//! IEEE CRC32. Headers are a TLV sequence of string values (type 7).

use bytes::{Bytes, BytesMut};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::utils::{be_u32, crc32};
use crate::xml::XmlWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileHeaderInfo {
    Use,
    Ignore,
    None,
}

impl FileHeaderInfo {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Use => "USE",
            Self::Ignore => "IGNORE",
            Self::None => "NONE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteFields {
    Always,
    AsNeeded,
}

impl QuoteFields {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "ALWAYS",
            Self::AsNeeded => "ASNEEDED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
    Bzip2,
}

impl CompressionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Gzip => "GZIP",
            Self::Bzip2 => "BZIP2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Document,
    Lines,
}

impl JsonType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT",
            Self::Lines => "LINES",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvInputSerialization {
    pub compression_type: Option<CompressionType>,
    pub allow_quoted_record_delimiter: bool,
    pub comments: Option<char>,
    pub field_delimiter: Option<char>,
    pub file_header_info: Option<FileHeaderInfo>,
    pub quote_character: Option<char>,
    pub record_delimiter: Option<char>,
}

#[derive(Debug, Clone, Default)]
pub struct JsonInputSerialization {
    pub compression_type: Option<CompressionType>,
    pub json_type: Option<JsonType>,
}

#[derive(Debug, Clone, Default)]
pub struct CsvOutputSerialization {
    pub field_delimiter: Option<char>,
    pub quote_character: Option<char>,
    pub quote_escape_character: Option<char>,
    pub quote_fields: Option<QuoteFields>,
    pub record_delimiter: Option<char>,
}

#[derive(Debug, Clone, Default)]
pub struct JsonOutputSerialization {
    pub record_delimiter: Option<char>,
}

/// A `SelectObjectContentRequest` document.
#[derive(Debug, Clone, Default)]
pub struct SelectRequest {
    pub expression: String,
    pub csv_input: Option<CsvInputSerialization>,
    pub json_input: Option<JsonInputSerialization>,
    pub parquet_input: bool,
    pub csv_output: Option<CsvOutputSerialization>,
    pub json_output: Option<JsonOutputSerialization>,
    pub request_progress: bool,
    pub scan_start_range: Option<u64>,
    pub scan_end_range: Option<u64>,
}

fn leaf_char(w: &mut XmlWriter, name: &str, value: Option<char>) {
    if let Some(value) = value {
        w.leaf(name, &value.to_string());
    }
}

impl SelectRequest {
    #[must_use]
    pub fn new_csv(expression: impl Into<String>, input: CsvInputSerialization, output: CsvOutputSerialization) -> Self {
        Self {
            expression: expression.into(),
            csv_input: Some(input),
            csv_output: Some(output),
            ..Self::default()
        }
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.start("SelectObjectContentRequest");
        w.leaf("Expression", &self.expression);
        w.leaf("ExpressionType", "SQL");

        w.start("InputSerialization");
        if let Some(csv) = &self.csv_input {
            if let Some(compression) = csv.compression_type {
                w.leaf("CompressionType", compression.as_str());
            }
            w.start("CSV");
            if csv.allow_quoted_record_delimiter {
                w.leaf("AllowQuotedRecordDelimiter", "true");
            }
            leaf_char(&mut w, "Comments", csv.comments);
            leaf_char(&mut w, "FieldDelimiter", csv.field_delimiter);
            if let Some(info) = csv.file_header_info {
                w.leaf("FileHeaderInfo", info.as_str());
            }
            leaf_char(&mut w, "QuoteCharacter", csv.quote_character);
            leaf_char(&mut w, "RecordDelimiter", csv.record_delimiter);
            w.end("CSV");
        }
        if let Some(json) = &self.json_input {
            if let Some(compression) = json.compression_type {
                w.leaf("CompressionType", compression.as_str());
            }
            w.start("JSON");
            if let Some(json_type) = json.json_type {
                w.leaf("Type", json_type.as_str());
            }
            w.end("JSON");
        }
        if self.parquet_input {
            w.start("Parquet").end("Parquet");
        }
        w.end("InputSerialization");

        w.start("OutputSerialization");
        if let Some(csv) = &self.csv_output {
            w.start("CSV");
            leaf_char(&mut w, "FieldDelimiter", csv.field_delimiter);
            leaf_char(&mut w, "QuoteCharacter", csv.quote_character);
            leaf_char(&mut w, "QuoteEscapeCharacter", csv.quote_escape_character);
            if let Some(quote_fields) = csv.quote_fields {
                w.leaf("QuoteFields", quote_fields.as_str());
            }
            leaf_char(&mut w, "RecordDelimiter", csv.record_delimiter);
            w.end("CSV");
        }
        if let Some(json) = &self.json_output {
            w.start("JSON");
            leaf_char(&mut w, "RecordDelimiter", json.record_delimiter);
            w.end("JSON");
        }
        w.end("OutputSerialization");

        if self.request_progress {
            w.start("RequestProgress").leaf("Enabled", "true").end("RequestProgress");
        }
        if self.scan_start_range.is_some() || self.scan_end_range.is_some() {
            w.start("ScanRange");
            if let Some(start) = self.scan_start_range {
                w.leaf("Start", &start.to_string());
            }
            if let Some(end) = self.scan_end_range {
                w.leaf("End", &end.to_string());
            }
            w.end("ScanRange");
        }

        w.end("SelectObjectContentRequest");
        w.finish()
    }
}

/// Byte counters carried by `Progress` and `Stats` events; `-1` when the
/// server did not report a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectProgress {
    pub bytes_scanned: i64,
    pub bytes_processed: i64,
    pub bytes_returned: i64,
}

/// A decoded event delivered to the result callback.
#[derive(Debug, Clone)]
pub enum SelectEvent {
    Records(Bytes),
    Progress(SelectProgress),
    Stats(SelectProgress),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct XmlSelectMetrics {
    bytes_scanned: Option<i64>,
    bytes_processed: Option<i64>,
    bytes_returned: Option<i64>,
}

enum Step {
    NeedMore,
    Continue,
    Stop,
}

/// Incremental event-stream decoder feeding a result callback.
pub(crate) struct SelectHandler<'a> {
    buffer: BytesMut,
    done: bool,
    outcome: Option<Result<()>>,
    callback: &'a mut (dyn FnMut(SelectEvent) -> bool + Send),
}

impl<'a> SelectHandler<'a> {
    pub fn new(callback: &'a mut (dyn FnMut(SelectEvent) -> bool + Send)) -> Self {
        Self {
            buffer: BytesMut::new(),
            done: false,
            outcome: None,
            callback,
        }
    }

    fn fail(&mut self, err: Error) -> Step {
        self.outcome = Some(Err(err));
        Step::Stop
    }

    fn decode_headers(data: &[u8]) -> Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let name_len = rest[0] as usize;
            rest = &rest[1..];
            if name_len == 0 {
                break;
            }
            if rest.len() < name_len + 3 {
                return Err(Error::invalid_response("truncated event-stream header"));
            }
            let name = String::from_utf8_lossy(&rest[..name_len]).into_owned();
            rest = &rest[name_len..];

            if rest[0] != 7 {
                return Err(Error::invalid_response("header value type is not 7"));
            }
            let value_len = usize::from(u16::from_be_bytes([rest[1], rest[2]]));
            rest = &rest[3..];
            if rest.len() < value_len {
                return Err(Error::invalid_response("truncated event-stream header value"));
            }
            let value = String::from_utf8_lossy(&rest[..value_len]).into_owned();
            rest = &rest[value_len..];

            headers.push((name, value));
        }
        Ok(headers)
    }

    fn parse_metrics(payload: &[u8]) -> Result<SelectProgress> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| Error::invalid_response("progress payload is not UTF-8"))?;
        let parsed: XmlSelectMetrics = quick_xml::de::from_str(text)?;
        Ok(SelectProgress {
            bytes_scanned: parsed.bytes_scanned.unwrap_or(-1),
            bytes_processed: parsed.bytes_processed.unwrap_or(-1),
            bytes_returned: parsed.bytes_returned.unwrap_or(-1),
        })
    }

    fn process_one(&mut self) -> Step {
        if self.buffer.len() < 12 {
            return Step::NeedMore;
        }

        let total_length = be_u32(&self.buffer[0..4]) as usize;
        let header_length = be_u32(&self.buffer[4..8]) as usize;
        if total_length < 16 || header_length > total_length - 16 {
            return self.fail(Error::invalid_response(format!(
                "invalid event-stream prelude; total: {total_length}, headers: {header_length}"
            )));
        }

        let expected = be_u32(&self.buffer[8..12]);
        let got = crc32(&self.buffer[0..8]);
        if got != expected {
            return self.fail(Error::ChecksumMismatch(format!(
                "prelude CRC mismatch; expected: {expected}, got: {got}"
            )));
        }

        if self.buffer.len() < total_length {
            return Step::NeedMore;
        }

        let message = self.buffer.split_to(total_length);
        let data = &message[12..total_length - 4];

        let expected = be_u32(&message[total_length - 4..]);
        let got = crc32(&message[..total_length - 4]);
        if got != expected {
            return self.fail(Error::ChecksumMismatch(format!(
                "message CRC mismatch; expected: {expected}, got: {got}"
            )));
        }

        let headers = match Self::decode_headers(&data[..header_length]) {
            Ok(headers) => headers,
            Err(err) => return self.fail(err),
        };
        let header = |name: &str| headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str());

        if header(":message-type") == Some("error") {
            let code = header(":error-code").unwrap_or_default();
            let message = header(":error-message").unwrap_or_default();
            return self.fail(Error::invalid_response(format!("{code}: {message}")));
        }

        let event_type = header(":event-type").unwrap_or_default().to_owned();
        if event_type == "End" {
            self.outcome = Some(Ok(()));
            return Step::Stop;
        }

        let payload = &data[header_length..];
        if event_type == "Cont" || payload.is_empty() {
            return Step::Continue;
        }

        let event = match event_type.as_str() {
            "Records" => SelectEvent::Records(Bytes::copy_from_slice(payload)),
            "Progress" => match Self::parse_metrics(payload) {
                Ok(metrics) => SelectEvent::Progress(metrics),
                Err(err) => return self.fail(err),
            },
            "Stats" => match Self::parse_metrics(payload) {
                Ok(metrics) => SelectEvent::Stats(metrics),
                Err(err) => return self.fail(err),
            },
            other => {
                let err = Error::invalid_response(format!("unknown event-type {other}"));
                return self.fail(err);
            }
        };

        if (self.callback)(event) { Step::Continue } else { Step::Stop }
    }

    /// Feeds one chunk; returns `false` once decoding is finished and the
    /// transfer should stop.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        if self.done {
            return false;
        }
        self.buffer.extend_from_slice(chunk);
        loop {
            match self.process_one() {
                Step::NeedMore => return true,
                Step::Continue => {}
                Step::Stop => {
                    self.done = true;
                    return false;
                }
            }
        }
    }

    /// Final decoding outcome; a stream cancelled by the callback is not an
    /// error.
    pub fn finish(self) -> Result<()> {
        self.outcome.unwrap_or(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_headers(headers: &[(&str, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in headers {
            out.push(u8::try_from(name.len()).unwrap());
            out.extend_from_slice(name.as_bytes());
            out.push(7);
            out.extend_from_slice(&u16::try_from(value.len()).unwrap().to_be_bytes());
            out.extend_from_slice(value.as_bytes());
        }
        out
    }

    fn encode_message(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
        let header_block = encode_headers(headers);
        let total = 16 + header_block.len() + payload.len();
        let mut out = Vec::new();
        out.extend_from_slice(&u32::try_from(total).unwrap().to_be_bytes());
        out.extend_from_slice(&u32::try_from(header_block.len()).unwrap().to_be_bytes());
        let prelude_crc = crc32(&out);
        out.extend_from_slice(&prelude_crc.to_be_bytes());
        out.extend_from_slice(&header_block);
        out.extend_from_slice(payload);
        let message_crc = crc32(&out);
        out.extend_from_slice(&message_crc.to_be_bytes());
        out
    }

    fn records_message(payload: &[u8]) -> Vec<u8> {
        encode_message(
            &[(":message-type", "event"), (":event-type", "Records")],
            payload,
        )
    }

    fn end_message() -> Vec<u8> {
        encode_message(&[(":message-type", "event"), (":event-type", "End")], b"")
    }

    #[test]
    fn request_xml_csv() {
        let request = SelectRequest::new_csv(
            "select * from S3Object",
            CsvInputSerialization {
                file_header_info: Some(FileHeaderInfo::Use),
                ..CsvInputSerialization::default()
            },
            CsvOutputSerialization {
                quote_fields: Some(QuoteFields::AsNeeded),
                ..CsvOutputSerialization::default()
            },
        );
        let xml = request.to_xml();
        assert!(xml.starts_with("<SelectObjectContentRequest><Expression>select * from S3Object</Expression>"));
        assert!(xml.contains("<ExpressionType>SQL</ExpressionType>"));
        assert!(xml.contains("<InputSerialization><CSV><FileHeaderInfo>USE</FileHeaderInfo></CSV></InputSerialization>"));
        assert!(xml.contains("<OutputSerialization><CSV><QuoteFields>ASNEEDED</QuoteFields></CSV></OutputSerialization>"));
    }

    #[test]
    fn decodes_records_then_end() {
        let mut stream = records_message(b"a,b\nc,d\n");
        stream.extend_from_slice(&end_message());

        let mut records = Vec::new();
        let mut callback = |event: SelectEvent| {
            if let SelectEvent::Records(data) = event {
                records.extend_from_slice(&data);
            }
            true
        };
        let mut handler = SelectHandler::new(&mut callback);
        assert!(!handler.feed(&stream));
        handler.finish().unwrap();
        assert_eq!(records, b"a,b\nc,d\n");
    }

    #[test]
    fn decodes_across_chunk_boundaries() {
        let mut stream = records_message(b"hello");
        stream.extend_from_slice(&end_message());

        let mut records = Vec::new();
        let mut callback = |event: SelectEvent| {
            if let SelectEvent::Records(data) = event {
                records.extend_from_slice(&data);
            }
            true
        };
        let mut handler = SelectHandler::new(&mut callback);
        for chunk in stream.chunks(3) {
            if !handler.feed(chunk) {
                break;
            }
        }
        handler.finish().unwrap();
        assert_eq!(records, b"hello");
    }

    #[test]
    fn garbage_after_end_is_ignored() {
        let mut stream = records_message(b"row");
        stream.extend_from_slice(&end_message());
        stream.extend_from_slice(b"\xde\xad\xbe\xef trailing garbage");

        let mut records = Vec::new();
        let mut callback = |event: SelectEvent| {
            if let SelectEvent::Records(data) = event {
                records.extend_from_slice(&data);
            }
            true
        };
        let mut handler = SelectHandler::new(&mut callback);
        assert!(!handler.feed(&stream));
        handler.finish().unwrap();
        assert_eq!(records, b"row");
    }

    #[test]
    fn prelude_crc_mismatch_is_an_error() {
        let mut stream = records_message(b"data");
        stream[8] ^= 0xff;

        let mut callback = |_: SelectEvent| true;
        let mut handler = SelectHandler::new(&mut callback);
        assert!(!handler.feed(&stream));
        let err = handler.finish().unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch(_)));
    }

    #[test]
    fn message_crc_mismatch_is_an_error() {
        let mut stream = records_message(b"data");
        let last = stream.len() - 1;
        stream[last] ^= 0xff;

        let mut callback = |_: SelectEvent| true;
        let mut handler = SelectHandler::new(&mut callback);
        assert!(!handler.feed(&stream));
        assert!(handler.finish().is_err());
    }

    #[test]
    fn server_error_event_is_surfaced() {
        let stream = encode_message(
            &[
                (":message-type", "error"),
                (":error-code", "InvalidQuery"),
                (":error-message", "syntax error"),
            ],
            b"",
        );
        let mut callback = |_: SelectEvent| true;
        let mut handler = SelectHandler::new(&mut callback);
        assert!(!handler.feed(&stream));
        let err = handler.finish().unwrap_err();
        assert!(err.to_string().contains("InvalidQuery: syntax error"));
    }

    #[test]
    fn progress_and_stats_events() {
        let payload = b"<Stats><BytesScanned>512</BytesScanned><BytesProcessed>512</BytesProcessed>\
                        <BytesReturned>128</BytesReturned></Stats>";
        let mut stream = encode_message(&[(":message-type", "event"), (":event-type", "Stats")], payload);
        stream.extend_from_slice(&end_message());

        let mut stats = None;
        let mut callback = |event: SelectEvent| {
            if let SelectEvent::Stats(metrics) = event {
                stats = Some(metrics);
            }
            true
        };
        let mut handler = SelectHandler::new(&mut callback);
        handler.feed(&stream);
        handler.finish().unwrap();
        assert_eq!(
            stats,
            Some(SelectProgress {
                bytes_scanned: 512,
                bytes_processed: 512,
                bytes_returned: 128
            })
        );
    }

    #[test]
    fn cont_event_is_skipped() {
        let mut stream = encode_message(&[(":message-type", "event"), (":event-type", "Cont")], b"");
        stream.extend_from_slice(&records_message(b"x"));
        stream.extend_from_slice(&end_message());

        let mut count = 0;
        let mut callback = |_: SelectEvent| {
            count += 1;
            true
        };
        let mut handler = SelectHandler::new(&mut callback);
        handler.feed(&stream);
        handler.finish().unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn callback_false_cancels_without_error() {
        let mut stream = records_message(b"one");
        stream.extend_from_slice(&records_message(b"two"));
        stream.extend_from_slice(&end_message());

        let mut count = 0;
        let mut callback = |_: SelectEvent| {
            count += 1;
            false
        };
        let mut handler = SelectHandler::new(&mut callback);
        assert!(!handler.feed(&stream));
        handler.finish().unwrap();
        assert_eq!(count, 1);
    }
}

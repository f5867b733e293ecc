//! Timestamp formats used by the S3 wire protocol.

use std::time::SystemTime;

use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::error::Result;

/// `YYYYMMDD`, the date part of a SigV4 scope.
const SIGNER_DATE: &[FormatItem<'_>] = format_description!("[year][month][day]");

/// `YYYYMMDDTHHMMSSZ`, the `x-amz-date` header value.
const AMZ_DATE: &[FormatItem<'_>] = format_description!("[year][month][day]T[hour][minute][second]Z");

/// See <https://github.com/time-rs/time/issues/498>
const RFC1123: &[FormatItem<'_>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

/// ISO-8601 with milliseconds and a literal trailing `Z`.
const ISO8601_MILLIS: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// A UTC instant with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcTime(OffsetDateTime);

impl UtcTime {
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn add_seconds(self, seconds: i64) -> Self {
        Self(self.0 + time::Duration::seconds(seconds))
    }

    /// `YYYYMMDD`
    ///
    /// # Errors
    /// Returns an error if the formatting fails
    pub fn to_signer_date(self) -> Result<String> {
        Ok(self.0.format(SIGNER_DATE)?)
    }

    /// `YYYYMMDDTHHMMSSZ`
    ///
    /// # Errors
    /// Returns an error if the formatting fails
    pub fn to_amz_date(self) -> Result<String> {
        Ok(self.0.format(AMZ_DATE)?)
    }

    /// `Day, DD Mon YYYY HH:MM:SS GMT`
    ///
    /// # Errors
    /// Returns an error if the formatting fails
    pub fn to_http_header_value(self) -> Result<String> {
        Ok(self.0.format(RFC1123)?)
    }

    /// ISO-8601 with milliseconds, e.g. `2022-03-04T05:06:07.890Z`
    ///
    /// # Errors
    /// Returns an error if the formatting fails
    pub fn to_iso8601_utc(self) -> Result<String> {
        Ok(self.0.format(ISO8601_MILLIS)?)
    }

    /// Parses an HTTP `Last-Modified`-style header value.
    ///
    /// # Errors
    /// Returns an error if the string is invalid
    pub fn from_http_header_value(s: &str) -> Result<Self> {
        let dt = time::PrimitiveDateTime::parse(s, RFC1123)?;
        Ok(Self(dt.assume_utc()))
    }

    /// Parses an ISO-8601 value with optional fractional seconds.
    ///
    /// # Errors
    /// Returns an error if the string is invalid
    pub fn from_iso8601_utc(s: &str) -> Result<Self> {
        use time::format_description::well_known::Rfc3339;
        let dt = OffsetDateTime::parse(s, &Rfc3339)?;
        Ok(Self(dt))
    }

    #[must_use]
    pub fn unix_timestamp(self) -> i64 {
        self.0.unix_timestamp()
    }
}

impl From<OffsetDateTime> for UtcTime {
    fn from(value: OffsetDateTime) -> Self {
        Self(value)
    }
}

impl From<UtcTime> for OffsetDateTime {
    fn from(value: UtcTime) -> Self {
        value.0
    }
}

impl From<SystemTime> for UtcTime {
    fn from(value: SystemTime) -> Self {
        Self(OffsetDateTime::from(value))
    }
}

impl serde::Serialize for UtcTime {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::Error;
        let s = self.to_iso8601_utc().map_err(S::Error::custom)?;
        serializer.serialize_str(&s)
    }
}

impl<'de> serde::Deserialize<'de> for UtcTime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        Self::from_iso8601_utc(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn signer_and_amz_dates() {
        let t = UtcTime::from(datetime!(2013-05-24 00:00:00 UTC));
        assert_eq!(t.to_signer_date().unwrap(), "20130524");
        assert_eq!(t.to_amz_date().unwrap(), "20130524T000000Z");
    }

    #[test]
    fn http_date_round_trip() {
        let cases = ["Tue, 29 Apr 2014 18:30:38 GMT", "Wed, 21 Oct 2015 07:28:00 GMT"];
        for expected in cases {
            let t = UtcTime::from_http_header_value(expected).unwrap();
            assert_eq!(t.to_http_header_value().unwrap(), expected);
        }
    }

    #[test]
    fn iso8601_millis() {
        let t = UtcTime::from(datetime!(1985-04-12 23:20:50.520 UTC));
        assert_eq!(t.to_iso8601_utc().unwrap(), "1985-04-12T23:20:50.520Z");

        let parsed = UtcTime::from_iso8601_utc("1985-04-12T23:20:50.520Z").unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn iso8601_without_fraction() {
        let parsed = UtcTime::from_iso8601_utc("2030-01-01T00:00:00Z").unwrap();
        assert_eq!(parsed.to_iso8601_utc().unwrap(), "2030-01-01T00:00:00.000Z");
    }

    #[test]
    fn add_seconds_moves_forward() {
        let t = UtcTime::from(datetime!(2020-01-01 00:00:00 UTC));
        assert_eq!(t.add_seconds(90).to_amz_date().unwrap(), "20200101T000130Z");
    }
}

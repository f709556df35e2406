//! # Domain Value Objects
//!
//! Requests and results exchanged with the shard table API.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use super::errors::ShardError;
use super::granularity::Granularity;

/// One shard table and the slice of the requested interval it answers for.
///
/// `end_inclusive` is only ever `true` on the last range of a split, and
/// only when the request asked for an inclusive end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "DateTime<Tz>: Serialize",
    deserialize = "DateTime<Tz>: Deserialize<'de>"
))]
pub struct TimeRange<Tz: TimeZone> {
    /// Physical table name.
    pub table_name: String,
    /// Range start (always inclusive).
    pub start: DateTime<Tz>,
    /// Range end.
    pub end: DateTime<Tz>,
    /// Whether `end` itself is part of the range.
    pub end_inclusive: bool,
}

impl<Tz: TimeZone> TimeRange<Tz> {
    /// Create a range.
    pub fn new(
        table_name: impl Into<String>,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        end_inclusive: bool,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            start,
            end,
            end_inclusive,
        }
    }

    /// Whether `t` lies inside this range.
    pub fn contains(&self, t: &DateTime<Tz>) -> bool {
        *t >= self.start && (*t < self.end || (self.end_inclusive && *t == self.end))
    }
}

/// Request to split a time interval across shard tables.
///
/// Fields are optional so a half-built request can be handed to
/// [`crate::split_range`], which reports the first missing field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardRequest<Tz: TimeZone> {
    /// Logical table name (the shard prefix), e.g. `driver_hour`.
    pub primary: String,
    /// Interval start.
    pub start: Option<DateTime<Tz>>,
    /// Interval end.
    pub end: Option<DateTime<Tz>>,
    /// Whether the end instant is included (`<= end`) or not (`< end`).
    pub end_inclusive: bool,
    /// Sharding granularity.
    pub granularity: Option<Granularity>,
}

impl<Tz: TimeZone> ShardRequest<Tz> {
    /// Start building a request.
    pub fn builder() -> ShardRequestBuilder<Tz> {
        ShardRequestBuilder::default()
    }

    /// Create a complete request.
    pub fn new(
        primary: impl Into<String>,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        end_inclusive: bool,
        granularity: Granularity,
    ) -> Self {
        Self {
            primary: primary.into(),
            start: Some(start),
            end: Some(end),
            end_inclusive,
            granularity: Some(granularity),
        }
    }
}

/// Builder for [`ShardRequest`].
#[derive(Clone, Debug)]
pub struct ShardRequestBuilder<Tz: TimeZone> {
    request: ShardRequest<Tz>,
}

impl<Tz: TimeZone> Default for ShardRequestBuilder<Tz> {
    fn default() -> Self {
        Self {
            request: ShardRequest {
                primary: String::new(),
                start: None,
                end: None,
                end_inclusive: false,
                granularity: None,
            },
        }
    }
}

impl<Tz: TimeZone> ShardRequestBuilder<Tz> {
    /// Set the logical table name.
    pub fn primary(mut self, primary: impl Into<String>) -> Self {
        self.request.primary = primary.into();
        self
    }

    /// Set the interval start.
    pub fn start(mut self, start: DateTime<Tz>) -> Self {
        self.request.start = Some(start);
        self
    }

    /// Set the interval end.
    pub fn end(mut self, end: DateTime<Tz>) -> Self {
        self.request.end = Some(end);
        self
    }

    /// Include or exclude the end instant.
    pub fn end_inclusive(mut self, inclusive: bool) -> Self {
        self.request.end_inclusive = inclusive;
        self
    }

    /// Set the granularity.
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.request.granularity = Some(granularity);
        self
    }

    /// Finish building. Validation happens when the request is split.
    pub fn build(self) -> ShardRequest<Tz> {
        self.request
    }
}

/// Granularity as it arrives on the wire: a name or a numeric code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GranularitySpec {
    /// Numeric code, e.g. `20`.
    Code(i64),
    /// Name, e.g. `"day"`.
    Name(String),
}

impl TryFrom<&GranularitySpec> for Granularity {
    type Error = ShardError;

    fn try_from(spec: &GranularitySpec) -> Result<Self, Self::Error> {
        match spec {
            GranularitySpec::Code(code) => Granularity::try_from(*code),
            GranularitySpec::Name(name) => name.parse(),
        }
    }
}

/// Serde form of a split request with RFC 3339 timestamps.
///
/// ```
/// use shard_tables::{RawShardRequest, ShardRequest};
///
/// let raw: RawShardRequest = serde_json::from_str(
///     r#"{"primary":"orders","start":"2024-01-15T10:30:00+08:00",
///         "end":"2024-01-16T00:00:00+08:00","granularity":"day"}"#,
/// ).unwrap();
/// let request = ShardRequest::try_from(raw).unwrap();
/// assert!(!request.end_inclusive);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawShardRequest {
    /// Logical table name.
    #[serde(default)]
    pub primary: String,
    /// Interval start.
    #[serde(default)]
    pub start: Option<DateTime<FixedOffset>>,
    /// Interval end.
    #[serde(default)]
    pub end: Option<DateTime<FixedOffset>>,
    /// Whether the end instant is included.
    #[serde(default)]
    pub end_inclusive: bool,
    /// Granularity name or code.
    #[serde(default)]
    pub granularity: Option<GranularitySpec>,
}

impl TryFrom<RawShardRequest> for ShardRequest<FixedOffset> {
    type Error = ShardError;

    fn try_from(raw: RawShardRequest) -> Result<Self, Self::Error> {
        let granularity = raw
            .granularity
            .as_ref()
            .map(Granularity::try_from)
            .transpose()?;
        Ok(Self {
            primary: raw.primary,
            start: raw.start,
            end: raw.end,
            end_inclusive: raw.end_inclusive,
            granularity,
        })
    }
}

/// Request to resolve, and create if needed, the shard table for an instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionRequest<Tz: TimeZone> {
    /// Schema (database) holding the template and shard tables.
    pub schema: String,
    /// Template table name, also the shard prefix.
    pub primary: String,
    /// Instant being written.
    pub instant: DateTime<Tz>,
    /// Sharding granularity.
    pub granularity: Granularity,
}

impl<Tz: TimeZone> ProvisionRequest<Tz> {
    /// Create a provisioning request.
    pub fn new(
        schema: impl Into<String>,
        primary: impl Into<String>,
        instant: DateTime<Tz>,
        granularity: Granularity,
    ) -> Self {
        Self {
            schema: schema.into(),
            primary: primary.into(),
            instant,
            granularity,
        }
    }

    /// Table name this request resolves to. Pure; no I/O.
    pub fn expected_table_name(&self) -> String {
        self.granularity.table_name(&self.primary, &self.instant)
    }
}

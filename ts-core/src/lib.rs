use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Layout of business-day strings written by the backend.
pub const BUSINESS_DAY_FORMAT: &str = "%Y-%m-%d";

/// Horizontal coordinate of a point, in whichever shape the backend wrote it.
///
/// The charting library accepts a UTC timestamp in seconds (any JSON number,
/// fractional included), a `"YYYY-MM-DD"` string or a `{year, month, day}`
/// object. The shape is kept as-is so it serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartTime {
    Timestamp(Number),
    BusinessDayString(String),
    BusinessDay { year: i32, month: u32, day: u32 },
}

impl ChartTime {
    /// Calendar date for business-day shapes; `None` for raw timestamps or
    /// strings/objects that don't name a real day.
    pub fn business_day(&self) -> Option<NaiveDate> {
        match self {
            ChartTime::Timestamp(_) => None,
            ChartTime::BusinessDayString(s) => {
                NaiveDate::parse_from_str(s, BUSINESS_DAY_FORMAT).ok()
            }
            ChartTime::BusinessDay { year, month, day } => {
                NaiveDate::from_ymd_opt(*year, *month, *day)
            }
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            ChartTime::Timestamp(_) => true,
            _ => self.business_day().is_some(),
        }
    }
}

impl fmt::Display for ChartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartTime::Timestamp(ts) => write!(f, "{ts}"),
            ChartTime::BusinessDayString(s) => write!(f, "{s:?}"),
            ChartTime::BusinessDay { year, month, day } => {
                write!(f, "{{year: {year}, month: {month}, day: {day}}}")
            }
        }
    }
}

impl From<i64> for ChartTime {
    fn from(ts: i64) -> Self {
        ChartTime::Timestamp(ts.into())
    }
}

/// One OHLC bucket as consumed by a candlestick series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: ChartTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Per-point overrides (`color`, `borderColor`, `wickColor`) go to the
    /// library untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SeriesPoint {
    pub fn new(time: impl Into<ChartTime>, ohlc: (f64, f64, f64, f64)) -> Self {
        Self {
            time: time.into(),
            open: ohlc.0,
            high: ohlc.1,
            low: ohlc.2,
            close: ohlc.3,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{attribute}: malformed series json: {source}")]
    Json {
        attribute: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{attribute}: point {index} has invalid time {time}")]
    InvalidTime {
        attribute: String,
        index: usize,
        time: ChartTime,
    },
}

impl ParseError {
    /// Name of the attribute whose payload failed to parse.
    pub fn attribute(&self) -> &str {
        match self {
            ParseError::Json { attribute, .. } | ParseError::InvalidTime { attribute, .. } => {
                attribute
            }
        }
    }
}

/// Parse a JSON-encoded series carried by `attribute`.
///
/// A missing or empty attribute yields an empty series. Anything else must be
/// a JSON array of points; order is preserved exactly.
pub fn parse_series(attribute: &str, raw: Option<&str>) -> Result<Vec<SeriesPoint>, ParseError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(Vec::new()),
    };
    let points: Vec<SeriesPoint> =
        serde_json::from_str(raw).map_err(|source| ParseError::Json {
            attribute: attribute.to_string(),
            source,
        })?;
    if let Some((index, point)) = points.iter().enumerate().find(|(_, p)| !p.time.is_valid()) {
        return Err(ParseError::InvalidTime {
            attribute: attribute.to_string(),
            index,
            time: point.time.clone(),
        });
    }
    Ok(points)
}

//! Decoding rules for variant-typed columns.
//!
//! These are the places where one stored shape can mean several things: a
//! start/end pair that may be an instant or an interval, a geometry column
//! that may hold `GeoJSON`, WKT, some other JSON, or free text, and the
//! observation result spread over several columns behind a discriminator.
//! Ambiguity degrades quietly (logged at `debug`/`trace`); only the result
//! discriminator and stored JSON can fail.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sensorwire_types::{
    Geometry, GeometryValue, Number, ResultKind, ResultValue, TimeInstant, TimeInterval,
    TimeValue,
};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::CodecError;
use crate::row::Row;
use crate::schema::result_columns;
use crate::wkt;

/// Media type marking a `GeoJSON` encoded geometry.
pub const GEOJSON_ENCODING: &str = "application/vnd.geo+json";

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Read a start/end pair as an instant or an interval.
///
/// A null end, or an end equal to the start, is an instant at the start
/// (the unset instant if the start is null too). Anything else goes
/// through [`interval`].
pub fn time_value(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<TimeValue> {
    if end.is_none() || end == start {
        return Some(TimeValue::Instant(TimeInstant(start)));
    }
    interval(start, end).map(TimeValue::Interval)
}

/// Read a start/end pair as an interval.
///
/// A null start is taken as the latest representable time and a null end
/// as the earliest, and only then is the order checked. An end before the
/// start yields `None`, so a pair with either side null never produces an
/// interval.
pub fn interval(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<TimeInterval> {
    let start = start.unwrap_or(DateTime::<Utc>::MAX_UTC);
    let end = end.unwrap_or(DateTime::<Utc>::MIN_UTC);
    if end < start {
        trace!(%start, %end, "interval end precedes start, dropping");
        return None;
    }
    Some(TimeInterval { start, end })
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Decode a geometry-bearing column.
///
/// Stages, first match wins:
/// 1. a `GeoJSON` geometry object or a WKT `POLYGON`, tried only when the
///    encoding is `GeoJSON` or not given;
/// 2. any JSON object;
/// 3. the raw text.
///
/// Empty or missing text yields `None`. No stage fails.
pub fn decode_geometry(encoding_type: Option<&str>, raw: Option<&str>) -> Option<GeometryValue> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;

    let geometry_encoded =
        encoding_type.is_none_or(|e| e.trim().eq_ignore_ascii_case(GEOJSON_ENCODING));
    if geometry_encoded {
        if let Some(geometry) = parse_geometry(raw) {
            return Some(GeometryValue::Geometry(geometry));
        }
        debug!(encoding = ?encoding_type, "not a simple geometry, trying plain JSON");
    }

    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(map) => Some(GeometryValue::Json(map)),
        Err(e) => {
            trace!(error = %e, "not a JSON object, keeping raw text");
            Some(GeometryValue::Text(raw.to_owned()))
        }
    }
}

fn parse_geometry(raw: &str) -> Option<Geometry> {
    serde_json::from_str::<Geometry>(raw)
        .ok()
        .or_else(|| wkt::parse_polygon(raw))
}

// ---------------------------------------------------------------------------
// Observation result
// ---------------------------------------------------------------------------

/// The raw observation result columns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultColumns<'a> {
    /// Floating point form.
    pub number: Option<f64>,
    /// String form.
    pub string: Option<&'a str>,
    /// Boolean form.
    pub boolean: Option<bool>,
    /// JSON form.
    pub json: Option<&'a str>,
}

impl<'a> ResultColumns<'a> {
    /// Read the discriminator and the columns it selects from `row`.
    ///
    /// Columns the discriminator does not select are never read, so stale
    /// or oddly typed values there cannot fail the row.
    pub fn read(row: &'a Row) -> Result<(Option<i64>, Self), CodecError> {
        let discriminator = row.integer(result_columns::TYPE)?;
        let mut columns = Self::default();
        match discriminator.and_then(ResultKind::from_discriminator) {
            Some(ResultKind::Number) => {
                columns.string = row.text(result_columns::STRING)?;
                columns.number = row.float(result_columns::NUMBER)?;
            }
            Some(ResultKind::Boolean) => columns.boolean = row.boolean(result_columns::BOOLEAN)?,
            Some(ResultKind::ObjectArray) => columns.json = row.text(result_columns::JSON)?,
            Some(ResultKind::String) => columns.string = row.text(result_columns::STRING)?,
            None => {}
        }
        Ok((discriminator, columns))
    }
}

/// Decode an observation result.
///
/// The discriminator alone selects the column; nothing is inferred from
/// content. A null discriminator means no result. Numbers prefer an exact
/// decimal read of the string column and fall back to the floating point
/// column only when that fails.
pub fn decode_result(
    discriminator: Option<i64>,
    columns: &ResultColumns<'_>,
) -> Result<Option<ResultValue>, CodecError> {
    let Some(value) = discriminator else {
        return Ok(None);
    };
    let kind =
        ResultKind::from_discriminator(value).ok_or(CodecError::UnknownResultType { value })?;

    let result = match kind {
        ResultKind::Boolean => columns.boolean.map(ResultValue::Boolean),
        ResultKind::Number => decode_number(columns).map(ResultValue::Number),
        ResultKind::ObjectArray => match columns.json {
            Some(text) => Some(ResultValue::ObjectArray(
                serde_json::from_str(text).map_err(|source| CodecError::CorruptJson {
                    column: result_columns::JSON.to_owned(),
                    source,
                })?,
            )),
            None => None,
        },
        ResultKind::String => columns.string.map(|s| ResultValue::String(s.to_owned())),
    };
    Ok(result)
}

fn decode_number(columns: &ResultColumns<'_>) -> Option<Number> {
    if let Some(text) = columns.string {
        let text = text.trim();
        match Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
            Ok(d) => return Some(Number::Exact(d)),
            Err(e) => {
                debug!(
                    value = text,
                    error = %e,
                    "result string is not a decimal, using float column"
                );
            }
        }
    }
    columns.number.map(Number::Approximate)
}

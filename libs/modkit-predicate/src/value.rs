//! Conversion of raw JSON predicate arguments into bound query values.
//!
//! Arguments arrive as `serde_json::Value` (the shape of a search request).
//! Everything a user supplies ends up as a `sea_orm::Value` bound parameter.
//! Shape problems (a scalar where a pair is required) are reported as
//! [`Expected`]; type mismatches the database would reject are left to the
//! data layer.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::prelude::Uuid;
use sea_orm::{ColumnType, Value};
use serde_json::Value as Json;

use crate::family::TypeFamily;

/// Description of the argument shape a predicate expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected(pub &'static str);

pub type ArgResult<T> = Result<T, Expected>;

/// Convert a scalar JSON value into a bound value for a field of `family`.
pub fn scalar(arg: &Json, family: TypeFamily, storage: &ColumnType) -> ArgResult<Value> {
    match arg {
        Json::Bool(b) => Ok((*b).into()),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into())
            } else if let Some(u) = n.as_u64() {
                Ok(u.into())
            } else {
                n.as_f64().map(Into::into).ok_or(Expected("a finite number"))
            }
        }
        Json::String(s) if family == TypeFamily::Temporal => Ok(temporal_from_str(s, storage)),
        Json::String(s) if *storage == ColumnType::Uuid => {
            Ok(Uuid::parse_str(s.trim()).map_or_else(|_| s.clone().into(), Into::into))
        }
        Json::String(s) => Ok(s.clone().into()),
        Json::Null | Json::Array(_) | Json::Object(_) => Err(Expected("a scalar value")),
    }
}

/// A list of scalars (`in`, `overlaps`, ...).
pub fn list(arg: &Json, family: TypeFamily, storage: &ColumnType) -> ArgResult<Vec<Value>> {
    let Json::Array(items) = arg else {
        return Err(Expected("an array of scalar values"));
    };
    items
        .iter()
        .map(|v| scalar(v, family, storage).map_err(|_| Expected("an array of scalar values")))
        .collect()
}

/// A two-element `[low, high]` array.
pub fn pair(arg: &Json, family: TypeFamily, storage: &ColumnType) -> ArgResult<(Value, Value)> {
    const SHAPE: Expected = Expected("a two-element array [low, high]");
    let Json::Array(items) = arg else {
        return Err(SHAPE);
    };
    match items.as_slice() {
        [low, high] => Ok((
            scalar(low, family, storage).map_err(|_| SHAPE)?,
            scalar(high, family, storage).map_err(|_| SHAPE)?,
        )),
        _ => Err(SHAPE),
    }
}

/// Optional boolean flag of presence-style predicates; absent or null is `true`.
pub fn flag(arg: &Json) -> ArgResult<bool> {
    match arg {
        Json::Null => Ok(true),
        Json::Bool(b) => Ok(*b),
        _ => Err(Expected("an optional boolean flag")),
    }
}

pub fn integer(arg: &Json) -> ArgResult<i64> {
    match arg {
        Json::Number(n) => n.as_i64().ok_or(Expected("an integer")),
        Json::String(s) => s.trim().parse().map_err(|_| Expected("an integer")),
        _ => Err(Expected("an integer")),
    }
}

/// Duration as integer seconds or a humantime string such as `"7d"`.
pub fn duration(arg: &Json) -> ArgResult<Duration> {
    const SHAPE: Expected = Expected("a duration in seconds or a string like \"7d\"");
    match arg {
        Json::Number(n) => n.as_u64().map(Duration::from_secs).ok_or(SHAPE),
        Json::String(s) => humantime::parse_duration(s.trim()).map_err(|_| SHAPE),
        _ => Err(SHAPE),
    }
}

pub fn text(arg: &Json) -> ArgResult<&str> {
    arg.as_str().ok_or(Expected("a string"))
}

pub fn text_list(arg: &Json) -> ArgResult<Vec<&str>> {
    const SHAPE: Expected = Expected("an array of strings");
    let Json::Array(items) = arg else {
        return Err(SHAPE);
    };
    items.iter().map(|v| v.as_str().ok_or(SHAPE)).collect()
}

/// Bind an instant computed by the layer itself (calendar windows, `within`)
/// in the column's own storage representation.
pub fn instant(at: DateTime<Utc>, storage: &ColumnType) -> Value {
    match storage {
        ColumnType::Date => at.date_naive().into(),
        ColumnType::DateTime | ColumnType::Timestamp => at.naive_utc().into(),
        _ => at.into(),
    }
}

/// Parse a temporal string into the column's storage representation.
///
/// Strings that do not parse are bound verbatim; the database decides.
fn temporal_from_str(s: &str, storage: &ColumnType) -> Value {
    let s = s.trim();
    let Some(at) = parse_instant(s) else {
        return s.to_owned().into();
    };
    instant(at, storage)
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

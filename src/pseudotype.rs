//! Conversion of tagged wire objects (`{"$reql_type$": ...}`) into native
//! values.

use std::collections::BTreeMap;

use base64::Engine;
use chrono::{DateTime, FixedOffset};

use crate::config::{Format, QueryOpts};
use crate::datum::Datum;
use crate::error::{CursorError, Result};

const REQL_TYPE_KEY: &str = "$reql_type$";

/// Turns one parsed reply batch into a [`Datum`] tree.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, value: serde_json::Value, opts: &QueryOpts) -> Result<Datum>;
}

/// The default normalizer: understands TIME, BINARY and GROUPED_DATA and
/// honors the per-query `*_format` options.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pseudotypes;

impl Normalizer for Pseudotypes {
    fn normalize(&self, value: serde_json::Value, opts: &QueryOpts) -> Result<Datum> {
        convert(value, opts)
    }
}

fn convert(value: serde_json::Value, opts: &QueryOpts) -> Result<Datum> {
    match value {
        serde_json::Value::Array(items) => Ok(Datum::Array(
            items
                .into_iter()
                .map(|v| convert(v, opts))
                .collect::<Result<_>>()?,
        )),
        serde_json::Value::Object(map) => {
            let reql_type = map
                .get(REQL_TYPE_KEY)
                .and_then(|t| t.as_str())
                .map(str::to_owned);
            match reql_type.as_deref() {
                Some("TIME") if opts.time_format == Format::Native => convert_time(&map),
                Some("BINARY") if opts.binary_format == Format::Native => convert_binary(&map),
                Some("GROUPED_DATA") if opts.group_format == Format::Native => {
                    convert_grouped(map, opts)
                }
                _ => {
                    let mut out = BTreeMap::new();
                    for (k, v) in map {
                        out.insert(k, convert(v, opts)?);
                    }
                    Ok(Datum::Object(out))
                }
            }
        }
        other => Ok(Datum::from(other)),
    }
}

fn convert_time(map: &serde_json::Map<String, serde_json::Value>) -> Result<Datum> {
    let epoch = map
        .get("epoch_time")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| {
            CursorError::decode("pseudo-type TIME object missing expected field 'epoch_time'")
        })?;
    let tz = map
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            CursorError::decode("pseudo-type TIME object missing expected field 'timezone'")
        })?;

    let offset = parse_timezone(tz)?;
    let millis = (epoch * 1000.0).round() as i64;
    let utc = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| CursorError::decode(format!("Time out of range: {epoch}")))?;
    Ok(Datum::Time(utc.with_timezone(&offset)))
}

/// Parse a `+HH:MM` / `-HH:MM` offset as sent by the server.
fn parse_timezone(tz: &str) -> Result<FixedOffset> {
    let invalid = || CursorError::decode(format!("Invalid timezone: {tz}"));
    if tz == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let (sign, rest) = match tz.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn convert_binary(map: &serde_json::Map<String, serde_json::Value>) -> Result<Datum> {
    let data = map
        .get("data")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            CursorError::decode("pseudo-type BINARY object missing expected field 'data'")
        })?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CursorError::decode(format!("Invalid base64: {e}")))?;
    Ok(Datum::Binary(bytes))
}

fn convert_grouped(
    mut map: serde_json::Map<String, serde_json::Value>,
    opts: &QueryOpts,
) -> Result<Datum> {
    let Some(serde_json::Value::Array(pairs)) = map.remove("data") else {
        return Err(CursorError::decode(
            "pseudo-type GROUPED_DATA object missing expected field 'data'",
        ));
    };

    let mut groups = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let serde_json::Value::Array(mut pair) = pair else {
            return Err(CursorError::decode("GROUPED_DATA entry is not a pair"));
        };
        if pair.len() != 2 {
            return Err(CursorError::decode("GROUPED_DATA entry is not a pair"));
        }
        let reduction = pair.pop().unwrap_or_default();
        let group = pair.pop().unwrap_or_default();

        let mut obj = BTreeMap::new();
        obj.insert("group".to_string(), convert(group, opts)?);
        obj.insert("reduction".to_string(), convert(reduction, opts)?);
        groups.push(Datum::Object(obj));
    }
    Ok(Datum::Array(groups))
}

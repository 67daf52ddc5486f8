//! Value normalization: Arrow cells to JSON-safe values, Arrow type names
//! to canonical SQL type names.
//!
//! Conversion is driven by the array's declared Arrow type, so day- vs
//! millisecond-resolution dates come from `Date32`/`Date64`/`Timestamp`
//! units and decimal scale comes from the declared `Decimal128(p, s)` — no
//! magnitude guessing. The normalizer is total: a type without a specific
//! rule degrades to Arrow's own display formatting, never an error.

use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    i256, DataType, Date32Type, Date64Type, Decimal128Type, Decimal256Type, Float32Type,
    Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, Time32MillisecondType,
    Time32SecondType, Time64MicrosecondType, Time64NanosecondType, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, NaiveTime, SecondsFormat};
use serde_json::{Map, Number, Value};

/// Largest integer magnitude an f64 (and therefore a JSON number reader)
/// can hold exactly.
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

// ---------------------------------------------------------------------------
// Type names
// ---------------------------------------------------------------------------

/// Exact Arrow type name to SQL type name.
const EXACT_TYPE_NAMES: &[(&str, &str)] = &[
    ("Null", "NULL"),
    ("Boolean", "BOOLEAN"),
    ("Int8", "TINYINT"),
    ("Int16", "SMALLINT"),
    ("Int32", "INTEGER"),
    ("Int64", "BIGINT"),
    ("UInt8", "SMALLINT"),
    ("UInt16", "INTEGER"),
    ("UInt32", "BIGINT"),
    ("UInt64", "BIGINT"),
    ("Float16", "REAL"),
    ("Float32", "REAL"),
    ("Float64", "DOUBLE"),
    ("Utf8", "VARCHAR"),
    ("LargeUtf8", "VARCHAR"),
    ("Utf8View", "VARCHAR"),
    ("Binary", "VARBINARY"),
    ("LargeBinary", "VARBINARY"),
    ("BinaryView", "VARBINARY"),
    ("Date32", "DATE"),
    ("Date64", "DATE"),
];

/// Prefix matches for parameterized type strings, tried in order after the
/// exact table misses.
const PREFIX_TYPE_NAMES: &[(&str, &str)] = &[
    ("Timestamp", "TIMESTAMP"),
    ("Decimal128", "DECIMAL"),
    ("Decimal256", "DECIMAL"),
    ("Decimal", "DECIMAL"),
    ("Time32", "TIME"),
    ("Time64", "TIME"),
    ("Duration", "INTERVAL"),
    ("Interval", "INTERVAL"),
    ("FixedSizeBinary", "VARBINARY"),
    ("FixedSizeList", "ARRAY"),
    ("LargeList", "ARRAY"),
    ("List", "ARRAY"),
    ("Struct", "STRUCT"),
    ("Map", "MAP"),
    ("Union", "UNION"),
];

/// Map an Arrow type name (possibly parameterized, like
/// `Timestamp(Microsecond, None)`) to a SQL type name. Unrecognized names
/// pass through unchanged.
pub fn normalize_type_name(raw: &str) -> String {
    for (arrow_name, sql_name) in EXACT_TYPE_NAMES {
        if raw == *arrow_name {
            return (*sql_name).to_string();
        }
    }
    for (prefix, sql_name) in PREFIX_TYPE_NAMES {
        if raw.starts_with(prefix) {
            return (*sql_name).to_string();
        }
    }
    raw.to_string()
}

/// SQL type name for a declared Arrow type.
pub fn sql_type_name(data_type: &DataType) -> String {
    normalize_type_name(&format!("{:?}", data_type))
}

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// All rows of a batch as JSON objects, one entry per column, nulls
/// explicit.
pub fn batch_rows(batch: &RecordBatch) -> Vec<Map<String, Value>> {
    let schema = batch.schema();
    (0..batch.num_rows())
        .map(|row| {
            schema
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(field, column)| (field.name().clone(), cell_value(column.as_ref(), row)))
                .collect()
        })
        .collect()
}

/// Convert one cell to a JSON-safe value. Total: every Arrow type either
/// has a specific rule or falls back to Arrow's display formatting.
pub fn cell_value(array: &dyn Array, row: usize) -> Value {
    if array.is_null(row) {
        return Value::Null;
    }

    match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),

        DataType::Int8 => Value::from(array.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => Value::from(array.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => Value::from(array.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => int64_value(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::from(array.as_primitive::<UInt8Type>().value(row)),
        DataType::UInt16 => Value::from(array.as_primitive::<UInt16Type>().value(row)),
        DataType::UInt32 => Value::from(array.as_primitive::<UInt32Type>().value(row)),
        DataType::UInt64 => uint64_value(array.as_primitive::<UInt64Type>().value(row)),

        DataType::Float32 => float_value(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float_value(array.as_primitive::<Float64Type>().value(row)),

        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),

        DataType::Binary => binary_placeholder(array.as_binary::<i32>().value(row).len()),
        DataType::LargeBinary => binary_placeholder(array.as_binary::<i64>().value(row).len()),
        DataType::FixedSizeBinary(_) => {
            binary_placeholder(array.as_fixed_size_binary().value(row).len())
        }

        DataType::Date32 => date_value(array.as_primitive::<Date32Type>().value(row)),
        DataType::Date64 => {
            timestamp_value(array.as_primitive::<Date64Type>().value(row), &TimeUnit::Millisecond)
        }
        DataType::Timestamp(unit, _) => {
            let raw = match unit {
                TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(row),
                TimeUnit::Millisecond => {
                    array.as_primitive::<TimestampMillisecondType>().value(row)
                }
                TimeUnit::Microsecond => {
                    array.as_primitive::<TimestampMicrosecondType>().value(row)
                }
                TimeUnit::Nanosecond => array.as_primitive::<TimestampNanosecondType>().value(row),
            };
            timestamp_value(raw, unit)
        }
        DataType::Time32(unit) => {
            let raw = match unit {
                TimeUnit::Second => array.as_primitive::<Time32SecondType>().value(row) as i64,
                _ => array.as_primitive::<Time32MillisecondType>().value(row) as i64,
            };
            time_value(raw, unit)
        }
        DataType::Time64(unit) => {
            let raw = match unit {
                TimeUnit::Microsecond => array.as_primitive::<Time64MicrosecondType>().value(row),
                _ => array.as_primitive::<Time64NanosecondType>().value(row),
            };
            time_value(raw, unit)
        }

        DataType::Decimal128(_, scale) => {
            decimal_value(array.as_primitive::<Decimal128Type>().value(row), *scale)
        }
        DataType::Decimal256(_, scale) => {
            decimal256_value(array.as_primitive::<Decimal256Type>().value(row), *scale)
        }

        DataType::List(_) => {
            let values = array.as_list::<i32>().value(row);
            list_value(values.as_ref())
        }
        DataType::LargeList(_) => {
            let values = array.as_list::<i64>().value(row);
            list_value(values.as_ref())
        }
        DataType::FixedSizeList(_, _) => {
            let values = array.as_fixed_size_list().value(row);
            list_value(values.as_ref())
        }
        DataType::Struct(fields) => {
            let strukt = array.as_struct();
            Value::Object(
                fields
                    .iter()
                    .zip(strukt.columns())
                    .map(|(field, column)| (field.name().clone(), cell_value(column.as_ref(), row)))
                    .collect(),
            )
        }

        // Everything else (durations, intervals, dictionaries, unions, ...)
        // degrades to Arrow's text rendering rather than failing.
        _ => match ArrayFormatter::try_new(array, &FormatOptions::default()) {
            Ok(formatter) => Value::String(formatter.value(row).to_string()),
            Err(_) => Value::Null,
        },
    }
}

fn list_value(values: &dyn Array) -> Value {
    Value::Array((0..values.len()).map(|i| cell_value(values, i)).collect())
}

fn int64_value(v: i64) -> Value {
    // Values outside the f64-safe range become strings so the browser
    // never sees a silently rounded integer.
    if v.abs() <= MAX_SAFE_INTEGER {
        Value::from(v)
    } else {
        Value::String(v.to_string())
    }
}

fn uint64_value(v: u64) -> Value {
    if v <= MAX_SAFE_INTEGER as u64 {
        Value::from(v)
    } else {
        Value::String(v.to_string())
    }
}

fn float_value(v: f64) -> Value {
    match Number::from_f64(v) {
        Some(n) => Value::Number(n),
        // NaN / infinities have no JSON representation.
        None => Value::String(v.to_string()),
    }
}

fn binary_placeholder(len: usize) -> Value {
    Value::String(format!("<binary: {} bytes>", len))
}

fn date_value(days: i32) -> Value {
    match DateTime::from_timestamp(i64::from(days) * 86_400, 0) {
        Some(dt) => Value::String(dt.format("%Y-%m-%d").to_string()),
        None => Value::from(days),
    }
}

fn timestamp_value(raw: i64, unit: &TimeUnit) -> Value {
    let parsed = match unit {
        TimeUnit::Second => DateTime::from_timestamp(raw, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(raw),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(raw),
        TimeUnit::Nanosecond => DateTime::from_timestamp(
            raw.div_euclid(1_000_000_000),
            raw.rem_euclid(1_000_000_000) as u32,
        ),
    };
    match parsed {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => int64_value(raw),
    }
}

fn time_value(raw: i64, unit: &TimeUnit) -> Value {
    let (secs, nanos) = match unit {
        TimeUnit::Second => (raw, 0),
        TimeUnit::Millisecond => (raw / 1_000, (raw % 1_000) * 1_000_000),
        TimeUnit::Microsecond => (raw / 1_000_000, (raw % 1_000_000) * 1_000),
        TimeUnit::Nanosecond => (raw / 1_000_000_000, raw % 1_000_000_000),
    };
    match NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, nanos as u32) {
        Some(time) if nanos > 0 => Value::String(time.format("%H:%M:%S%.f").to_string()),
        Some(time) => Value::String(time.format("%H:%M:%S").to_string()),
        None => int64_value(raw),
    }
}

/// Apply the declared scale to an unscaled decimal. Values whose unscaled
/// magnitude fits the safe range come back as numbers; anything wider
/// becomes a full-precision decimal string.
fn decimal_value(unscaled: i128, scale: i8) -> Value {
    if unscaled.unsigned_abs() <= MAX_SAFE_INTEGER as u128 {
        let scaled = unscaled as f64 / 10f64.powi(i32::from(scale));
        if let Some(n) = Number::from_f64(scaled) {
            return Value::Number(n);
        }
    }
    Value::String(decimal_string(&unscaled.to_string(), scale))
}

fn decimal256_value(unscaled: i256, scale: i8) -> Value {
    match unscaled.to_i128() {
        Some(v) => decimal_value(v, scale),
        None => Value::String(decimal_string(&unscaled.to_string(), scale)),
    }
}

/// Insert the decimal point into an unscaled integer's digit string.
fn decimal_string(unscaled: &str, scale: i8) -> String {
    let (sign, digits) = match unscaled.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", unscaled),
    };
    if scale <= 0 {
        let zeros = "0".repeat(scale.unsigned_abs() as usize);
        return format!("{}{}{}", sign, digits, zeros);
    }
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits.to_string()
    };
    let split = padded.len() - scale;
    format!("{}{}.{}", sign, &padded[..split], &padded[split..])
}

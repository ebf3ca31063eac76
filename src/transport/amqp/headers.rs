// src/transport/amqp/headers.rs

//! Header codec between domain headers and AMQP field tables.
//!
//! Encoding is lossless: every header value is sent as an AMQP byte array.
//!
//! Decoding accepts whatever a foreign publisher put in the table and
//! coerces each value to bytes deterministically:
//!
//! | AMQP value | decoded bytes |
//! |---|---|
//! | long / short string | UTF-8 bytes of the string |
//! | byte array | unchanged |
//! | anything else | UTF-8 bytes of its default rendering |
//!
//! Default renderings: booleans as `true`/`false`, integers and floats in
//! decimal, decimals scaled (`scale = 2, value = 12345` → `123.45`),
//! timestamps as seconds, arrays as `[a, b]`, tables as `{k: v}` and the
//! empty value as `void`.

use lapin::types::{AMQPValue, ByteArray, DecimalValue, FieldTable};

use bytes::Bytes;

use crate::Headers;

/// Encode domain headers into an AMQP field table.
pub fn encode_headers(headers: &Headers) -> FieldTable {
    // ---
    let mut table = FieldTable::default();

    for (key, value) in headers {
        table.insert(
            key.as_str().into(),
            AMQPValue::ByteArray(ByteArray::from(value.to_vec())),
        );
    }

    table
}

/// Decode an AMQP field table into domain headers.
pub fn decode_headers(table: &FieldTable) -> Headers {
    // ---
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), decode_value(value)))
        .collect()
}

fn decode_value(value: &AMQPValue) -> Bytes {
    // ---
    match value {
        AMQPValue::LongString(s) => Bytes::copy_from_slice(s.as_bytes()),
        AMQPValue::ShortString(s) => Bytes::copy_from_slice(s.as_str().as_bytes()),
        AMQPValue::ByteArray(b) => Bytes::copy_from_slice(b.as_slice()),
        other => Bytes::from(render_value(other)),
    }
}

fn render_value(value: &AMQPValue) -> String {
    // ---
    match value {
        AMQPValue::Boolean(v) => v.to_string(),
        AMQPValue::ShortShortInt(v) => v.to_string(),
        AMQPValue::ShortShortUInt(v) => v.to_string(),
        AMQPValue::ShortInt(v) => v.to_string(),
        AMQPValue::ShortUInt(v) => v.to_string(),
        AMQPValue::LongInt(v) => v.to_string(),
        AMQPValue::LongUInt(v) => v.to_string(),
        AMQPValue::LongLongInt(v) => v.to_string(),
        AMQPValue::Float(v) => v.to_string(),
        AMQPValue::Double(v) => v.to_string(),
        AMQPValue::DecimalValue(v) => render_decimal(v),
        AMQPValue::ShortString(v) => v.as_str().to_string(),
        AMQPValue::LongString(v) => String::from_utf8_lossy(v.as_bytes()).into_owned(),
        AMQPValue::ByteArray(v) => String::from_utf8_lossy(v.as_slice()).into_owned(),
        AMQPValue::Timestamp(v) => v.to_string(),
        AMQPValue::FieldArray(items) => {
            let rendered: Vec<String> = items.as_slice().iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        AMQPValue::FieldTable(table) => {
            let rendered: Vec<String> = table
                .inner()
                .iter()
                .map(|(k, v)| format!("{}: {}", k.as_str(), render_value(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        AMQPValue::Void => "void".to_string(),
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

fn render_decimal(decimal: &DecimalValue) -> String {
    // ---
    let digits = decimal.value.to_string();
    let scale = usize::from(decimal.scale);

    if scale == 0 {
        return digits;
    }

    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{int_part}.{frac_part}")
}

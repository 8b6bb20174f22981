//! InfluxDB v2 line protocol encoding.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ns
//! ```
//!
//! See: <https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/>

use crate::storage::point::{FieldValue, WriteRecord};

impl FieldValue {
    /// Float as-is, integer with an `i` suffix, string quoted with `"`, `\`
    /// and line breaks escaped.
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{v}"),
            FieldValue::Integer(v) => format!("{v}i"),
            FieldValue::String(v) => {
                let escaped = v
                    .replace('\\', "\\\\")
                    .replace('"', "\\\"")
                    .replace('\n', "\\n")
                    .replace('\r', "\\r");
                format!("\"{escaped}\"")
            }
        }
    }
}

/// Encode `record` as a single line.
///
/// `extra_tags` are merged with the record's own tags; on a key clash the
/// record wins. Tags are written sorted by key, which is the canonical form
/// InfluxDB indexes fastest. Tags with an empty value are skipped since the
/// protocol cannot express them.
pub fn encode(record: &WriteRecord, extra_tags: &[(String, String)], timestamp_ns: i64) -> String {
    let mut line = escape_measurement(&record.measurement);

    let mut tags: Vec<&(String, String)> = record.tags.iter().collect();
    for extra in extra_tags {
        if !record.tags.iter().any(|(k, _)| *k == extra.0) {
            tags.push(extra);
        }
    }
    tags.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    for (i, (key, value)) in record.fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&value.to_line_protocol());
    }

    line.push(' ');
    line.push_str(&timestamp_ns.to_string());
    line
}

/// Measurement names escape commas and spaces.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys escape commas, equals signs, spaces
/// and line breaks. An unescaped newline would start a new point.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

//! Storage-side representation of a reading.

use crate::reading::Reading;

/// Measurement every reading is written under.
pub const MEASUREMENT: &str = "machine_telemetry";

/// Tag value used when a reading does not name its machine.
pub const MACHINE_ID_SENTINEL: &str = "esp32_default";

/// A value that can be stored in a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
}

/// One point destined for the store: measurement, tags and fields.
///
/// The timestamp is not part of the record; the storage writer assigns it
/// when the record is enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
}

impl WriteRecord {
    /// Translate an accepted reading received on `topic`.
    ///
    /// `temperature` is always written. Optional reading fields are written
    /// under their own names only when present; absent ones are left out
    /// entirely rather than written as null or zero.
    pub fn from_reading(reading: &Reading, topic: &str) -> Self {
        let machine_id = match reading.machine_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => MACHINE_ID_SENTINEL,
        };

        let mut fields = vec![(
            "temperature".to_string(),
            FieldValue::Float(reading.temperature),
        )];
        if let Some(status) = &reading.status {
            fields.push(("status".to_string(), FieldValue::String(status.clone())));
        }
        if let Some(counter) = reading.counter {
            fields.push(("counter".to_string(), FieldValue::Integer(counter)));
        }
        if let Some(humidity) = reading.humidity {
            fields.push(("humidity".to_string(), FieldValue::Float(humidity)));
        }

        Self {
            measurement: MEASUREMENT.to_string(),
            tags: vec![
                ("machine_id".to_string(), machine_id.to_string()),
                ("topic".to_string(), topic.to_string()),
            ],
            fields,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

use crate::common::types::SinkError;
use chrono::{DateTime, Utc};

/// A single InfluxDB point. Tags and fields keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, f64)>,
    timestamp: DateTime<Utc>,
}

impl Point {
    pub fn new(measurement: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.to_string(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp,
        }
    }

    /// Empty tag values are not representable in line protocol and are dropped.
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.tags.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn field(mut self, key: &str, value: f64) -> Self {
        self.fields.push((key.to_string(), value));
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_value(&self, key: &str) -> Option<f64> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Serializes the point with a nanosecond timestamp.
    pub fn to_line(&self) -> Result<String, SinkError> {
        if self.fields.is_empty() {
            return Err(SinkError::InvalidPoint(format!(
                "{} has no fields",
                self.measurement
            )));
        }
        let nanos = self.timestamp.timestamp_nanos_opt().ok_or_else(|| {
            SinkError::InvalidPoint(format!("timestamp {} out of range", self.timestamp))
        })?;

        let mut line = escape(&self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape(key, &[',', '=', ' ']));
            line.push('=');
            line.push_str(&escape(value, &[',', '=', ' ']));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            if !value.is_finite() {
                return Err(SinkError::InvalidPoint(format!(
                    "field {key} of {} is {value}",
                    self.measurement
                )));
            }
            fields.push(format!("{}={value}", escape(key, &[',', '=', ' '])));
        }
        line.push(' ');
        line.push_str(&fields.join(","));
        line.push(' ');
        line.push_str(&nanos.to_string());

        Ok(line)
    }
}

fn escape(text: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

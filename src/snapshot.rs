use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

const FIELD_COUNT: usize = 7;
const DELIMITER: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cpu_load: u64,
    pub memory_capacity: u64,
    pub memory_usage: u64,
    pub disk_capacity: u64,
    pub disk_usage: u64,
    pub network_capacity: u64,
    pub network_activity: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid payload format: expected {expected} fields, got {found}")]
    Format { expected: usize, found: usize },
    #[error("field {index} is not a valid integer: {field:?}")]
    Number {
        field: String,
        index: usize,
        source: ParseIntError,
    },
}

pub fn parse(payload: &str) -> Result<MetricsSnapshot, ParseError> {
    let line = strip_line_terminator(payload);
    let fields: Vec<&str> = line.split(DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::Format {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let mut values = [0_u64; FIELD_COUNT];
    for (index, (slot, field)) in values.iter_mut().zip(&fields).enumerate() {
        *slot = field.parse().map_err(|source| ParseError::Number {
            field: (*field).to_string(),
            index,
            source,
        })?;
    }

    let [
        cpu_load,
        memory_capacity,
        memory_usage,
        disk_capacity,
        disk_usage,
        network_capacity,
        network_activity,
    ] = values;
    Ok(MetricsSnapshot {
        cpu_load,
        memory_capacity,
        memory_usage,
        disk_capacity,
        disk_usage,
        network_capacity,
        network_activity,
    })
}

fn strip_line_terminator(payload: &str) -> &str {
    payload
        .strip_suffix("\r\n")
        .or_else(|| payload.strip_suffix('\n'))
        .unwrap_or(payload)
}

impl FromStr for MetricsSnapshot {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.cpu_load,
            self.memory_capacity,
            self.memory_usage,
            self.disk_capacity,
            self.disk_usage,
            self.network_capacity,
            self.network_activity
        )
    }
}

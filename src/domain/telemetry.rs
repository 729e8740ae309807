// Telemetry data domain models
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

/// One `(time, value)` reading. Serialised as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((time, value): (f64, f64)) -> Self {
        Self { time, value }
    }
}

impl From<Sample> for (f64, f64) {
    fn from(sample: Sample) -> Self {
        (sample.time, sample.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Live,
    Preloaded,
    Prediction,
}

/// A named, independently timed series fed to the merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesData {
    pub name: String,
    pub kind: SeriesKind,
    #[serde(default)]
    pub data: Vec<Sample>,
}

impl SeriesData {
    pub fn new(name: String, kind: SeriesKind, data: Vec<Sample>) -> Self {
        Self { name, kind, data }
    }
}

/// A row of merged output: one time and one value per merged series.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub time: f64,
    pub values: Vec<f64>,
}

impl MergedRow {
    pub fn new(time: f64, values: Vec<f64>) -> Self {
        Self { time, values }
    }
}

// Rendered as a flat `[time, v1, v2, ...]` array.
impl Serialize for MergedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len() + 1))?;
        seq.serialize_element(&self.time)?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

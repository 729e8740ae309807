// Recordings decoupled from slots, for synchronized multi-sensor capture and export
use super::sensor::SensorBinding;
use super::slot::AppendOutcome;
use super::telemetry::Sample;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    #[serde(rename = "columnID")]
    pub column_id: String,
    pub unit: String,
    pub precision: u32,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub tare_value: f64,
    #[serde(rename = "sensorPosition")]
    pub position: Option<i32>,
    pub data: Vec<Sample>,
}

impl Recording {
    /// Start an empty recording for a connected binding.
    pub fn for_binding(binding: &SensorBinding, precision: u32) -> Option<Self> {
        let column_id = binding.column_id.clone()?;
        let unit = binding.unit.clone()?;
        let def = &binding.definition;
        Some(Self {
            column_id,
            unit,
            precision,
            name: def.measurement_name.clone(),
            min: def.min_reading,
            max: def.max_reading,
            tare_value: binding.tare_value,
            position: binding.position,
            data: Vec::new(),
        })
    }
}

#[derive(Debug, Default)]
pub struct SensorRecordingStore {
    recordings: Vec<Recording>,
    num_requested_data_points: usize,
    num_recorded_data_points: usize,
    single_read_started_at: Option<Instant>,
}

impl SensorRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all recordings and reset the single-read counters.
    pub fn start_new_recordings(&mut self, recordings: Vec<Recording>) {
        self.recordings = recordings;
        self.reset_counters();
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn recording(&self, column_id: &str) -> Option<&Recording> {
        self.recordings.iter().find(|r| r.column_id == column_id)
    }

    /// Follow a sensor whose column was re-enumerated under a new id.
    pub fn rename_column(&mut self, old_id: &str, new_id: &str) {
        if old_id == new_id {
            return;
        }
        if let Some(recording) = self.recordings.iter_mut().find(|r| r.column_id == old_id) {
            recording.column_id = new_id.to_string();
        }
    }

    pub fn set_tare(&mut self, column_id: &str, tare_value: f64) {
        if let Some(recording) = self.recordings.iter_mut().find(|r| r.column_id == column_id) {
            recording.tare_value = tare_value;
        }
    }

    /// Append tare-adjusted samples for one column. Values equal to the
    /// previously stored value are skipped.
    pub fn append_data(&mut self, column_id: &str, samples: &[Sample], run_length: f64) -> AppendOutcome {
        let mut outcome = AppendOutcome::default();
        let Some(recording) = self.recordings.iter_mut().find(|r| r.column_id == column_id) else {
            return outcome;
        };

        for sample in samples {
            if !sample.time.is_finite() || !sample.value.is_finite() {
                continue;
            }
            if sample.time > run_length {
                outcome.run_length_reached = true;
                continue;
            }

            let value = sample.value - recording.tare_value;
            if recording.data.last().is_some_and(|last| last.value == value) {
                continue;
            }
            recording.data.push(Sample::new(sample.time, value));
            outcome.appended += 1;
        }
        outcome
    }

    /// Ask for `count` more single-shot captures.
    pub fn request_data_points(&mut self, count: usize) {
        self.num_requested_data_points += count;
    }

    pub fn num_requested_data_points(&self) -> usize {
        self.num_requested_data_points
    }

    pub fn num_recorded_data_points(&self) -> usize {
        self.num_recorded_data_points
    }

    pub fn has_pending_data_points(&self) -> bool {
        self.num_recorded_data_points < self.num_requested_data_points
    }

    /// Accept one pending single-shot capture from `live_values` (keyed by
    /// column id). The first capture is stamped at 1s, later ones at 1s plus
    /// the wall-clock time elapsed since the first. Returns whether the
    /// requested count has been reached.
    pub fn record_one_data_point_if_needed(
        &mut self,
        live_values: &HashMap<String, f64>,
        now: Instant,
    ) -> bool {
        if !self.has_pending_data_points() {
            return true;
        }

        let time = match self.single_read_started_at {
            Some(started) => 1.0 + now.saturating_duration_since(started).as_secs_f64(),
            None => {
                self.single_read_started_at = Some(now);
                1.0
            }
        };

        for recording in &mut self.recordings {
            if let Some(value) = live_values.get(&recording.column_id) {
                recording.data.push(Sample::new(time, value - recording.tare_value));
            }
        }

        self.num_recorded_data_points += 1;
        !self.has_pending_data_points()
    }

    pub fn clear_data(&mut self) {
        for recording in &mut self.recordings {
            recording.data.clear();
        }
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.num_requested_data_points = 0;
        self.num_recorded_data_points = 0;
        self.single_read_started_at = None;
    }
}

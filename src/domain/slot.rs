// Sensor slots - stable UI positions and their continuous recordings
use super::sensor::SensorBinding;
use super::telemetry::Sample;
use serde::Serialize;

pub const SLOT_COUNT: usize = 2;

/// Result of appending a batch of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub appended: usize,
    /// A sample past the run length was seen (and dropped).
    pub run_length_reached: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSlot {
    pub index: usize,
    pub binding: SensorBinding,
    pub recorded_samples: Vec<Sample>,
    #[serde(skip)]
    recorded_unit: Option<String>,
    #[serde(skip)]
    value_range: Option<(f64, f64)>,
}

impl SensorSlot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            binding: SensorBinding::default(),
            recorded_samples: Vec::new(),
            recorded_unit: None,
            value_range: None,
        }
    }

    /// Both slots, empty and unbound.
    pub fn initial() -> [SensorSlot; SLOT_COUNT] {
        [SensorSlot::new(0), SensorSlot::new(1)]
    }

    /// Replace the binding. Stored samples are dropped when the new sensor
    /// reports a different unit than the one they were recorded in.
    pub fn set_binding(&mut self, binding: SensorBinding) {
        let unit_changed = match (&binding.unit, &self.recorded_unit) {
            (Some(new_unit), Some(recorded)) => new_unit != recorded,
            _ => false,
        };
        self.binding = binding;
        if unit_changed {
            self.clear_data();
        }
    }

    /// Append tare-adjusted samples, dropping anything past `run_length` or non-finite.
    pub fn append_data(&mut self, samples: &[Sample], run_length: f64) -> AppendOutcome {
        let mut outcome = AppendOutcome::default();

        for sample in samples {
            if !sample.time.is_finite() || !sample.value.is_finite() {
                continue;
            }
            self.binding.heartbeat_value = Some(sample.value);

            if sample.time > run_length {
                outcome.run_length_reached = true;
                continue;
            }

            let value = sample.value - self.binding.tare_value;
            self.recorded_samples.push(Sample::new(sample.time, value));
            self.extend_range(value);
            outcome.appended += 1;
        }

        if outcome.appended > 0 && self.recorded_unit.is_none() {
            self.recorded_unit = self.binding.unit.clone();
        }
        outcome
    }

    /// Capture the current live value (or last heartbeat) as the tare offset.
    /// Already stored samples keep their values.
    pub fn zero_sensor(&mut self) -> Option<f64> {
        let tare = self.binding.sensor_value.or(self.binding.heartbeat_value)?;
        self.binding.tare_value = tare;
        Some(tare)
    }

    pub fn clear_data(&mut self) {
        self.recorded_samples.clear();
        self.recorded_unit = None;
        self.value_range = None;
    }

    /// Observed (min, max) of stored values.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.value_range
    }

    /// Latest live value with the tare offset applied.
    pub fn tared_live_value(&self) -> Option<f64> {
        self.binding.sensor_value.map(|v| v - self.binding.tare_value)
    }

    fn extend_range(&mut self, value: f64) {
        self.value_range = Some(match self.value_range {
            Some((min, max)) => (min.min(value), max.max(value)),
            None => (value, value),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensor::DataColumn;

    fn bound_slot(unit: &str) -> SensorSlot {
        let mut slot = SensorSlot::new(0);
        slot.set_binding(SensorBinding::from_column(
            &DataColumn::new("10", 0, unit),
            &SensorBinding::default(),
        ));
        slot
    }

    fn samples(pairs: &[(f64, f64)]) -> Vec<Sample> {
        pairs.iter().copied().map(Sample::from).collect()
    }

    #[test]
    fn test_run_length_truncation() {
        let mut slot = bound_slot("N");
        let outcome = slot.append_data(&samples(&[(0.0, 1.0), (5.0, 2.0), (5.1, 3.0), (6.0, 4.0)]), 5.0);

        assert_eq!(outcome.appended, 2);
        assert!(outcome.run_length_reached);
        assert!(slot.recorded_samples.iter().all(|s| s.time <= 5.0));
        assert_eq!(slot.binding.heartbeat_value, Some(4.0));
    }

    #[test]
    fn test_taring_is_not_retroactive() {
        let mut slot = bound_slot("N");
        slot.append_data(&samples(&[(0.0, 10.0)]), 20.0);

        slot.binding.sensor_value = Some(4.0);
        assert_eq!(slot.zero_sensor(), Some(4.0));

        slot.append_data(&samples(&[(1.0, 10.0)]), 20.0);
        assert_eq!(slot.recorded_samples[0].value, 10.0);
        assert_eq!(slot.recorded_samples[1].value, 6.0);
        assert_eq!(slot.value_range(), Some((6.0, 10.0)));
    }

    #[test]
    fn test_zero_uses_heartbeat_when_live_missing() {
        let mut slot = bound_slot("N");
        assert_eq!(slot.zero_sensor(), None);

        slot.append_data(&samples(&[(0.0, 2.5)]), 20.0);
        assert_eq!(slot.zero_sensor(), Some(2.5));
        assert_eq!(slot.binding.tare_value, 2.5);
    }

    #[test]
    fn test_continuous_slot_keeps_repeated_values() {
        let mut slot = bound_slot("N");
        slot.append_data(&samples(&[(0.0, 1.0), (0.1, 1.0), (0.2, 1.0)]), 20.0);
        assert_eq!(slot.recorded_samples.len(), 3);
    }

    #[test]
    fn test_non_finite_samples_dropped() {
        let mut slot = bound_slot("N");
        let outcome = slot.append_data(&samples(&[(0.0, f64::NAN), (f64::INFINITY, 1.0), (1.0, 1.0)]), 20.0);
        assert_eq!(outcome.appended, 1);
        assert!(!outcome.run_length_reached);
    }

    #[test]
    fn test_unit_change_clears_samples() {
        let mut slot = bound_slot("N");
        slot.append_data(&samples(&[(0.0, 1.0)]), 20.0);

        // Same unit, new column id: data stays.
        slot.set_binding(SensorBinding::from_column(&DataColumn::new("11", 0, "N"), &slot.binding));
        assert_eq!(slot.recorded_samples.len(), 1);

        // Disconnect keeps data visible.
        slot.set_binding(SensorBinding::default());
        assert_eq!(slot.recorded_samples.len(), 1);

        slot.set_binding(SensorBinding::from_column(&DataColumn::new("12", 0, "lux"), &slot.binding));
        assert!(slot.recorded_samples.is_empty());
        assert_eq!(slot.value_range(), None);
    }
}

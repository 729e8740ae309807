// Sensor service - Applies device events to the slots and the recording store
use crate::application::device_manager::SensorData;
use crate::application::format::get_fix_value;
use crate::application::slot_matcher::match_sensors_to_columns;
use crate::application::stuck_sensor::StuckSensorDetector;
use crate::domain::measurement::definition_for_unit;
use crate::domain::recording::{Recording, SensorRecordingStore};
use crate::domain::sensor::{DeviceConfig, SensorBinding};
use crate::domain::slot::{SensorSlot, SLOT_COUNT};
use crate::infrastructure::config::PipelineConfig;
use std::collections::HashMap;
use std::time::Instant;

/// How the recording store is fed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Every data event is appended (de-duplicated).
    #[default]
    Continuous,
    /// Only explicitly requested single-shot captures are stored.
    SingleRead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataOutcome {
    /// Samples appended to each slot by this event
    pub appended: [usize; SLOT_COUNT],
    /// A continuous run received a sample past the run length; the host should stop collecting
    pub run_length_reached: bool,
    /// A single-read request was completed by this event
    pub quota_reached: bool,
}

pub struct SensorService {
    slots: [SensorSlot; SLOT_COUNT],
    store: SensorRecordingStore,
    detector: StuckSensorDetector,
    device_config: Option<DeviceConfig>,
    pipeline: PipelineConfig,
    mode: CaptureMode,
    collecting: bool,
}

impl SensorService {
    pub fn new(pipeline: PipelineConfig) -> Self {
        Self {
            slots: SensorSlot::initial(),
            store: SensorRecordingStore::new(),
            detector: StuckSensorDetector::new(pipeline.stuck_window),
            device_config: None,
            pipeline,
            mode: CaptureMode::default(),
            collecting: false,
        }
    }

    pub fn on_sensor_connect(&mut self, config: DeviceConfig) {
        tracing::info!(
            "Sensor connected with {} columns (interface: {})",
            config.data_columns.len(),
            config.has_interface
        );
        self.rebind(config);
    }

    pub fn on_sensor_status(&mut self, config: DeviceConfig) {
        self.rebind(config);

        let Some(config) = &self.device_config else {
            return;
        };
        for slot in &self.slots {
            let Some(column_id) = slot.binding.column_id.as_deref() else {
                continue;
            };
            if let Some(column) = config.column_by_id(column_id) {
                if self.detector.observe(column) {
                    tracing::warn!(
                        "Sensor column {} appears stuck: value {:?} at timestamp {:?} has not changed",
                        column.id,
                        column.live_value,
                        column.live_value_timestamp
                    );
                }
            }
        }
    }

    pub fn on_sensor_data(&mut self, data: &SensorData, now: Instant) -> DataOutcome {
        let run_length = self.pipeline.run_length;
        let mut outcome = DataOutcome::default();
        let mut past_run_length = false;

        for slot in &mut self.slots {
            let Some(column_id) = slot.binding.column_id.clone() else {
                continue;
            };
            let Some(samples) = data.get(&column_id) else {
                continue;
            };

            let appended = slot.append_data(samples, run_length);
            outcome.appended[slot.index] = appended.appended;
            past_run_length |= appended.run_length_reached;

            if self.mode == CaptureMode::Continuous {
                past_run_length |= self.store.append_data(&column_id, samples, run_length).run_length_reached;
            }
        }
        // Single-read sessions end on their quota, not on the time axis.
        outcome.run_length_reached = past_run_length && self.mode == CaptureMode::Continuous;

        if self.mode == CaptureMode::SingleRead && self.store.has_pending_data_points() {
            let live = self.live_values();
            outcome.quota_reached = self.store.record_one_data_point_if_needed(&live, now);
        }

        if outcome.run_length_reached && self.collecting {
            tracing::info!("Run length of {}s reached", run_length);
        }
        outcome
    }

    pub fn on_collection_stopped(&mut self) {
        tracing::info!("Sensor collection stopped");
        self.collecting = false;
    }

    pub fn on_disconnect(&mut self) {
        tracing::info!("Sensor disconnected");
        match_sensors_to_columns(&mut self.slots, None);
        self.detector.clear();
        self.device_config = None;
        self.collecting = false;
    }

    /// Clear slot data and start fresh recordings for every bound slot.
    pub fn start_new_run(&mut self, mode: CaptureMode) {
        for slot in &mut self.slots {
            slot.clear_data();
        }
        let recordings = self
            .slots
            .iter()
            .filter_map(|slot| Recording::for_binding(&slot.binding, self.recording_precision(&slot.binding)))
            .collect::<Vec<_>>();
        tracing::info!("Starting {:?} run with {} recordings", mode, recordings.len());

        self.store.start_new_recordings(recordings);
        self.mode = mode;
        self.collecting = true;
    }

    /// Tare the slot at `index` against its current live value.
    pub fn zero_sensor(&mut self, index: usize) -> Option<f64> {
        let slot = self.slots.get_mut(index)?;
        if !slot.binding.is_connected() {
            return None;
        }
        if !slot.binding.definition.tareable {
            tracing::info!(
                "Slot {} ({}) is not tareable",
                index,
                slot.binding.definition.measurement_name
            );
            return None;
        }

        let tare = slot.zero_sensor()?;
        if let Some(column_id) = slot.binding.column_id.as_deref() {
            self.store.set_tare(column_id, tare);
        }
        tracing::info!("Slot {} zeroed at {}", index, tare);
        Some(tare)
    }

    /// Request `count` single-shot captures. An existing single-read session
    /// is resumed with its recordings and first-capture time kept; any other
    /// state starts a new single-read run. Returns whether the device has to
    /// be started.
    pub fn request_single_reads(&mut self, count: usize) -> bool {
        let needs_start = !self.collecting;
        if self.mode != CaptureMode::SingleRead || self.store.recordings().is_empty() {
            self.start_new_run(CaptureMode::SingleRead);
        } else if needs_start {
            // The device clock restarts with every collection.
            for slot in &mut self.slots {
                slot.clear_data();
            }
            self.collecting = true;
            tracing::info!("Resuming single-read session");
        }
        self.store.request_data_points(count);
        needs_start
    }

    /// Drop recorded data from slots and the store, keeping bindings and tares.
    pub fn clear_recordings(&mut self) {
        for slot in &mut self.slots {
            slot.clear_data();
        }
        self.store.clear_data();
    }

    pub fn set_run_length(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.pipeline.run_length = seconds;
        }
    }

    pub fn slots(&self) -> &[SensorSlot; SLOT_COUNT] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&SensorSlot> {
        self.slots.get(index)
    }

    pub fn recordings(&self) -> &[Recording] {
        self.store.recordings()
    }

    pub fn store(&self) -> &SensorRecordingStore {
        &self.store
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn device_config(&self) -> Option<&DeviceConfig> {
        self.device_config.as_ref()
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Whether the column bound to slot `index` is repeating a frozen snapshot.
    pub fn is_slot_stuck(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .and_then(|slot| slot.binding.column_id.as_deref())
            .is_some_and(|id| self.detector.is_stuck(id))
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Display precision for a slot: from observed data once there is some,
    /// otherwise from the sensor's nominal range.
    pub fn display_precision(&self, slot: &SensorSlot) -> u32 {
        let range = match slot.value_range() {
            Some((min, max)) if max > min => max - min,
            _ => slot.binding.definition.range(),
        };
        get_fix_value(range, self.pipeline.precision_divisor)
    }

    fn recording_precision(&self, binding: &SensorBinding) -> u32 {
        get_fix_value(binding.definition.range(), self.pipeline.precision_divisor)
    }

    fn rebind(&mut self, config: DeviceConfig) {
        let previous: Vec<SensorBinding> = self.slots.iter().map(|s| s.binding.clone()).collect();

        match_sensors_to_columns(&mut self.slots, Some(&config.data_columns));

        for slot in &self.slots {
            let Some(column_id) = slot.binding.column_id.as_deref() else {
                continue;
            };
            if previous.iter().any(|b| b.column_id.as_deref() == Some(column_id)) {
                continue;
            }

            let unit = slot.binding.unit.as_deref().unwrap_or_default();
            if definition_for_unit(unit).is_none() {
                tracing::warn!(
                    "Slot {} bound to column {} with unknown unit {:?}",
                    slot.index,
                    column_id,
                    unit
                );
            }

            // Same physical sensor under a new id: keep its recording attached.
            let renamed = previous.iter().find(|b| {
                b.position == slot.binding.position && b.unit == slot.binding.unit
            });
            if let Some(old_id) = renamed.and_then(|b| b.column_id.as_deref()) {
                self.store.rename_column(old_id, column_id);
            }
        }

        for binding in &previous {
            if let Some(old_id) = binding.column_id.as_deref() {
                if config.column_by_id(old_id).is_none() {
                    self.detector.forget(old_id);
                }
            }
        }

        self.device_config = Some(config);
    }

    fn live_values(&self) -> HashMap<String, f64> {
        self.slots
            .iter()
            .filter_map(|slot| {
                let column_id = slot.binding.column_id.clone()?;
                let value = slot.binding.heartbeat_value.or(slot.binding.sensor_value)?;
                Some((column_id, value))
            })
            .collect()
    }
}

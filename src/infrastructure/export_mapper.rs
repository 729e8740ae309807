// Mapper from service state to the shapes served to rendering and export clients
use crate::application::down_sampler::down_sample;
use crate::application::format::{format_fixed_value, get_axis_fix, Axis};
use crate::application::sensor_service::SensorService;
use crate::application::time_series_merger::merge;
use crate::domain::recording::{Recording, SensorRecordingStore};
use crate::domain::sensor::DataColumn;
use crate::domain::slot::SensorSlot;
use crate::domain::telemetry::{MergedRow, Sample, SeriesData};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub index: usize,
    pub connected: bool,
    pub column_id: Option<String>,
    pub unit: Option<String>,
    pub measurement_name: String,
    pub precision: u32,
    pub live_value: String,
    pub tare_value: f64,
    pub tareable: bool,
    pub sample_count: usize,
    pub stuck: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub exported_at: String,
    pub run_length: f64,
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedSeriesView {
    pub names: Vec<String>,
    pub rows: Vec<MergedRow>,
    /// Tick-label precision for the time axis
    pub x_precision: u32,
    /// Tick-label precision for the value axis
    pub y_precision: u32,
}

/// Pixel size of the plot the merged series will be drawn into.
#[derive(Debug, Clone, Copy)]
pub struct PlotExtent {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub name: String,
    pub connected: bool,
    pub collecting: bool,
    pub columns: Vec<DataColumn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleReadStatus {
    pub requested: usize,
    pub recorded: usize,
}

pub fn slot_views(service: &SensorService) -> Vec<SlotView> {
    service
        .slots()
        .iter()
        .map(|slot| {
            let binding = &slot.binding;
            let precision = service.display_precision(slot);
            SlotView {
                index: slot.index,
                connected: binding.is_connected(),
                column_id: binding.column_id.clone(),
                unit: binding.unit.clone(),
                measurement_name: binding.definition.measurement_name.clone(),
                precision,
                live_value: format_fixed_value(
                    slot.tared_live_value(),
                    precision,
                    binding.unit.as_deref().unwrap_or_default(),
                    true,
                ),
                tare_value: binding.tare_value,
                tareable: binding.definition.tareable,
                sample_count: slot.recorded_samples.len(),
                stuck: service.is_slot_stuck(slot.index),
            }
        })
        .collect()
}

/// Copy of `recording` with its data reduced to `budget` points.
pub fn recording_for_export(recording: &Recording, budget: usize) -> Recording {
    Recording {
        data: down_sample(&recording.data, budget).into_owned(),
        ..recording.clone()
    }
}

pub fn export_document(service: &SensorService) -> ExportDocument {
    let budget = service.pipeline().down_sample_budget;
    ExportDocument {
        exported_at: chrono::Utc::now().to_rfc3339(),
        run_length: service.pipeline().run_length,
        recordings: service
            .recordings()
            .iter()
            .map(|r| recording_for_export(r, budget))
            .collect(),
    }
}

pub fn device_view(name: &str, service: &SensorService) -> DeviceView {
    DeviceView {
        name: name.to_string(),
        connected: service.device_config().is_some(),
        collecting: service.is_collecting(),
        columns: service
            .device_config()
            .map(|config| config.data_columns.clone())
            .unwrap_or_default(),
    }
}

pub fn single_read_status(store: &SensorRecordingStore) -> SingleReadStatus {
    SingleReadStatus {
        requested: store.num_requested_data_points(),
        recorded: store.num_recorded_data_points(),
    }
}

/// Merge a slot's live samples with preloaded/predicted series, down-sampling
/// the live run first. Series without data are left out of both names and rows.
pub fn merged_series(
    slot: &SensorSlot,
    others: &[SeriesData],
    budget: usize,
    extent: PlotExtent,
) -> MergedSeriesView {
    let live = down_sample(&slot.recorded_samples, budget);
    let live_name = slot.binding.definition.measurement_name.clone();

    let sources: Vec<(String, &[Sample])> = std::iter::once((live_name, &*live))
        .chain(others.iter().map(|s| (s.name.clone(), s.data.as_slice())))
        .filter(|(_, data)| !data.is_empty())
        .collect();

    let series: Vec<&[Sample]> = sources.iter().map(|(_, data)| *data).collect();
    let rows = merge(&series);

    let x_range = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => last.time - first.time,
        _ => 0.0,
    };
    let (y_min, y_max) = rows
        .iter()
        .flat_map(|row| row.values.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| (min.min(v), max.max(v)));

    MergedSeriesView {
        names: sources.into_iter().map(|(name, _)| name).collect(),
        x_precision: get_axis_fix(Axis::X, x_range, extent.width),
        y_precision: get_axis_fix(Axis::Y, y_max - y_min, extent.height),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensor::SensorBinding;
    use crate::domain::telemetry::SeriesKind;
    use crate::infrastructure::config::PipelineConfig;

    fn bound_slot() -> SensorSlot {
        let mut slot = SensorSlot::new(0);
        let mut binding = SensorBinding::from_column(
            &DataColumn::new("900", 0, "N").with_live_value("12.5", Some(1)),
            &SensorBinding::default(),
        );
        binding.tare_value = 2.5;
        slot.set_binding(binding);
        slot
    }

    #[test]
    fn test_recording_for_export_down_samples() {
        let mut recording = Recording::for_binding(&bound_slot().binding, 2).unwrap();
        recording.data = (0..1000).map(|i| Sample::new(i as f64, i as f64)).collect();

        let exported = recording_for_export(&recording, 100);
        assert_eq!(exported.data.len(), 100);
        assert_eq!(exported.column_id, "900");
        assert_eq!(recording.data.len(), 1000);
    }

    #[test]
    fn test_merged_series_skips_empty_sources() {
        let mut slot = bound_slot();
        slot.append_data(&[Sample::new(1.0, 3.5), Sample::new(3.0, 4.5)], 20.0);
        let others = vec![
            SeriesData::new("Yesterday".to_string(), SeriesKind::Preloaded, vec![Sample::new(2.0, 2.0)]),
            SeriesData::new("Model".to_string(), SeriesKind::Prediction, Vec::new()),
        ];

        let extent = PlotExtent { width: 300.0, height: 300.0 };
        let view = merged_series(&slot, &others, 600, extent);
        assert_eq!(view.names, vec!["Force".to_string(), "Yesterday".to_string()]);
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.rows[1], MergedRow::new(2.0, vec![1.5, 2.0]));
        // Times span 2s over 10 ticks, values span 1.0..2.0.
        assert_eq!(view.x_precision, 1);
        assert_eq!(view.y_precision, 1);
    }

    #[test]
    fn test_merged_series_without_data() {
        let view = merged_series(&SensorSlot::new(1), &[], 600, PlotExtent { width: 800.0, height: 600.0 });
        assert!(view.names.is_empty());
        assert!(view.rows.is_empty());
        assert_eq!(view.y_precision, 2);
    }

    #[test]
    fn test_device_view_and_single_read_status() {
        let mut service = SensorService::new(PipelineConfig::default());
        assert!(!device_view("sim", &service).connected);

        service.on_sensor_connect(crate::domain::sensor::DeviceConfig::new(
            vec![DataColumn::new("900", 0, "N")],
            true,
        ));
        service.request_single_reads(2);
        let view = device_view("sim", &service);
        assert!(view.connected);
        assert_eq!(view.columns.len(), 1);

        let status = single_read_status(service.store());
        assert_eq!((status.requested, status.recorded), (2, 0));
    }

    #[test]
    fn test_slot_views() {
        let mut service = SensorService::new(PipelineConfig::default());
        service.on_sensor_connect(crate::domain::sensor::DeviceConfig::new(
            vec![DataColumn::new("900", 0, "N").with_live_value("12.5", Some(1))],
            true,
        ));

        let views = slot_views(&service);
        assert_eq!(views.len(), 2);
        assert!(views[0].connected);
        assert_eq!(views[0].live_value, "12.50 N");
        assert!(!views[1].connected);
        assert_eq!(views[1].live_value, "");
    }

    #[test]
    fn test_export_document_serializes() {
        let service = SensorService::new(PipelineConfig::default());
        let json = serde_json::to_value(export_document(&service)).unwrap();
        assert_eq!(json["runLength"], 20.0);
        assert!(json["recordings"].as_array().unwrap().is_empty());
        assert!(json["exportedAt"].is_string());
    }
}

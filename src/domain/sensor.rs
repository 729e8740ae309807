// Device columns and the slot-side binding to them
use super::measurement::MeasurementDefinition;
use serde::{Deserialize, Serialize};

/// A column as enumerated by a device manager. `id` may change on every
/// reconnect or collection; `position` is stable for a physical device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataColumn {
    pub id: String,
    pub position: i32,
    pub unit: String,
    #[serde(default)]
    pub live_value: String,
    #[serde(default)]
    pub live_value_timestamp: Option<i64>,
}

impl DataColumn {
    pub fn new(id: &str, position: i32, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            position,
            unit: unit.to_string(),
            live_value: String::new(),
            live_value_timestamp: None,
        }
    }

    pub fn with_live_value(mut self, live_value: &str, timestamp: Option<i64>) -> Self {
        self.live_value = live_value.to_string();
        self.live_value_timestamp = timestamp;
        self
    }

    /// The live value parsed as a number, if the device reported one.
    pub fn live_reading(&self) -> Option<f64> {
        self.live_value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

/// Snapshot of a device's configuration delivered with connect/status events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    #[serde(default)]
    pub data_columns: Vec<DataColumn>,
    #[serde(default)]
    pub has_interface: bool,
}

impl DeviceConfig {
    pub fn new(data_columns: Vec<DataColumn>, has_interface: bool) -> Self {
        Self {
            data_columns,
            has_interface,
        }
    }

    pub fn column_by_id(&self, id: &str) -> Option<&DataColumn> {
        self.data_columns.iter().find(|c| c.id == id)
    }
}

/// The association between a slot and a device column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorBinding {
    pub column_id: Option<String>,
    pub position: Option<i32>,
    pub unit: Option<String>,
    pub tare_value: f64,
    pub definition: MeasurementDefinition,
    /// Latest live value from a status snapshot.
    pub sensor_value: Option<f64>,
    /// Latest raw value received through a data event.
    pub heartbeat_value: Option<f64>,
}

impl Default for SensorBinding {
    fn default() -> Self {
        Self {
            column_id: None,
            position: None,
            unit: None,
            tare_value: 0.0,
            definition: MeasurementDefinition::fallback(None),
            sensor_value: None,
            heartbeat_value: None,
        }
    }
}

impl SensorBinding {
    /// Bind to `column`. The tare offset survives only when the unit is unchanged.
    pub fn from_column(column: &DataColumn, prior: &SensorBinding) -> Self {
        let same_unit = prior.unit.as_deref() == Some(column.unit.as_str());
        Self {
            column_id: Some(column.id.clone()),
            position: Some(column.position),
            unit: Some(column.unit.clone()),
            tare_value: if same_unit { prior.tare_value } else { 0.0 },
            definition: MeasurementDefinition::for_unit(Some(&column.unit)),
            sensor_value: column.live_reading(),
            heartbeat_value: if same_unit { prior.heartbeat_value } else { None },
        }
    }

    pub fn is_connected(&self) -> bool {
        self.column_id.is_some() && self.unit.is_some()
    }
}

// Measurement definitions keyed by the unit a device column reports
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementDefinition {
    pub unit: String,
    pub measurement_name: String,
    pub reading_name: String,
    pub min_reading: f64,
    pub max_reading: f64,
    pub tareable: bool,
}

impl MeasurementDefinition {
    fn new(
        unit: &str,
        measurement_name: &str,
        reading_name: &str,
        min_reading: f64,
        max_reading: f64,
        tareable: bool,
    ) -> Self {
        Self {
            unit: unit.to_string(),
            measurement_name: measurement_name.to_string(),
            reading_name: reading_name.to_string(),
            min_reading,
            max_reading,
            tareable,
        }
    }

    /// Generic definition shown for units missing from the table.
    pub fn fallback(unit: Option<&str>) -> Self {
        Self::new(unit.unwrap_or(""), "Sensor Reading", "Sensor Reading", 0.0, 100.0, false)
    }

    /// Definition for `unit`, or the fallback when the unit is absent or unknown.
    pub fn for_unit(unit: Option<&str>) -> Self {
        unit.and_then(definition_for_unit)
            .unwrap_or_else(|| Self::fallback(unit))
    }

    pub fn range(&self) -> f64 {
        self.max_reading - self.min_reading
    }
}

/// Look up the static definition for a device unit string.
pub fn definition_for_unit(unit: &str) -> Option<MeasurementDefinition> {
    let def = match unit {
        "degC" => MeasurementDefinition::new(unit, "Temperature", "Temperature", -40.0, 125.0, false),
        "degF" => MeasurementDefinition::new(unit, "Temperature", "Temperature", -40.0, 257.0, false),
        "m" => MeasurementDefinition::new(unit, "Position", "Distance", 0.15, 4.0, true),
        "m/s" => MeasurementDefinition::new(unit, "Velocity", "Velocity", -2.0, 2.0, false),
        "m/s²" | "m/s^2" => {
            MeasurementDefinition::new(unit, "Acceleration", "Acceleration", -20.0, 20.0, true)
        }
        "N" => MeasurementDefinition::new(unit, "Force", "Force", -50.0, 50.0, true),
        "lux" => MeasurementDefinition::new(unit, "Light Level", "Illuminance", 0.0, 10000.0, false),
        "%RH" => MeasurementDefinition::new(unit, "Relative Humidity", "Humidity", 0.0, 100.0, false),
        "pH" => MeasurementDefinition::new(unit, "pH", "pH", 0.0, 14.0, false),
        "ppm" => MeasurementDefinition::new(unit, "CO2 Concentration", "CO2", 0.0, 10000.0, false),
        "kPa" => MeasurementDefinition::new(unit, "Pressure", "Gas Pressure", 0.0, 400.0, true),
        "V" => MeasurementDefinition::new(unit, "Voltage", "Potential", -10.0, 10.0, true),
        "A" => MeasurementDefinition::new(unit, "Current", "Current", -1.0, 1.0, true),
        "dB" => MeasurementDefinition::new(unit, "Sound Level", "Sound Level", 55.0, 110.0, false),
        "J" => MeasurementDefinition::new(unit, "Energy", "Energy", 0.0, 100.0, true),
        "W" => MeasurementDefinition::new(unit, "Power", "Power", 0.0, 100.0, true),
        "g" => MeasurementDefinition::new(unit, "Mass", "Mass", 0.0, 500.0, true),
        "mg/L" => MeasurementDefinition::new(unit, "Dissolved Oxygen", "Oxygen", 0.0, 15.0, false),
        "%" => MeasurementDefinition::new(unit, "Percentage", "Percent", 0.0, 100.0, false),
        _ => return None,
    };
    Some(def)
}

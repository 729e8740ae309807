// Domain layer - Sensor data model and accumulators
pub mod measurement;
pub mod recording;
pub mod sensor;
pub mod slot;
pub mod telemetry;

// Application layer - Telemetry pipeline and event handling
pub mod device_manager;
pub mod down_sampler;
pub mod event_dispatch;
pub mod format;
pub mod sensor_service;
pub mod slot_matcher;
pub mod stuck_sensor;
pub mod time_series_merger;

// Presentation layer - HTTP surface over the sensor service
pub mod app_state;
pub mod handlers;

// Infrastructure layer - External dependencies and adapters
pub mod chunked_stream;
pub mod config;
pub mod export_mapper;
pub mod http_response;
pub mod preloaded_series;
pub mod simulated_device;

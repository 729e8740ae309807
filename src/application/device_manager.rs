// Device manager seam - events in, collection commands out
use crate::domain::sensor::DeviceConfig;
use crate::domain::telemetry::Sample;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// New samples per column id, as delivered by one data event.
pub type SensorData = HashMap<String, Vec<Sample>>;

/// Discrete events a device manager emits, delivered one at a time.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Connect(DeviceConfig),
    Status(DeviceConfig),
    Data(SensorData),
    CollectionStopped,
    Disconnect,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device {0} is not connected")]
    NotConnected(String),
    #[error("device {0} is already collecting")]
    AlreadyCollecting(String),
    #[error("event channel closed")]
    ChannelClosed,
}

#[async_trait]
pub trait DeviceManager: Send + Sync {
    /// Human-readable name of the device or transport
    fn name(&self) -> &str;

    /// Connect and begin emitting status events
    async fn connect(&self) -> Result<(), DeviceError>;

    /// Start a collection run; data events follow
    async fn start_collecting(&self) -> Result<(), DeviceError>;

    /// Stop the current run; a CollectionStopped event follows
    async fn stop_collecting(&self) -> Result<(), DeviceError>;

    /// Disconnect; a Disconnect event follows
    async fn disconnect(&self) -> Result<(), DeviceError>;
}

// Simulated device manager - synthetic waveforms with unstable column ids
use crate::application::device_manager::{DeviceError, DeviceEvent, DeviceManager, SensorData};
use crate::domain::sensor::{DataColumn, DeviceConfig};
use crate::domain::telemetry::Sample;
use crate::infrastructure::config::{SimulatedColumnConfig, SimulatorConfig};
use async_trait::async_trait;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Status snapshots are sent once per this many data polls.
const STATUS_EVERY_POLLS: u32 = 5;

struct Waveforms {
    columns: Vec<SimulatedColumnConfig>,
    connected_at: Instant,
}

impl Waveforms {
    fn value_at(column: &SimulatedColumnConfig, seconds: f64) -> f64 {
        let period = if column.period_secs > 0.0 { column.period_secs } else { 1.0 };
        column.offset + column.amplitude * (TAU * seconds / period).sin()
    }

    /// Columns as enumerated for `enumeration`; ids change with every enumeration.
    fn device_config(&self, enumeration: u32) -> DeviceConfig {
        let elapsed = self.connected_at.elapsed();
        let timestamp = elapsed.as_millis() as i64;
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let value = Self::value_at(c, elapsed.as_secs_f64());
                DataColumn::new(&column_id(enumeration, c.position), c.position, &c.unit)
                    .with_live_value(&format!("{:.3}", value), Some(timestamp))
            })
            .collect();
        DeviceConfig::new(columns, true)
    }
}

fn column_id(enumeration: u32, position: i32) -> String {
    format!("{}{:02}", 9 + enumeration, position)
}

#[derive(Default)]
struct SimState {
    /// Present while connected
    waveforms: Option<Arc<Waveforms>>,
    enumeration: u32,
    status_task: Option<JoinHandle<()>>,
    collect_task: Option<JoinHandle<()>>,
}

pub struct SimulatedDeviceManager {
    name: String,
    poll_interval: Duration,
    columns: Vec<SimulatedColumnConfig>,
    events: mpsc::Sender<DeviceEvent>,
    state: Mutex<SimState>,
}

impl SimulatedDeviceManager {
    pub fn new(config: &SimulatorConfig, events: mpsc::Sender<DeviceEvent>) -> Self {
        Self {
            name: config.name.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            columns: config.columns.clone(),
            events,
            state: Mutex::new(SimState::default()),
        }
    }

    async fn send(&self, event: DeviceEvent) -> Result<(), DeviceError> {
        self.events.send(event).await.map_err(|_| DeviceError::ChannelClosed)
    }

    fn spawn_status_task(&self, waveforms: Arc<Waveforms>, enumeration: u32) -> JoinHandle<()> {
        let events = self.events.clone();
        let period = self.poll_interval * STATUS_EVERY_POLLS;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if events.send(DeviceEvent::Status(waveforms.device_config(enumeration))).await.is_err() {
                    break;
                }
            }
        })
    }

    fn spawn_collect_task(&self, waveforms: Arc<Waveforms>, enumeration: u32) -> JoinHandle<()> {
        let events = self.events.clone();
        let period = self.poll_interval;
        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let t = started.elapsed().as_secs_f64();
                let data: SensorData = waveforms
                    .columns
                    .iter()
                    .map(|c| {
                        let sample = Sample::new(t, Waveforms::value_at(c, t));
                        (column_id(enumeration, c.position), vec![sample])
                    })
                    .collect();
                if events.send(DeviceEvent::Data(data)).await.is_err() {
                    break;
                }
            }
        })
    }
}

#[async_trait]
impl DeviceManager for SimulatedDeviceManager {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock().await;
        if state.waveforms.is_some() {
            return Ok(());
        }

        let waveforms = Arc::new(Waveforms {
            columns: self.columns.clone(),
            connected_at: Instant::now(),
        });
        state.waveforms = Some(waveforms.clone());

        self.send(DeviceEvent::Connect(waveforms.device_config(state.enumeration))).await?;
        state.status_task = Some(self.spawn_status_task(waveforms, state.enumeration));
        tracing::info!("{} connected", self.name);
        Ok(())
    }

    async fn start_collecting(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock().await;
        let Some(waveforms) = state.waveforms.clone() else {
            return Err(DeviceError::NotConnected(self.name.clone()));
        };
        if state.collect_task.is_some() {
            return Err(DeviceError::AlreadyCollecting(self.name.clone()));
        }

        // Every collection re-enumerates the columns under fresh ids.
        state.enumeration += 1;
        if let Some(task) = state.status_task.take() {
            task.abort();
        }
        self.send(DeviceEvent::Status(waveforms.device_config(state.enumeration))).await?;

        state.status_task = Some(self.spawn_status_task(waveforms.clone(), state.enumeration));
        state.collect_task = Some(self.spawn_collect_task(waveforms, state.enumeration));
        tracing::info!("{} collecting (enumeration {})", self.name, state.enumeration);
        Ok(())
    }

    async fn stop_collecting(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock().await;
        let Some(task) = state.collect_task.take() else {
            return Ok(());
        };
        task.abort();
        self.send(DeviceEvent::CollectionStopped).await
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock().await;
        if state.waveforms.take().is_none() {
            return Ok(());
        }
        for task in [state.collect_task.take(), state.status_task.take()].into_iter().flatten() {
            task.abort();
        }
        self.send(DeviceEvent::Disconnect).await
    }
}

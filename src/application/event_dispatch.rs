// Single-consumer dispatch of device events into the sensor service
use crate::application::device_manager::{DeviceEvent, DeviceManager};
use crate::application::sensor_service::SensorService;
use crate::domain::telemetry::Sample;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, Mutex};

pub type SharedSensorService = Arc<Mutex<SensorService>>;

/// Newly recorded, tare-adjusted samples for one slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUpdate {
    pub slot: usize,
    pub column_id: String,
    pub unit: String,
    pub samples: Vec<Sample>,
}

/// Apply one event and collect the live updates it produced. Returns
/// whether the run should be stopped.
pub fn apply_event(service: &mut SensorService, event: DeviceEvent, now: Instant) -> (Vec<LiveUpdate>, bool) {
    match event {
        DeviceEvent::Connect(config) => service.on_sensor_connect(config),
        DeviceEvent::Status(config) => service.on_sensor_status(config),
        DeviceEvent::CollectionStopped => service.on_collection_stopped(),
        DeviceEvent::Disconnect => service.on_disconnect(),
        DeviceEvent::Data(data) => {
            let outcome = service.on_sensor_data(&data, now);
            let updates = service
                .slots()
                .iter()
                .filter(|slot| outcome.appended[slot.index] > 0)
                .filter_map(|slot| {
                    let samples = &slot.recorded_samples;
                    let start = samples.len() - outcome.appended[slot.index];
                    Some(LiveUpdate {
                        slot: slot.index,
                        column_id: slot.binding.column_id.clone()?,
                        unit: slot.binding.unit.clone().unwrap_or_default(),
                        samples: samples[start..].to_vec(),
                    })
                })
                .collect();
            let stop = service.is_collecting() && (outcome.run_length_reached || outcome.quota_reached);
            return (updates, stop);
        }
    }
    (Vec::new(), false)
}

/// Drain `events` until the channel closes, one event at a time.
pub async fn dispatch_events(
    service: SharedSensorService,
    mut events: mpsc::Receiver<DeviceEvent>,
    device: Arc<dyn DeviceManager>,
    updates: broadcast::Sender<LiveUpdate>,
) {
    while let Some(event) = events.recv().await {
        let (live, stop) = {
            let mut service = service.lock().await;
            apply_event(&mut service, event, Instant::now())
        };

        for update in live {
            // No subscribers is fine.
            let _ = updates.send(update);
        }

        // The device reports the stop through this same channel, so it must
        // not be awaited from the dispatch loop.
        if stop {
            let device = device.clone();
            tokio::spawn(async move {
                if let Err(e) = device.stop_collecting().await {
                    tracing::error!("Failed to stop collection on {}: {}", device.name(), e);
                }
            });
        }
    }
    tracing::debug!("Device event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device_manager::DeviceError;
    use crate::application::sensor_service::CaptureMode;
    use crate::domain::sensor::{DataColumn, DeviceConfig};
    use crate::infrastructure::config::PipelineConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDevice {
        stops: AtomicUsize,
    }

    #[async_trait]
    impl DeviceManager for CountingDevice {
        fn name(&self) -> &str {
            "counting"
        }
        async fn connect(&self) -> Result<(), DeviceError> {
            Ok(())
        }
        async fn start_collecting(&self) -> Result<(), DeviceError> {
            Ok(())
        }
        async fn stop_collecting(&self) -> Result<(), DeviceError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn disconnect(&self) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    fn connect_event() -> DeviceEvent {
        DeviceEvent::Connect(DeviceConfig::new(vec![DataColumn::new("900", 0, "N")], true))
    }

    fn data_event(pairs: &[(f64, f64)]) -> DeviceEvent {
        let samples = pairs.iter().copied().map(Sample::from).collect();
        DeviceEvent::Data([("900".to_string(), samples)].into_iter().collect())
    }

    #[test]
    fn test_apply_event_reports_new_samples() {
        let mut service = SensorService::new(PipelineConfig::default());
        apply_event(&mut service, connect_event(), Instant::now());
        service.start_new_run(CaptureMode::Continuous);

        let (updates, stop) = apply_event(&mut service, data_event(&[(0.0, 1.0), (0.1, 2.0)]), Instant::now());
        assert!(!stop);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].column_id, "900");
        assert_eq!(updates[0].samples.len(), 2);

        let (updates, _) = apply_event(&mut service, data_event(&[(0.2, 3.0)]), Instant::now());
        assert_eq!(updates[0].samples, vec![Sample::new(0.2, 3.0)]);
    }

    #[test]
    fn test_single_read_session_is_not_stopped_by_run_length() {
        let mut service = SensorService::new(PipelineConfig::default());
        apply_event(&mut service, connect_event(), Instant::now());
        service.request_single_reads(1);

        let (_, stop) = apply_event(&mut service, data_event(&[(0.0, 1.0)]), Instant::now());
        assert!(stop);
        service.on_collection_stopped();

        // No pending request; streaming past the run length keeps going.
        service.request_single_reads(1);
        apply_event(&mut service, data_event(&[(0.0, 2.0)]), Instant::now());
        let (_, stop) = apply_event(&mut service, data_event(&[(45.0, 3.0)]), Instant::now());
        assert!(!stop);
        assert!(service.is_collecting());
    }

    #[tokio::test]
    async fn test_dispatch_stops_at_run_length() {
        let service: SharedSensorService = Arc::new(Mutex::new(SensorService::new(PipelineConfig {
            run_length: 1.0,
            ..PipelineConfig::default()
        })));
        let device = Arc::new(CountingDevice::default());
        let (tx, rx) = mpsc::channel(8);
        let (updates_tx, mut updates_rx) = broadcast::channel(8);

        {
            let mut service = service.lock().await;
            apply_event(&mut service, connect_event(), Instant::now());
            service.start_new_run(CaptureMode::Continuous);
        }
        tx.send(data_event(&[(0.5, 1.0), (1.5, 2.0)])).await.unwrap();
        drop(tx);

        dispatch_events(service.clone(), rx, device.clone(), updates_tx).await;

        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while device.stops.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(device.stops.load(Ordering::SeqCst), 1);
        let update = updates_rx.recv().await.unwrap();
        assert_eq!(update.samples, vec![Sample::new(0.5, 1.0)]);
    }
}

//! Drives a sensor sample stream through the classifier and notifies a consumer.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ClassifierState, SignalClassifier};
use crate::domain::{AnomalyEvent, AnomalyKind, MotionSample};
use crate::GuardianError;

/// Receiver of classified anomalies.
///
/// Callbacks run synchronously on the monitor's driving task and should
/// return quickly. All methods default to no-ops.
pub trait AnomalyConsumer: Send + Sync {
    /// A sprint was detected
    fn on_sprint(&self, _event: &AnomalyEvent) {}

    /// Fast movement stopped abruptly
    fn on_sudden_halt(&self, _event: &AnomalyEvent) {}

    /// The subject has been still for the configured duration
    fn on_prolonged_stationary(&self, _event: &AnomalyEvent) {}

    /// Unusual rotation or a running cadence
    fn on_abnormal_movement(&self, _kind: AnomalyKind, _confidence: f64) {}
}

/// Route one event to the matching consumer callback
pub fn notify(consumer: &dyn AnomalyConsumer, event: &AnomalyEvent) {
    match event.kind {
        AnomalyKind::Sprint => consumer.on_sprint(event),
        AnomalyKind::SuddenHalt => consumer.on_sudden_halt(event),
        AnomalyKind::ProlongedStationary => consumer.on_prolonged_stationary(event),
        AnomalyKind::UnusualRotation | AnomalyKind::RunningPattern => {
            consumer.on_abnormal_movement(event.kind, event.confidence)
        }
    }
}

/// One monitoring session over a single-producer sensor stream.
///
/// The monitor owns the classifier state; only one stream may be attached
/// at a time.
#[derive(Clone)]
pub struct MotionMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    classifier: SignalClassifier,
    consumer: Arc<dyn AnomalyConsumer>,
    state: Mutex<Tracked>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Classifier state tagged with the stream that owns it.
///
/// `epoch` advances on every start and stop, so a sample still in flight
/// from a detached stream cannot write its state back.
#[derive(Default)]
struct Tracked {
    epoch: u64,
    state: ClassifierState,
}

impl Tracked {
    fn reset(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.state = ClassifierState::default();
        self.epoch
    }
}

impl MotionMonitor {
    /// Create a monitor feeding `consumer`
    pub fn new(classifier: SignalClassifier, consumer: Arc<dyn AnomalyConsumer>) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                classifier,
                consumer,
                state: Mutex::new(Tracked::default()),
                task: Mutex::new(None),
            }),
        }
    }

    /// Classify one sample and notify the consumer.
    ///
    /// Returns the events that were emitted.
    pub fn feed(&self, sample: &MotionSample) -> Vec<AnomalyEvent> {
        self.feed_for(None, sample)
    }

    /// Classify on behalf of the stream started at `epoch`; a stale stream
    /// is dropped without touching state or the consumer.
    fn feed_for(&self, epoch: Option<u64>, sample: &MotionSample) -> Vec<AnomalyEvent> {
        let events = {
            let mut tracked = self.inner.state.lock();
            if epoch.map_or(false, |e| e != tracked.epoch) {
                return Vec::new();
            }
            let (events, next) = self
                .inner
                .classifier
                .classify(sample, std::mem::take(&mut tracked.state));
            tracked.state = next;
            events
        };

        for event in &events {
            notify(self.inner.consumer.as_ref(), event);
        }
        events
    }

    /// Attach a sample stream and consume it on a background task.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// [`GuardianError::MonitorRunning`] if a stream is already attached.
    pub fn start(&self, mut samples: mpsc::Receiver<MotionSample>) -> Result<(), GuardianError> {
        let mut task = self.inner.task.lock();
        if task.as_ref().map_or(false, |handle| !handle.is_finished()) {
            tracing::warn!("Motion monitoring already active; ignoring second start");
            return Err(GuardianError::MonitorRunning);
        }

        let epoch = self.inner.state.lock().reset();

        let monitor = self.clone();
        *task = Some(tokio::spawn(async move {
            let mut processed: u64 = 0;
            while let Some(sample) = samples.recv().await {
                monitor.feed_for(Some(epoch), &sample);
                processed += 1;
            }
            tracing::info!(processed, "Sensor stream closed");
        }));

        tracing::info!(epoch, "Motion monitoring started");
        Ok(())
    }

    /// Detach the current stream, if any. Returns whether one was attached.
    pub fn stop(&self) -> bool {
        let handle = self.inner.task.lock().take();
        self.inner.state.lock().reset();
        match handle {
            Some(handle) => {
                handle.abort();
                tracing::info!("Motion monitoring stopped");
                true
            }
            None => false,
        }
    }

    /// Whether a stream is attached and still being consumed
    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Snapshot of the classifier state
    pub fn state(&self) -> ClassifierState {
        self.inner.state.lock().state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl AnomalyConsumer for Recorder {
        fn on_sprint(&self, _event: &AnomalyEvent) {
            self.calls.lock().push("sprint".into());
        }

        fn on_sudden_halt(&self, _event: &AnomalyEvent) {
            self.calls.lock().push("halt".into());
        }

        fn on_prolonged_stationary(&self, _event: &AnomalyEvent) {
            self.calls.lock().push("stationary".into());
        }

        fn on_abnormal_movement(&self, kind: AnomalyKind, _confidence: f64) {
            self.calls.lock().push(format!("abnormal:{}", kind));
        }
    }

    fn monitor() -> (MotionMonitor, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let monitor = MotionMonitor::new(SignalClassifier::with_defaults(), recorder.clone());
        (monitor, recorder)
    }

    #[test]
    fn test_feed_routes_callbacks() {
        let (monitor, recorder) = monitor();
        monitor.feed(&MotionSample::accelerometer(0, 9.0, 0.0, 0.0));
        monitor.feed(&MotionSample::accelerometer(100, 1.0, 0.0, 0.0));
        monitor.feed(&MotionSample::gyroscope(150, 3.0, 0.0, 0.0));
        monitor.feed(&MotionSample::step(200));
        monitor.feed(&MotionSample::step(300));

        assert_eq!(
            *recorder.calls.lock(),
            vec![
                "halt".to_string(),
                "abnormal:UNUSUAL_ROTATION".to_string(),
                "abnormal:RUNNING_PATTERN".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_consumed_and_second_start_rejected() {
        let (monitor, recorder) = monitor();
        let (tx, rx) = mpsc::channel(16);
        monitor.start(rx).unwrap();

        let (_tx2, rx2) = mpsc::channel(16);
        assert!(matches!(monitor.start(rx2), Err(GuardianError::MonitorRunning)));

        tx.send(MotionSample::accelerometer(0, 5.0, 0.0, 0.0)).await.unwrap();
        tx.send(MotionSample::accelerometer(100, 16.0, 0.0, 0.0)).await.unwrap();
        drop(tx);

        for _ in 0..50 {
            if !monitor.is_running() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(!monitor.is_running());
        assert_eq!(*recorder.calls.lock(), vec!["sprint".to_string()]);
    }

    #[tokio::test]
    async fn test_detached_stream_cannot_write_state() {
        let (monitor, recorder) = monitor();
        let (_tx, rx) = mpsc::channel(4);
        monitor.start(rx).unwrap();
        let old_epoch = monitor.inner.state.lock().epoch;
        monitor.stop();

        let (_tx2, rx2) = mpsc::channel(4);
        monitor.start(rx2).unwrap();

        // A sample the first stream was still classifying when it was stopped
        let late = monitor.feed_for(Some(old_epoch), &MotionSample::accelerometer(0, 9.0, 0.0, 0.0));
        assert!(late.is_empty());
        assert_eq!(monitor.state(), ClassifierState::default());

        // Without the stale magnitude, a quiet sample is not a halt
        monitor.feed(&MotionSample::accelerometer(100, 1.0, 0.0, 0.0));
        assert!(recorder.calls.lock().is_empty());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_stop_allows_restart() {
        let (monitor, _recorder) = monitor();
        let (_tx, rx) = mpsc::channel(4);
        monitor.start(rx).unwrap();
        assert!(monitor.stop());
        assert!(!monitor.stop());

        let (_tx2, rx2) = mpsc::channel(4);
        assert!(monitor.start(rx2).is_ok());
        monitor.stop();
    }
}

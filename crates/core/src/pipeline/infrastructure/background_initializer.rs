use std::sync::Arc;
use std::time::Duration;

use crate::detection::domain::detector_initializer::{DetectorInitError, DetectorInitializer};
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::object_detector::ObjectDetector;

pub type InitResult = Result<Box<dyn ObjectDetector>, DetectorInitError>;

/// Receiving end of a detector being built on a worker thread.
///
/// Dropping it abandons the result; the worker then closes the detector it
/// could not hand over.
pub struct PendingDetector {
    rx: crossbeam_channel::Receiver<InitResult>,
}

impl PendingDetector {
    /// Non-blocking poll. `None` while the worker is still busy.
    pub fn try_take(&self) -> Option<InitResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(crossbeam_channel::TryRecvError::Empty) => None,
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                Some(Err(DetectorInitError::WorkerLost))
            }
        }
    }

    /// Block for up to `timeout` waiting for the result.
    pub fn wait(&self, timeout: Duration) -> Option<InitResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Some(Err(DetectorInitError::WorkerLost))
            }
        }
    }
}

/// Run `initializer` once on a dedicated thread.
pub fn spawn_initialization(
    initializer: Arc<dyn DetectorInitializer>,
    options: DetectorOptions,
) -> PendingDetector {
    let (tx, rx) = crossbeam_channel::bounded::<InitResult>(1);
    std::thread::spawn(move || {
        let result = initializer.initialize(&options);
        if let Err(crossbeam_channel::SendError(unclaimed)) = tx.send(result) {
            if let Ok(mut detector) = unclaimed {
                log::info!("Session ended before the detector was ready, closing it");
                if let Err(e) = detector.close() {
                    log::warn!("Failed to close unclaimed detector: {e}");
                }
            }
        }
    });
    PendingDetector { rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::DetectionResult;
    use crate::detection::domain::object_detector::DetectError;
    use crate::shared::frame::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct CountingDetector {
        closes: Arc<AtomicUsize>,
    }

    impl ObjectDetector for CountingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<DetectionResult, DetectError> {
            Ok(DetectionResult::default())
        }

        fn detect_for_video(
            &mut self,
            _frame: &Frame,
            _timestamp_ms: f64,
        ) -> Result<DetectionResult, DetectError> {
            Ok(DetectionResult::default())
        }

        fn close(&mut self) -> Result<(), DetectError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct GatedInitializer {
        gate: crossbeam_channel::Receiver<()>,
        closes: Arc<AtomicUsize>,
        fail: bool,
    }

    impl DetectorInitializer for GatedInitializer {
        fn initialize(
            &self,
            _options: &DetectorOptions,
        ) -> Result<Box<dyn ObjectDetector>, DetectorInitError> {
            let _ = self.gate.recv();
            if self.fail {
                return Err(DetectorInitError::ModelAsset("offline".into()));
            }
            Ok(Box::new(CountingDetector {
                closes: self.closes.clone(),
            }))
        }
    }

    fn gated(fail: bool) -> (crossbeam_channel::Sender<()>, Arc<AtomicUsize>, Arc<dyn DetectorInitializer>) {
        let (gate_tx, gate) = crossbeam_channel::unbounded();
        let closes = Arc::new(AtomicUsize::new(0));
        let init = Arc::new(GatedInitializer {
            gate,
            closes: closes.clone(),
            fail,
        });
        (gate_tx, closes, init)
    }

    #[test]
    fn test_try_take_pending_then_ready() {
        let (gate, _closes, init) = gated(false);
        let pending = spawn_initialization(init, DetectorOptions::default());
        assert!(pending.try_take().is_none());

        gate.send(()).unwrap();
        let result = pending.wait(Duration::from_secs(5)).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_failure_is_delivered() {
        let (gate, _closes, init) = gated(true);
        let pending = spawn_initialization(init, DetectorOptions::default());
        gate.send(()).unwrap();
        let result = pending.wait(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(DetectorInitError::ModelAsset(_))));
    }

    #[test]
    fn test_abandoned_detector_is_closed_by_worker() {
        let (gate, closes, init) = gated(false);
        let pending = spawn_initialization(init, DetectorOptions::default());
        drop(pending);
        gate.send(()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while closes.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}

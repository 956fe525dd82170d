use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, TryLockError,
};

use crate::{
    classifiers::{BlowDetector, BlowReading},
    AudioConfig, EngineHandle, ImagicError, Result,
};

/// Microphone front end for blow detection.
///
/// Clones share one detector, so the capture callback can own a clone while
/// the sensor hub starts and stops it. Buffers pushed while stopped are
/// dropped without analysis.
#[derive(Debug, Clone)]
pub struct AudioMonitor {
    sample_rate: u32,
    block_size: usize,
    detector: Arc<Mutex<BlowDetector>>,
    running: Arc<AtomicBool>,
    sink: EngineHandle,
}

impl AudioMonitor {
    pub fn new(config: &AudioConfig, threshold_db: f32, sink: EngineHandle) -> Self {
        Self {
            sample_rate: config.sample_rate,
            block_size: config.block_size,
            detector: Arc::new(Mutex::new(BlowDetector::new(threshold_db))),
            running: Arc::new(AtomicBool::new(false)),
            sink,
        }
    }

    /// Capture rate the host should open the microphone at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Capture buffer size the host should request.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts analysis with a clean edge state.
    pub fn start(&self) -> Result<()> {
        self.lock_detector()?.reset();
        if !self.running.swap(true, Ordering::AcqRel) {
            tracing::debug!(sample_rate = self.sample_rate, "audio capture started");
        }
        Ok(())
    }

    /// Stops analysis; later buffers are ignored until the next `start`.
    pub fn stop(&self) -> Result<()> {
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::debug!("audio capture stopped");
        }
        Ok(())
    }

    pub fn set_threshold(&self, threshold_db: f32) -> Result<()> {
        self.lock_detector()?.set_threshold(threshold_db);
        Ok(())
    }

    pub fn threshold_db(&self) -> Result<f32> {
        Ok(self.lock_detector()?.threshold_db())
    }

    /// Analyses one capture buffer and forwards a `blow` to the engine on the
    /// rising edge. Returns `None` while stopped.
    ///
    /// Never blocks the capture thread: if the detector is busy (threshold
    /// update or restart in flight) the buffer is dropped.
    pub fn push_samples(&self, samples: &[f32]) -> Result<Option<BlowReading>> {
        if !self.is_running() {
            return Ok(None);
        }

        let reading = match self.detector.try_lock() {
            Ok(mut detector) => detector.process(samples),
            Err(TryLockError::WouldBlock) => {
                tracing::trace!(len = samples.len(), "detector busy, buffer skipped");
                return Ok(None);
            }
            Err(TryLockError::Poisoned(_)) => {
                return Err(ImagicError::msg("blow detector has been poisoned"))
            }
        };
        if let Some(trigger) = reading.trigger {
            tracing::debug!(db = reading.db, "blow detected");
            self.sink.trigger(trigger)?;
        }
        Ok(Some(reading))
    }

    fn lock_detector(&self) -> Result<MutexGuard<'_, BlowDetector>> {
        self.detector
            .lock()
            .map_err(|_| ImagicError::msg("blow detector has been poisoned"))
    }
}

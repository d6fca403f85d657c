//! One OCR session per document run.
//!
//! The adapter owns at most one [`OcrWorker`]. The worker is started lazily
//! by the first caller of [`OcrAdapter::initialize`]; callers that arrive
//! while the start is in flight wait on the same future, and the outcome
//! (ready or failed) is recorded for the rest of the run. A failed start is
//! never retried by the same adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::preprocess::{stretch_contrast, DEFAULT_CONTRAST};
use super::traits::{OcrBackend, OcrError, OcrWorker, Recognition};

/// Recorded outcome of a failed session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrInitFailure {
    pub message: String,
    /// Whether a fresh adapter (a later run) might succeed.
    pub recoverable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    Terminated,
}

type Session = Result<Mutex<Option<Box<dyn OcrWorker>>>, OcrInitFailure>;

pub struct OcrAdapter {
    backend: Arc<dyn OcrBackend>,
    contrast: f32,
    initializing: AtomicBool,
    terminated: AtomicBool,
    session: OnceCell<Session>,
}

impl OcrAdapter {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self {
            backend,
            contrast: DEFAULT_CONTRAST,
            initializing: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            session: OnceCell::new(),
        }
    }

    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn state(&self) -> SessionState {
        if self.terminated.load(Ordering::SeqCst) {
            return SessionState::Terminated;
        }
        match self.session.get() {
            Some(Ok(_)) => SessionState::Ready,
            Some(Err(_)) => SessionState::Failed,
            None if self.initializing.load(Ordering::SeqCst) => SessionState::Initializing,
            None => SessionState::Uninitialized,
        }
    }

    /// The recorded start failure, if the session failed to start.
    pub fn init_failure(&self) -> Option<&OcrInitFailure> {
        match self.session.get() {
            Some(Err(failure)) => Some(failure),
            _ => None,
        }
    }

    /// Start the session if nobody has yet. Idempotent and safe to call
    /// concurrently: exactly one `OcrBackend::start` runs per adapter.
    pub async fn initialize(&self) -> Result<(), OcrInitFailure> {
        match self.session.get_or_init(|| self.start_session()).await {
            Ok(_) => Ok(()),
            Err(failure) => Err(failure.clone()),
        }
    }

    async fn start_session(&self) -> Session {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(OcrInitFailure {
                message: OcrError::Terminated.to_string(),
                recoverable: false,
            });
        }

        self.initializing.store(true, Ordering::SeqCst);
        debug!(backend = self.backend.name(), "Starting OCR session");

        let session = match self.backend.start().await {
            Ok(worker) if self.terminated.load(Ordering::SeqCst) => {
                // Terminated while starting: nobody will release this worker later.
                if let Err(e) = worker.terminate().await {
                    warn!(error = %e, "Failed to release OCR worker started after termination");
                }
                Err(OcrInitFailure {
                    message: OcrError::Terminated.to_string(),
                    recoverable: false,
                })
            }
            Ok(worker) => {
                info!(backend = self.backend.name(), "OCR session ready");
                Ok(Mutex::new(Some(worker)))
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "OCR engine failed to initialize");
                Err(OcrInitFailure {
                    message: e.to_string(),
                    recoverable: e.is_transient(),
                })
            }
        };

        self.initializing.store(false, Ordering::SeqCst);
        session
    }

    /// Fixed contrast stretch applied before recognition.
    pub fn preprocess(&self, image: &RgbaImage) -> RgbaImage {
        stretch_contrast(image, self.contrast)
    }

    /// Recognize text on an (already preprocessed) page image. Starts the
    /// session on first use.
    pub async fn recognize(&self, image: &RgbaImage) -> Result<Recognition, OcrError> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(OcrError::Terminated);
        }
        if let Err(failure) = self.initialize().await {
            return Err(OcrError::Unavailable(failure.message));
        }
        let Some(Ok(slot)) = self.session.get() else {
            return Err(OcrError::Terminated);
        };

        let mut guard = slot.lock().await;
        let worker = guard.as_mut().ok_or(OcrError::Terminated)?;
        let mut recognition = worker.recognize(image).await?;
        recognition.confidence = if recognition.confidence.is_finite() {
            recognition.confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Ok(recognition)
    }

    /// Release the session. Idempotent, and a no-op if it never started.
    pub async fn terminate(&self) -> Result<(), OcrError> {
        self.terminated.store(true, Ordering::SeqCst);

        let Some(Ok(slot)) = self.session.get() else {
            return Ok(());
        };
        let worker = slot.lock().await.take();
        match worker {
            Some(worker) => {
                worker.terminate().await?;
                info!(backend = self.backend.name(), "OCR session terminated");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        starts: AtomicUsize,
        terminations: AtomicUsize,
    }

    struct FakeBackend {
        counters: Arc<Counters>,
        fail: bool,
        confidence: f32,
    }

    impl FakeBackend {
        fn new(counters: Arc<Counters>) -> Self {
            Self { counters, fail: false, confidence: 90.0 }
        }
    }

    struct FakeWorker {
        counters: Arc<Counters>,
        confidence: f32,
    }

    #[async_trait]
    impl OcrBackend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }

        async fn start(&self) -> Result<Box<dyn OcrWorker>, OcrError> {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(OcrError::Unavailable("language data missing".into()));
            }
            Ok(Box::new(FakeWorker {
                counters: self.counters.clone(),
                confidence: self.confidence,
            }))
        }
    }

    #[async_trait]
    impl OcrWorker for FakeWorker {
        async fn recognize(&mut self, image: &RgbaImage) -> Result<Recognition, OcrError> {
            Ok(Recognition {
                text: format!("{}x{}", image.width(), image.height()),
                confidence: self.confidence,
            })
        }

        async fn terminate(self: Box<Self>) -> Result<(), OcrError> {
            self.counters.terminations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn concurrent_initialize_starts_one_session() {
        let counters = Arc::new(Counters::default());
        let adapter = OcrAdapter::new(Arc::new(FakeBackend::new(counters.clone())));

        let results = futures::future::join_all((0..8).map(|_| adapter.initialize())).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.state(), SessionState::Ready);
        assert_eq!(adapter.backend_name(), "fake");

        adapter.initialize().await.unwrap();
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_start_is_recorded_and_not_retried() {
        let counters = Arc::new(Counters::default());
        let backend = FakeBackend { fail: true, ..FakeBackend::new(counters.clone()) };
        let adapter = OcrAdapter::new(Arc::new(backend));

        let first = adapter.initialize().await.unwrap_err();
        let second = adapter.initialize().await.unwrap_err();

        assert_eq!(first, second);
        assert!(first.message.contains("language data missing"));
        assert!(!first.recoverable);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.state(), SessionState::Failed);
        assert!(adapter.init_failure().is_some());

        let img = RgbaImage::new(1, 1);
        assert!(matches!(adapter.recognize(&img).await, Err(OcrError::Unavailable(_))));
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recognize_starts_session_lazily() {
        let counters = Arc::new(Counters::default());
        let adapter = OcrAdapter::new(Arc::new(FakeBackend::new(counters.clone())));
        assert_eq!(adapter.state(), SessionState::Uninitialized);

        let rec = adapter.recognize(&RgbaImage::new(4, 2)).await.unwrap();
        assert_eq!(rec.text, "4x2");
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn confidence_is_clamped() {
        let counters = Arc::new(Counters::default());
        let backend = FakeBackend { confidence: 140.0, ..FakeBackend::new(counters.clone()) };
        let adapter = OcrAdapter::new(Arc::new(backend));

        let rec = adapter.recognize(&RgbaImage::new(1, 1)).await.unwrap();
        assert_eq!(rec.confidence, 100.0);
    }

    #[tokio::test]
    async fn terminate_without_initialize_is_a_noop() {
        let counters = Arc::new(Counters::default());
        let adapter = OcrAdapter::new(Arc::new(FakeBackend::new(counters.clone())));

        adapter.terminate().await.unwrap();
        adapter.terminate().await.unwrap();

        assert_eq!(adapter.state(), SessionState::Terminated);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
        assert_eq!(counters.terminations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn terminate_releases_worker_exactly_once() {
        let counters = Arc::new(Counters::default());
        let adapter = OcrAdapter::new(Arc::new(FakeBackend::new(counters.clone())));
        adapter.initialize().await.unwrap();

        adapter.terminate().await.unwrap();
        adapter.terminate().await.unwrap();

        assert_eq!(counters.terminations.load(Ordering::SeqCst), 1);
        assert!(matches!(
            adapter.recognize(&RgbaImage::new(1, 1)).await,
            Err(OcrError::Terminated)
        ));
    }

    #[test]
    fn preprocess_uses_configured_contrast() {
        let counters = Arc::new(Counters::default());
        let adapter = OcrAdapter::new(Arc::new(FakeBackend::new(counters))).with_contrast(0.0);
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([30, 60, 90, 255]));
        assert_eq!(adapter.preprocess(&img), img);
    }
}

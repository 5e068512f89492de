//! Crop-image submission: validate, upload, classify, persist.
//!
//! ```text
//! Idle -> Validating -> Uploading <-> Classifying -> Persisting -> Succeeded
//!
//! Validating | Uploading | Classifying | Persisting  -> Failed(reason)
//! any await point                                   -> Cancelled
//! ```
//!
//! Upload and classification form one retry unit: a failure in either
//! waits out the backoff and starts over with a fresh object path.
//! Persisting is never retried. A [`CancellationToken`] aborts at any
//! suspension point; anything uploaded so far stays in storage.

pub mod backoff;
pub mod error;
pub mod validate;

use std::{future::Future, sync::Arc};

use farm_data_ingestor::{
    models::{
        classification::Classification,
        image::{ImageFormat, ImageUpload, MAX_IMAGE_BYTES},
        session::Session,
    },
    providers::{CropClassifier, ObjectStorage},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    records::{AnalysisRecord, AnalysisStore, NewAnalysisRecord},
};

pub use backoff::{Backoff, LinearBackoff, Sleeper, TokioSleeper};
pub use error::AnalysisError;
pub use validate::validate_image;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Validating,
    Uploading { attempt: u32 },
    Classifying { attempt: u32 },
    Persisting,
    Succeeded,
    Failed(String),
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_) | Self::Cancelled)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Validating => f.write_str("validating image"),
            Self::Uploading { attempt } => write!(f, "uploading image (attempt {attempt})"),
            Self::Classifying { attempt } => write!(f, "analyzing image (attempt {attempt})"),
            Self::Persisting => f.write_str("saving results"),
            Self::Succeeded => f.write_str("done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Retry bookkeeping for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAttempt {
    pub file_name: String,
    /// Attempts started so far.
    pub attempt: u32,
    pub last_error: Option<String>,
}

impl SubmissionAttempt {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            attempt: 0,
            last_error: None,
        }
    }

    fn start(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    fn fail(&mut self, message: String) {
        self.last_error = Some(message);
    }

    fn into_error(self) -> AnalysisError {
        AnalysisError::Transient {
            attempts: self.attempt,
            message: self.last_error.unwrap_or_else(|| "Failed to analyze image".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_attempts: u32,
    pub max_file_bytes: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_file_bytes: MAX_IMAGE_BYTES,
        }
    }
}

/// Where a successful attempt left the image.
struct Stored {
    path: String,
    url: String,
    classification: Classification,
}

pub struct SubmissionPipeline {
    storage: Arc<dyn ObjectStorage>,
    classifier: Arc<dyn CropClassifier>,
    store: Arc<dyn AnalysisStore>,
    backoff: Arc<dyn Backoff>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
}

impl SubmissionPipeline {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        classifier: Arc<dyn CropClassifier>,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            storage,
            classifier,
            store,
            backoff: Arc::new(LinearBackoff::default()),
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    pub async fn submit(
        &self,
        session: Option<&Session>,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<AnalysisRecord, AnalysisError> {
        self.submit_observed(session, image, cancel, |_| {}).await
    }

    /// Like [`submit`](Self::submit), reporting every state entered to
    /// `on_state`, ending with exactly one terminal state.
    pub async fn submit_observed<F>(
        &self,
        session: Option<&Session>,
        image: &ImageUpload,
        cancel: &CancellationToken,
        mut on_state: F,
    ) -> Result<AnalysisRecord, AnalysisError>
    where
        F: FnMut(&PipelineState) + Send,
    {
        let result = self.run(session, image, cancel, &mut on_state).await;
        let terminal = match &result {
            Ok(_) => PipelineState::Succeeded,
            Err(AnalysisError::Cancelled) => PipelineState::Cancelled,
            Err(e) => PipelineState::Failed(e.to_string()),
        };
        enter(&mut on_state, terminal);
        result
    }

    async fn run(
        &self,
        session: Option<&Session>,
        image: &ImageUpload,
        cancel: &CancellationToken,
        on_state: &mut (dyn FnMut(&PipelineState) + Send),
    ) -> Result<AnalysisRecord, AnalysisError> {
        enter(on_state, PipelineState::Validating);
        let session = session.ok_or(AnalysisError::AuthenticationRequired)?;
        let format = validate_image(image, self.settings.max_file_bytes)?;
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let max_attempts = self.settings.max_attempts.max(1);
        let mut progress = SubmissionAttempt::new(&image.file_name);
        let stored = loop {
            let attempt = progress.start();
            match self.attempt(session, image, format, attempt, cancel, on_state).await {
                Ok(stored) => break stored,
                Err(AttemptFailure::Cancelled) => return Err(AnalysisError::Cancelled),
                Err(AttemptFailure::Failed(message)) => {
                    progress.fail(message);
                    if attempt >= max_attempts {
                        tracing::error!(
                            file = %progress.file_name,
                            attempts = attempt,
                            error = progress.last_error.as_deref().unwrap_or_default(),
                            "Crop analysis failed"
                        );
                        return Err(progress.into_error());
                    }
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        file = %progress.file_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = progress.last_error.as_deref().unwrap_or_default(),
                        "Analysis attempt failed, retrying"
                    );
                    cancellable(cancel, self.sleeper.sleep(delay)).await?;
                }
            }
        };

        enter(on_state, PipelineState::Persisting);
        let record = NewAnalysisRecord {
            crop_name: stored.classification.crop_name,
            disease_detected: stored.classification.disease,
            confidence: stored.classification.confidence,
            recommendation_text: stored.classification.recommendation,
            image_url: stored.url,
            file_path: stored.path.clone(),
            created_at: self.clock.now(),
        };
        match cancellable(cancel, self.store.insert_analysis(session, &record)).await? {
            Ok(saved) => {
                tracing::info!(id = saved.id, path = %saved.file_path, "Crop analysis saved");
                Ok(saved)
            }
            Err(source) => {
                tracing::error!(path = %stored.path, error = %source, "Failed to save crop analysis");
                self.remove_upload(&stored.path).await;
                Err(AnalysisError::Persistence { source })
            }
        }
    }

    async fn attempt(
        &self,
        session: &Session,
        image: &ImageUpload,
        format: ImageFormat,
        attempt: u32,
        cancel: &CancellationToken,
        on_state: &mut (dyn FnMut(&PipelineState) + Send),
    ) -> Result<Stored, AttemptFailure> {
        let path = format!("{}/{}.{}", session.user_id(), Uuid::new_v4(), format.extension());

        enter(on_state, PipelineState::Uploading { attempt });
        cancellable(cancel, self.storage.upload(&path, &image.bytes, format.mime()))
            .await?
            .map_err(|e| AttemptFailure::Failed(format!("Failed to upload image: {e}")))?;
        let url = self.storage.public_url(&path);
        tracing::debug!(%path, attempt, "Image uploaded");

        enter(on_state, PipelineState::Classifying { attempt });
        let classification = cancellable(cancel, self.classifier.classify(image))
            .await?
            .map_err(|e| AttemptFailure::Failed(e.to_string()))?;

        Ok(Stored {
            path,
            url,
            classification,
        })
    }

    /// Best-effort cleanup after a failed insert; runs at most once per
    /// submission and never changes the outcome.
    async fn remove_upload(&self, path: &str) {
        match self.storage.remove(path).await {
            Ok(()) => tracing::info!(%path, "Removed uploaded image after failed save"),
            Err(e) => tracing::warn!(%path, error = %e, "Failed to remove uploaded image"),
        }
    }
}

enum AttemptFailure {
    Failed(String),
    Cancelled,
}

/// The cancellation token fired while waiting.
struct Cancelled;

impl From<Cancelled> for AttemptFailure {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<Cancelled> for AnalysisError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

fn enter(on_state: &mut (dyn FnMut(&PipelineState) + Send), state: PipelineState) {
    tracing::debug!(%state, "Pipeline state");
    on_state(&state);
}

/// Runs `fut` unless `cancel` fires first.
async fn cancellable<T>(cancel: &CancellationToken, fut: impl Future<Output = T>) -> Result<T, Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        out = fut => Ok(out),
    }
}

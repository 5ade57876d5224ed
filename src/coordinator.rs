//! Encoding coordinator.
//!
//! Dispatches encode/decode requests to the codec selected by [`Mode`],
//! runs each unit of work on the blocking pool behind a bounded
//! semaphore, enforces the caller-supplied timeout, and fans out batches
//! at a width the resource pool recommends. Batch results map 1:1 to
//! their inputs regardless of completion order.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::debug;

use crate::artifact::{Artifact, DecodeResult, EncodeJob, EncodeResult, EncodingOptions, Mode};
use crate::audio::AudioChirpCodec;
use crate::emoji::EmojiCodec;
use crate::error::{CodecError, Result};
use crate::pool::ResourcePool;
use crate::qr::QrCodec;
use crate::stego::StegoCodec;

/// Concurrent units of work allowed by default.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Baseline batch width before pressure adaptation.
const DEFAULT_BATCH_WIDTH: usize = 4;

/// Polling interval while heavy work is deferred under pressure.
const DEFER_POLL: Duration = Duration::from_millis(25);

/// Coordinates the four codecs over a shared resource pool.
pub struct Coordinator {
    pool: ResourcePool,
    emoji: EmojiCodec,
    qr: QrCodec,
    stego: StegoCodec,
    chirp: AudioChirpCodec,
    permits: Arc<Semaphore>,
}

impl Coordinator {
    /// Creates a coordinator with the default concurrency bound.
    pub fn new(pool: ResourcePool) -> Self {
        Self::with_concurrency(pool, DEFAULT_MAX_CONCURRENCY)
    }

    /// Creates a coordinator allowing at most `max_concurrency` units of
    /// work in flight.
    pub fn with_concurrency(pool: ResourcePool, max_concurrency: usize) -> Self {
        Self {
            emoji: EmojiCodec::new(),
            qr: QrCodec::new(),
            stego: StegoCodec::new(pool.clone()),
            chirp: AudioChirpCodec::new(pool.clone()),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            pool,
        }
    }

    /// The pool shared with the codecs.
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Modes this host can serve.
    pub fn capabilities(&self) -> Vec<Mode> {
        Mode::ALL
            .into_iter()
            .filter(|mode| self.mode_available(*mode))
            .collect()
    }

    fn mode_available(&self, mode: Mode) -> bool {
        match mode {
            Mode::ImageStego => self.stego.is_available(),
            _ => true,
        }
    }

    fn ensure_available(&self, mode: Mode) -> Result<()> {
        if !self.mode_available(mode) {
            return Err(CodecError::Unsupported(format!(
                "codec for mode {mode} is unavailable on this host"
            )));
        }
        Ok(())
    }

    fn is_heavy(mode: Mode) -> bool {
        matches!(mode, Mode::ImageStego | Mode::AudioChirp)
    }

    /// Cost model for progress UX: fixed base plus a payload-size
    /// proportional term per mode. Not used for correctness.
    pub fn estimate_processing_time(&self, mode: Mode, payload_len: usize) -> Duration {
        let (base_us, per_byte_us) = match mode {
            Mode::Emoji => (200, 1),
            Mode::Qr => (15_000, 5),
            Mode::ImageStego => (40_000, 30),
            Mode::AudioChirp => (20_000, 500),
        };
        Duration::from_micros(base_us + per_byte_us * payload_len as u64)
    }

    /// Encodes one job, honoring the options' timeout end to end.
    pub async fn encode(&self, job: EncodeJob, options: EncodingOptions) -> Result<EncodeResult> {
        self.ensure_available(job.mode)?;
        let deadline = Instant::now() + options.timeout;
        let _permit = self.acquire(deadline, options.timeout).await?;
        self.defer_if_pressured(job.mode, deadline, options.timeout)
            .await?;

        debug!(mode = %job.mode, bytes = job.text.len(), "dispatching encode");
        match job.mode {
            Mode::Emoji => {
                let codec = self.emoji.clone();
                let text = job.text;
                self.run_blocking(deadline, options.timeout, move || codec.encode(&text))
                    .await
            }
            Mode::Qr => {
                let codec = self.qr.clone();
                let text = job.text;
                self.run_blocking(deadline, options.timeout, move || {
                    codec.encode(&text, &options)
                })
                .await
            }
            Mode::ImageStego => {
                let codec = self.stego.clone();
                let text = job.text;
                self.run_blocking(deadline, options.timeout, move || {
                    codec.encode(&text, &options)
                })
                .await
            }
            Mode::AudioChirp => {
                let codec = self.chirp.clone();
                let text = job.text;
                self.run_blocking(deadline, options.timeout, move || {
                    codec.encode(&text, &options)
                })
                .await
            }
        }
    }

    /// Decodes an artifact produced under the given mode.
    pub async fn decode(
        &self,
        artifact: Artifact,
        mode: Mode,
        options: EncodingOptions,
    ) -> Result<DecodeResult> {
        self.ensure_available(mode)?;
        if artifact.kind() != mode.artifact_kind() {
            return Err(CodecError::InvalidInput(format!(
                "mode {mode} expects a {} artifact, got {}",
                mode.artifact_kind(),
                artifact.kind()
            )));
        }

        let deadline = Instant::now() + options.timeout;
        let _permit = self.acquire(deadline, options.timeout).await?;
        self.defer_if_pressured(mode, deadline, options.timeout)
            .await?;

        debug!(%mode, bytes = artifact.byte_size(), "dispatching decode");
        match (mode, artifact) {
            (Mode::Emoji, Artifact::Text(text)) => {
                let codec = self.emoji.clone();
                self.run_blocking(deadline, options.timeout, move || codec.decode(&text))
                    .await
            }
            (Mode::Qr, Artifact::Image(image)) => {
                let codec = self.qr.clone();
                self.run_blocking(deadline, options.timeout, move || codec.decode(&image))
                    .await
            }
            (Mode::ImageStego, Artifact::Image(image)) => {
                let codec = self.stego.clone();
                self.run_blocking(deadline, options.timeout, move || {
                    codec.decode(&image, &options)
                })
                .await
            }
            (Mode::AudioChirp, Artifact::Audio { samples, sample_rate }) => {
                let codec = self.chirp.clone();
                self.run_blocking(deadline, options.timeout, move || {
                    codec.decode(&samples, sample_rate, &options)
                })
                .await
            }
            (mode, artifact) => Err(CodecError::InvalidInput(format!(
                "mode {mode} cannot consume a {} artifact",
                artifact.kind()
            ))),
        }
    }

    /// Encodes many jobs concurrently. The fan-out width adapts to
    /// memory pressure; the result vector is index-aligned with the
    /// input and one failing job does not abort the rest.
    pub async fn encode_batch(
        &self,
        jobs: Vec<EncodeJob>,
        options: EncodingOptions,
    ) -> Vec<Result<EncodeResult>> {
        let width = self.pool.recommended_batch_size(DEFAULT_BATCH_WIDTH);
        debug!(jobs = jobs.len(), width, "batch encode fan-out");

        let mut results = Vec::with_capacity(jobs.len());
        let mut iter = jobs.into_iter();
        loop {
            let chunk: Vec<EncodeJob> = iter.by_ref().take(width).collect();
            if chunk.is_empty() {
                break;
            }
            let wave = chunk
                .into_iter()
                .map(|job| self.encode(job, options.clone()));
            results.extend(join_all(wave).await);
        }
        results
    }

    async fn acquire(
        &self,
        deadline: Instant,
        limit: Duration,
    ) -> Result<tokio::sync::SemaphorePermit<'_>> {
        match timeout_at(deadline, self.permits.acquire()).await {
            Err(_) => Err(CodecError::ProcessingTimeout(limit)),
            Ok(Err(_)) => Err(CodecError::Internal("semaphore closed".to_string())),
            Ok(Ok(permit)) => Ok(permit),
        }
    }

    /// Heavy modes wait out critical memory pressure instead of piling
    /// more allocations on top of it. Bounded by the caller's timeout.
    async fn defer_if_pressured(
        &self,
        mode: Mode,
        deadline: Instant,
        limit: Duration,
    ) -> Result<()> {
        if !Self::is_heavy(mode) {
            return Ok(());
        }
        while self.pool.should_defer_heavy_operation() {
            if Instant::now() + DEFER_POLL >= deadline {
                return Err(CodecError::ProcessingTimeout(limit));
            }
            debug!(%mode, "deferring heavy operation under critical pressure");
            sleep(DEFER_POLL).await;
        }
        Ok(())
    }

    async fn run_blocking<T, F>(&self, deadline: Instant, limit: Duration, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match timeout_at(deadline, tokio::task::spawn_blocking(work)).await {
            Err(_) => Err(CodecError::ProcessingTimeout(limit)),
            Ok(Err(join_err)) => Err(CodecError::Internal(format!(
                "worker task failed: {join_err}"
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

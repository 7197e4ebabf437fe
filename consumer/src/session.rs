use frame_sieve_common::config::{Config, ConfigError};
use frame_sieve_common::frame::DecodeError;
use frame_sieve_producer::{FfmpegSource, FrameSource, OpenError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::clock::{self, Clock};
use crate::preprocess::canonicalize;
use crate::report::{DecisionEvent, DecisionSink, Summary};
use crate::selector::{Counters, EngineError, SelectionEngine};
use crate::similarity::{Similarity, WindowedSsim};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to open video: {0}")]
    Open(#[from] OpenError),
    #[error("selection engine failed: {0}")]
    Engine(#[from] EngineError),
}

/// Cooperative cancellation shared between a session and whoever drives it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// The stream ran out (or hit a decode error); the summary is final.
    Completed(Summary),
    /// Cancelled before the end of the stream; counts cover the frames
    /// processed so far and no final summary was produced.
    Cancelled(Counters),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub end: SessionEnd,
    /// Decode error that ended the stream early, if any.
    pub stopped_by: Option<DecodeError>,
}

impl SessionReport {
    pub fn summary(&self) -> Option<&Summary> {
        match &self.end {
            SessionEnd::Completed(summary) => Some(summary),
            SessionEnd::Cancelled(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.end, SessionEnd::Cancelled(_))
    }
}

/// One video-processing session: pulls frames, preprocesses them, runs the
/// selection engine and forwards every decision to a sink. Strictly
/// sequential, one frame at a time.
pub struct Session<S> {
    engine: SelectionEngine<S>,
    clock: Box<dyn Clock>,
    cancel: CancelToken,
    last_at: Option<Duration>,
}

impl<S: Similarity> Session<S> {
    pub fn new(engine: SelectionEngine<S>, clock: Box<dyn Clock>) -> Self {
        Self {
            engine,
            clock,
            cancel: CancelToken::new(),
            last_at: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn engine(&self) -> &SelectionEngine<S> {
        &self.engine
    }

    /// Drive `source` to its end.
    ///
    /// Decode errors end the stream and the accumulated result is returned.
    /// A dimension mismatch aborts the session.
    pub fn run<F>(
        &mut self,
        source: &mut F,
        sink: &mut dyn DecisionSink,
    ) -> Result<SessionReport, EngineError>
    where
        F: FrameSource + ?Sized,
    {
        let estimated_frames = source.estimated_frame_count();
        info!(
            estimated_frames,
            oracle = self.engine.oracle().name(),
            similarity_threshold = self.engine.params().similarity_threshold(),
            backoff_threshold = self.engine.params().backoff_threshold(),
            "session started"
        );
        sink.on_start(estimated_frames);

        let mut stopped_by = None;
        loop {
            if self.cancel.is_cancelled() {
                source.close();
                let counts = self.engine.counters();
                info!(frames = counts.seen, "session cancelled");
                return Ok(SessionReport {
                    end: SessionEnd::Cancelled(counts),
                    stopped_by: None,
                });
            }

            let raw = match source.next_frame() {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(e) => {
                    stopped_by = Some(e);
                    break;
                }
            };

            let at = self.clock.now(&raw);
            if let Some(previous) = self.last_at.filter(|previous| at < *previous) {
                stopped_by = Some(DecodeError::NonMonotonicTimestamp {
                    previous,
                    current: at,
                });
                break;
            }
            self.last_at = Some(at);

            let frame = match canonicalize(raw) {
                Ok(frame) => frame,
                Err(e) => {
                    stopped_by = Some(e);
                    break;
                }
            };

            let decision = match self.engine.observe(frame, at) {
                Ok(decision) => decision,
                Err(e) => {
                    error!(error = %e, "aborting session");
                    source.close();
                    return Err(e);
                }
            };
            sink.on_decision(&DecisionEvent::new(&decision, self.engine.counters()));
        }

        if let Some(e) = &stopped_by {
            warn!(error = %e, "decode error, treating as end of stream");
        }
        source.close();

        let summary = Summary::from(self.engine.counters());
        sink.on_complete(&summary);
        info!(
            total = summary.total_frames,
            kept = summary.kept_frames,
            skipped = summary.skipped_frames,
            "session finished"
        );
        Ok(SessionReport {
            end: SessionEnd::Completed(summary),
            stopped_by,
        })
    }
}

/// Open the video at `path` with ffmpeg and run one session over it using
/// windowed SSIM.
pub fn process_video(
    path: &Path,
    config: &Config,
    sink: &mut dyn DecisionSink,
    cancel: CancelToken,
) -> Result<SessionReport, SessionError> {
    let params = config.selection.params()?;
    let mut source = FfmpegSource::open(path, &config.source)?;
    let engine = SelectionEngine::new(params, WindowedSsim::default());
    let mut session = Session::new(engine, clock::from_kind(config.source.clock)).with_cancel(cancel);
    Ok(session.run(&mut source, sink)?)
}

//! The batch conversion job.
//!
//! One driver invocation owns the source's decode cursor from start to
//! finish: it steps forward at the configured frame-skip stride, converts
//! the frame visible at each stop, reports progress, and polls for
//! cancellation once per iteration. Frames are produced strictly
//! sequentially; the shared cursor makes the work inherently serial.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::convert::{derive_target_height, frame_to_ascii};
use crate::error::{ConvertError, Result};
use crate::frame::{AsciiVideo, Raster};
use crate::ramp::CharacterRamp;
use crate::source::{VideoSource, FALLBACK_FRAME_RATE};
use crate::ConversionOptions;

/// A preview accompanies every tenth processed frame, counting from zero.
const PREVIEW_INTERVAL: usize = 10;
/// Previews are downscaled to at most this many pixels across.
const PREVIEW_MAX_WIDTH: u32 = 160;
const PREVIEW_JPEG_QUALITY: u8 = 30;

/// Cooperative cancellation flag shared between a running job and its
/// caller. Clones observe the same flag.
///
/// The driver polls the token once per iteration boundary, so a step already
/// in flight (seeking or sampling) always completes before cancellation is
/// honored. Cancelling discards partial work: the job returns an
/// [`AsciiVideo`] with an empty frame list, which is the cancellation
/// signal, not an error.
///
/// # Example
/// ```
/// use vascii::CancelToken;
/// let token = CancelToken::new();
/// let clone = token.clone();
/// assert!(!clone.is_cancelled());
/// token.cancel();
/// assert!(clone.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the job stop at its next iteration boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Current phase of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Deriving the audio track from the source.
    ExtractingAudio,
    /// Converting sampled frames to ASCII.
    ConvertingFrames,
    /// Conversion finished.
    Complete,
}

/// Progress information delivered to the caller's callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase of the conversion.
    pub phase: ProgressPhase,
    /// Frames processed so far.
    pub completed: usize,
    /// Total-steps estimate. Drives percentages only; the conversion loop
    /// is bounded by the decode cursor, never by this number.
    pub total: usize,
    /// Percentage complete. May exceed 100 when the estimate undershoots;
    /// it is deliberately not clamped.
    pub percent: f64,
    /// Human-readable description of the current status.
    pub message: String,
    /// Low-fidelity JPEG of the current raster, attached on every tenth
    /// processed frame and absent otherwise.
    pub preview: Option<Vec<u8>>,
}

impl Progress {
    fn extracting_audio() -> Self {
        Self {
            phase: ProgressPhase::ExtractingAudio,
            completed: 0,
            total: 0,
            percent: 0.0,
            message: "Extracting audio from video...".to_string(),
            preview: None,
        }
    }

    fn converting(completed: usize, total: usize, preview: Option<Vec<u8>>) -> Self {
        let percent = completed as f64 / total.max(1) as f64 * 100.0;
        Self {
            phase: ProgressPhase::ConvertingFrames,
            completed,
            total,
            percent,
            message: format!("Converting frame {completed} of ~{total}"),
            preview,
        }
    }

    fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percent: 100.0,
            message: format!("Conversion complete: {total_frames} frames"),
            preview: None,
        }
    }
}

/// Lifecycle of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    NotStarted,
    Sampling,
    Completed,
    Cancelled,
    Failed,
}

/// Transient bookkeeping for one running job. Created at conversion start,
/// mutated every step, dropped on completion, cancellation, or error.
struct ConversionJob {
    processed: usize,
    total_estimate: usize,
    state: JobState,
}

/// Convert a whole source into an [`AsciiVideo`].
///
/// Steps through the source at `frame_skip` native frames per stop,
/// converting each visible frame through the sampler and the character
/// ramp. `on_progress` is invoked once per processed frame (plus once for
/// audio extraction and once on completion); `cancel` is polled once per
/// iteration before any work for that step begins.
///
/// The effective `fps` of the result is always the native frame rate
/// divided by the frame skip: a nominal rate, never measured from wall
/// clock. Cancellation discards partial work and returns an empty frame
/// list; a decode failure aborts the job with an error and returns nothing.
pub fn convert_video<S, F>(
    source: &mut S,
    options: &ConversionOptions,
    mut on_progress: F,
    cancel: &CancelToken,
) -> Result<AsciiVideo>
where
    S: VideoSource + ?Sized,
    F: FnMut(Progress),
{
    if options.target_width == 0 {
        return Err(ConvertError::InvalidWidth(0));
    }
    let ramp = CharacterRamp::new(&options.charset)?;
    let frame_skip = options.frame_skip.max(1);

    let meta = source.metadata().clone();
    let rate = if meta.frame_rate > 0.0 {
        meta.frame_rate
    } else {
        FALLBACK_FRAME_RATE
    };
    let fps = rate / f64::from(frame_skip);
    let target_height = derive_target_height(options.target_width, meta.width, meta.height);

    // Estimate drives percentages only. When the container misreports its
    // rate the percentage drifts; the loop below never does.
    let native_frames = (meta.duration * rate).floor();
    let total_estimate = (native_frames / f64::from(frame_skip)).floor() as usize;

    let mut job = ConversionJob {
        processed: 0,
        total_estimate,
        state: JobState::NotStarted,
    };

    source.seek(0.0)?;

    let audio = if options.extract_audio {
        on_progress(Progress::extracting_audio());
        match source.audio_handle() {
            Ok(handle) => handle,
            Err(err) => {
                log::warn!("audio extraction failed, continuing without audio: {err}");
                None
            }
        }
    } else {
        None
    };

    job.state = JobState::Sampling;
    let mut frames = Vec::new();

    while source.current_time() < meta.duration {
        if cancel.is_cancelled() {
            job.state = JobState::Cancelled;
            log::debug!(
                "job cancelled after {} frames; partial work discarded (state {:?})",
                job.processed,
                job.state
            );
            return Ok(AsciiVideo {
                frames: Vec::new(),
                fps,
                audio: None,
            });
        }

        let raster = match source.current_raster() {
            Ok(raster) => raster,
            Err(err) => {
                job.state = JobState::Failed;
                return Err(err);
            }
        };
        frames.push(frame_to_ascii(
            &raster,
            options.target_width,
            target_height,
            &ramp,
        ));

        let preview = if job.processed % PREVIEW_INTERVAL == 0 {
            encode_preview(&raster)
        } else {
            None
        };
        drop(raster);

        job.processed += 1;
        on_progress(Progress::converting(
            job.processed,
            job.total_estimate,
            preview,
        ));

        // Stepping from the frame index rather than accumulating deltas
        // keeps the cursor free of floating-point drift over long videos.
        let next = (job.processed as f64 * f64::from(frame_skip) / rate).min(meta.duration);
        if let Err(err) = source.seek(next) {
            job.state = JobState::Failed;
            return Err(err);
        }
    }

    job.state = JobState::Completed;
    log::debug!(
        "job completed: {} frames at {:.2} fps (state {:?})",
        frames.len(),
        fps,
        job.state
    );
    on_progress(Progress::complete(frames.len()));

    Ok(AsciiVideo { frames, fps, audio })
}

/// Downscale the raster by pixel skipping and encode a low-quality JPEG.
/// Preview failures are tolerated; the caller just sees a missing preview.
fn encode_preview(raster: &Raster) -> Option<Vec<u8>> {
    if raster.width() == 0 || raster.height() == 0 {
        return None;
    }
    let step = (raster.width() / PREVIEW_MAX_WIDTH).max(1);
    let width = (raster.width() / step).max(1);
    let height = (raster.height() / step).max(1);

    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let (r, g, b, _) = raster.pixel(x * step, y * step);
            pixels.extend_from_slice(&[r, g, b]);
        }
    }

    let img = image::RgbImage::from_raw(width, height, pixels)?;
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, PREVIEW_JPEG_QUALITY);
    match img.write_with_encoder(encoder) {
        Ok(()) => Some(buf),
        Err(err) => {
            log::warn!("preview encoding failed: {err}");
            None
        }
    }
}

//! Video source adapters.
//!
//! Decoding is delegated to an external collaborator. The conversion driver
//! only sees the [`VideoSource`] capability trait, so its batch algorithm
//! can be exercised against a deterministic fake instead of a real media
//! pipeline. The production implementation, [`FfmpegSource`], shells out to
//! the `ffmpeg`/`ffprobe` binaries.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command as ProcCommand;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ConvertError, Result};
use crate::frame::{AudioHandle, Raster};

/// Assumed native frame rate when a container does not report one.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Static facts about an opened source, probed once at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Native pixel width.
    pub width: u32,
    /// Native pixel height.
    pub height: u32,
    /// Total duration in seconds.
    pub duration: f64,
    /// Native frame rate; [`FALLBACK_FRAME_RATE`] when unreported.
    pub frame_rate: f64,
}

/// Capability interface over a live decode cursor.
///
/// The cursor is stateful and order-sensitive: the conversion driver owns it
/// exclusively for the lifetime of one job and advances it strictly
/// sequentially. [`seek`](VideoSource::seek) blocks until the decoder has
/// settled at the requested position; that blocking call is the driver's
/// sole suspension point per step. There is no seek timeout, so a decoder that
/// never settles stalls the job.
pub trait VideoSource {
    fn metadata(&self) -> &SourceMetadata;

    /// Current cursor position in seconds.
    fn current_time(&self) -> f64;

    /// Move the cursor and wait for the decoder to settle there. Positions
    /// outside the timeline clamp to it.
    fn seek(&mut self, timestamp: f64) -> Result<()>;

    /// The frame visible at the current cursor position. Called at most once
    /// per step; the returned raster is consumed and discarded before the
    /// next seek.
    fn current_raster(&mut self) -> Result<Raster>;

    /// A playable audio track covering the same timeline, if one can be
    /// derived. `Ok(None)` means the source carries no audio.
    fn audio_handle(&mut self) -> Result<Option<AudioHandle>>;
}

/// Production source backed by the `ffmpeg` and `ffprobe` binaries.
///
/// The container is probed once at [`open`](FfmpegSource::open); every seek
/// within the timeline decodes the single frame visible at that instant over
/// a rawvideo pipe and caches it as the settled frame. A seek to the very
/// end only moves the cursor, since there is nothing to settle past the last
/// frame, and the driver's loop exits there.
pub struct FfmpegSource {
    path: PathBuf,
    meta: SourceMetadata,
    cursor: f64,
    settled: Option<Raster>,
}

impl FfmpegSource {
    /// Probe a video file. Fails with [`ConvertError::Load`] when the file
    /// cannot be probed at all, distinct from the per-frame decode errors
    /// raised later.
    pub fn open(path: &Path) -> Result<Self> {
        let output = ProcCommand::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=width,height,r_frame_rate,duration")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("json")
            .arg(path)
            .output()
            .map_err(|err| ConvertError::Load {
                reason: format!("running ffprobe: {err}"),
            })?;

        if !output.status.success() {
            return Err(ConvertError::Load {
                reason: format!(
                    "ffprobe failed for {}: {}",
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let meta = parse_probe_output(&output.stdout)?;
        log::debug!(
            "probed {}: {}x{}, {:.3}s at {:.3} fps",
            path.display(),
            meta.width,
            meta.height,
            meta.duration,
            meta.frame_rate
        );

        Ok(Self {
            path: path.to_path_buf(),
            meta,
            cursor: 0.0,
            settled: None,
        })
    }

    fn decode_at(&self, timestamp: f64) -> Result<Raster> {
        let output = ProcCommand::new("ffmpeg")
            .arg("-loglevel")
            .arg("error")
            .arg("-ss")
            .arg(format!("{timestamp:.6}"))
            .arg("-i")
            .arg(&self.path)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgba")
            .arg("-")
            .output()
            .map_err(|err| ConvertError::Decode {
                timestamp,
                reason: format!("running ffmpeg: {err}"),
            })?;

        if !output.status.success() {
            return Err(ConvertError::Decode {
                timestamp,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let expected = self.meta.width as usize * self.meta.height as usize * 4;
        if output.stdout.len() != expected {
            return Err(ConvertError::Decode {
                timestamp,
                reason: format!(
                    "expected {expected} raw bytes, decoder produced {}",
                    output.stdout.len()
                ),
            });
        }

        Raster::from_rgba(self.meta.width, self.meta.height, output.stdout).ok_or_else(|| {
            ConvertError::Decode {
                timestamp,
                reason: "raster dimensions mismatch".to_string(),
            }
        })
    }
}

impl VideoSource for FfmpegSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.meta
    }

    fn current_time(&self) -> f64 {
        self.cursor
    }

    fn seek(&mut self, timestamp: f64) -> Result<()> {
        let clamped = timestamp.clamp(0.0, self.meta.duration);
        self.cursor = clamped;
        self.settled = None;
        if clamped < self.meta.duration {
            self.settled = Some(self.decode_at(clamped)?);
        }
        Ok(())
    }

    fn current_raster(&mut self) -> Result<Raster> {
        match self.settled.take() {
            Some(raster) => Ok(raster),
            None => self.decode_at(self.cursor),
        }
    }

    fn audio_handle(&mut self) -> Result<Option<AudioHandle>> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let out_path = std::env::temp_dir().join(format!(
            "vascii_audio_{}_{}.mp3",
            std::process::id(),
            stamp
        ));

        let output = ProcCommand::new("ffmpeg")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(&self.path)
            .arg("-vn")
            .arg("-acodec")
            .arg("libmp3lame")
            .arg("-q:a")
            .arg("2")
            .arg(&out_path)
            .output()
            .map_err(|err| ConvertError::Audio {
                reason: format!("running ffmpeg: {err}"),
            })?;

        if !output.status.success() {
            return Err(ConvertError::Audio {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(Some(AudioHandle { path: out_path }))
    }
}

fn parse_probe_output(raw: &[u8]) -> Result<SourceMetadata> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    #[derive(Deserialize)]
    struct ProbeStream {
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        duration: Option<String>,
    }

    #[derive(Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }

    let probe: ProbeOutput = serde_json::from_slice(raw).map_err(|err| ConvertError::Load {
        reason: format!("parsing ffprobe output: {err}"),
    })?;

    let stream = probe.streams.first().ok_or_else(|| ConvertError::Load {
        reason: "source has no video stream".to_string(),
    })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => (width, height),
        _ => {
            return Err(ConvertError::Load {
                reason: "video stream reports no dimensions".to_string(),
            })
        }
    };

    // Stream duration when present, container duration otherwise.
    let duration = stream
        .duration
        .as_deref()
        .and_then(parse_seconds)
        .or_else(|| {
            probe
                .format
                .as_ref()
                .and_then(|format| format.duration.as_deref())
                .and_then(parse_seconds)
        })
        .ok_or_else(|| ConvertError::Load {
            reason: "source reports no duration".to_string(),
        })?;

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .unwrap_or(FALLBACK_FRAME_RATE);

    Ok(SourceMetadata {
        width,
        height,
        duration,
        frame_rate,
    })
}

fn parse_seconds(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// ffprobe reports rates as a fraction like `30000/1001`; plain numbers are
/// accepted too.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        num / den
    } else {
        raw.trim().parse().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_output_parses_stream_and_format() {
        let raw = br#"{
            "streams": [
                {"width": 1280, "height": 720, "r_frame_rate": "30000/1001", "duration": "12.480000"}
            ],
            "format": {"duration": "12.512000"}
        }"#;
        let meta = parse_probe_output(raw).unwrap();
        assert_eq!(meta.width, 1280);
        assert_eq!(meta.height, 720);
        assert!((meta.duration - 12.48).abs() < 1e-9);
        assert!((meta.frame_rate - 29.97).abs() < 0.01);
    }

    #[test]
    fn container_duration_backs_up_missing_stream_duration() {
        let raw = br#"{
            "streams": [{"width": 640, "height": 480, "r_frame_rate": "25/1"}],
            "format": {"duration": "3.5"}
        }"#;
        let meta = parse_probe_output(raw).unwrap();
        assert!((meta.duration - 3.5).abs() < 1e-9);
        assert!((meta.frame_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn missing_frame_rate_falls_back_to_thirty() {
        let raw = br#"{
            "streams": [{"width": 640, "height": 480, "duration": "2.0"}],
            "format": {}
        }"#;
        let meta = parse_probe_output(raw).unwrap();
        assert_eq!(meta.frame_rate, FALLBACK_FRAME_RATE);
    }

    #[test]
    fn zero_denominator_rate_falls_back() {
        let raw = br#"{
            "streams": [{"width": 640, "height": 480, "r_frame_rate": "0/0", "duration": "2.0"}]
        }"#;
        let meta = parse_probe_output(raw).unwrap();
        assert_eq!(meta.frame_rate, FALLBACK_FRAME_RATE);
    }

    #[test]
    fn sources_without_video_stream_fail_to_load() {
        let raw = br#"{"streams": [], "format": {"duration": "3.0"}}"#;
        assert!(matches!(
            parse_probe_output(raw),
            Err(ConvertError::Load { .. })
        ));
    }

    #[test]
    fn sources_without_duration_fail_to_load() {
        let raw = br#"{"streams": [{"width": 640, "height": 480, "r_frame_rate": "30/1"}]}"#;
        assert!(matches!(
            parse_probe_output(raw),
            Err(ConvertError::Load { .. })
        ));
    }
}

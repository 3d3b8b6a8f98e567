//! Example: drive the conversion pipeline with a procedural source.
//!
//! No ffmpeg needed: the source synthesizes a moving diagonal gradient,
//! which is enough to watch the whole driver (progress, previews,
//! character mapping) do its work.
//!
//! Run with: cargo run --example synthetic_source

use vascii::{
    convert_video, AudioHandle, CancelToken, ConversionOptions, ConvertError, ProgressPhase,
    Raster, SourceMetadata, VideoSource,
};

/// A deterministic source: each frame is a diagonal gradient whose phase
/// advances with the cursor.
struct GradientSource {
    meta: SourceMetadata,
    cursor: f64,
}

impl GradientSource {
    fn new() -> Self {
        Self {
            meta: SourceMetadata {
                width: 320,
                height: 240,
                duration: 2.0,
                frame_rate: 30.0,
            },
            cursor: 0.0,
        }
    }
}

impl VideoSource for GradientSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.meta
    }

    fn current_time(&self) -> f64 {
        self.cursor
    }

    fn seek(&mut self, timestamp: f64) -> Result<(), ConvertError> {
        self.cursor = timestamp.clamp(0.0, self.meta.duration);
        Ok(())
    }

    fn current_raster(&mut self) -> Result<Raster, ConvertError> {
        let phase = (self.cursor * 128.0) as u32;
        let mut data = Vec::with_capacity((self.meta.width * self.meta.height * 4) as usize);
        for y in 0..self.meta.height {
            for x in 0..self.meta.width {
                let v = ((x + y + phase) % 256) as u8;
                data.extend_from_slice(&[v, v / 2, 255 - v, 255]);
            }
        }
        Raster::from_rgba(self.meta.width, self.meta.height, data).ok_or(ConvertError::Decode {
            timestamp: self.cursor,
            reason: "gradient buffer size mismatch".to_string(),
        })
    }

    fn audio_handle(&mut self) -> Result<Option<AudioHandle>, ConvertError> {
        Ok(None)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut source = GradientSource::new();
    let options = ConversionOptions::default()
        .with_target_width(72)
        .with_audio(false);
    let token = CancelToken::new();

    let video = convert_video(
        &mut source,
        &options,
        |progress| {
            if progress.phase == ProgressPhase::ConvertingFrames && progress.preview.is_some() {
                println!(
                    "{} (preview: {} bytes)",
                    progress.message,
                    progress.preview.as_ref().map(Vec::len).unwrap_or(0)
                );
            }
        },
        &token,
    )?;

    println!(
        "Converted {} frames at {} fps\n",
        video.frames.len(),
        video.fps
    );

    // Print the first frame so there is something to look at.
    if let Some(frame) = video.frames.first() {
        print!("{}", frame.to_text());
    }

    Ok(())
}

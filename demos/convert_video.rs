//! Example: convert a video into ASCII frames using vascii as a library
//!
//! Run with: cargo run --example convert_video

use std::path::Path;
use vascii::{
    write_frames, AsciiConverter, CancelToken, ConversionOptions, OutputMode, ProgressPhase,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create a converter with the built-in configuration
    let converter = AsciiConverter::new();

    // Configure the job
    let options = ConversionOptions::default()
        .with_target_width(120)
        .with_frame_skip(2)
        .with_charset(vascii::CHARSET_STANDARD);

    let input = Path::new("tests/video/input/test.mp4");
    let output_dir = Path::new("demo_video_output");

    if input.exists() {
        println!("Converting video to ASCII frames...");
        println!("Input: {}", input.display());
        println!("Output: {}", output_dir.display());

        let token = CancelToken::new();
        let video = converter.convert_file(
            input,
            &options,
            |progress| {
                if progress.phase == ProgressPhase::ConvertingFrames {
                    println!(
                        "Converting frame {} of ~{} ({:.1}%)",
                        progress.completed, progress.total, progress.percent
                    );
                }
            },
            &token,
        )?;

        println!("✓ {} frames at {} fps", video.frames.len(), video.fps);
        write_frames(&video, output_dir, &OutputMode::TextAndColor)?;
        println!("✓ ASCII frames saved to {}", output_dir.display());
    } else {
        println!("Note: {} not found.", input.display());
        println!("To use this example, provide a video file at that path.");
    }

    Ok(())
}

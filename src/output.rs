//! Persisting a finished conversion for an external player.
//!
//! Frames are written as `frame_NNNN` files: plain `.txt` for monochrome
//! playback, and a combined `.cframe` binary carrying both the characters
//! and their colors.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::frame::{AsciiFrame, AsciiVideo, AudioHandle};

/// Controls what files a persisted conversion produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Only `.txt` files (plain ASCII).
    TextOnly,
    /// Only `.cframe` files (combined text + color binary).
    ColorOnly,
    /// Both `.txt` and `.cframe` files.
    TextAndColor,
}

/// Write every frame of `video` into `dir`, numbered from `frame_0001`.
/// Returns the number of frames written.
pub fn write_frames(video: &AsciiVideo, dir: &Path, mode: &OutputMode) -> Result<usize> {
    fs::create_dir_all(dir)?;
    for (idx, frame) in video.frames.iter().enumerate() {
        let stem = format!("frame_{:04}", idx + 1);
        if matches!(mode, OutputMode::TextOnly | OutputMode::TextAndColor) {
            fs::write(dir.join(format!("{stem}.txt")), frame.to_text())?;
        }
        if matches!(mode, OutputMode::ColorOnly | OutputMode::TextAndColor) {
            write_cframe(frame, &dir.join(format!("{stem}.cframe")))?;
        }
    }
    Ok(video.frames.len())
}

/// Combined binary frame format (.cframe): text + color in one file.
/// Header (8 bytes): width (u32 LE) + height (u32 LE).
/// Body (width * height * 4 bytes): char (u8) + r + g + b per cell,
/// row-major.
pub fn write_cframe(frame: &AsciiFrame, path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(&frame.width.to_le_bytes())?;
    file.write_all(&frame.height.to_le_bytes())?;
    for (ch, color) in frame.characters.iter().zip(&frame.colors) {
        file.write_all(&[*ch as u8, color.r, color.g, color.b])?;
    }
    Ok(())
}

/// Copy the extracted audio track into the output directory as `audio.mp3`.
pub fn copy_audio(audio: &AudioHandle, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let dest = dir.join("audio.mp3");
    fs::copy(&audio.path, &dest)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;

    fn sample_video() -> AsciiVideo {
        let frame = AsciiFrame {
            width: 2,
            height: 2,
            characters: vec!['#', '.', ' ', '@'],
            colors: vec![
                Rgb::new(1, 2, 3),
                Rgb::new(4, 5, 6),
                Rgb::new(7, 8, 9),
                Rgb::WHITE,
            ],
        };
        AsciiVideo {
            frames: vec![frame.clone(), frame],
            fps: 15.0,
            audio: None,
        }
    }

    #[test]
    fn text_mode_writes_numbered_txt_frames() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_frames(&sample_video(), dir.path(), &OutputMode::TextOnly).unwrap();
        assert_eq!(written, 2);
        let content = fs::read_to_string(dir.path().join("frame_0001.txt")).unwrap();
        assert_eq!(content, "#.\n @\n");
        assert!(dir.path().join("frame_0002.txt").exists());
        assert!(!dir.path().join("frame_0001.cframe").exists());
    }

    #[test]
    fn cframe_layout_is_header_plus_four_bytes_per_cell() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(&sample_video(), dir.path(), &OutputMode::ColorOnly).unwrap();
        let bytes = fs::read(dir.path().join("frame_0001.cframe")).unwrap();
        assert_eq!(bytes.len(), 8 + 2 * 2 * 4);
        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &[b'#', 1, 2, 3]);
        assert_eq!(&bytes[12..16], &[b'.', 4, 5, 6]);
    }

    #[test]
    fn combined_mode_writes_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(&sample_video(), dir.path(), &OutputMode::TextAndColor).unwrap();
        assert!(dir.path().join("frame_0001.txt").exists());
        assert!(dir.path().join("frame_0001.cframe").exists());
    }

    #[test]
    fn audio_copy_lands_as_audio_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("track.mp3");
        fs::write(&src, b"not really mp3").unwrap();
        let handle = AudioHandle { path: src };
        let out = dir.path().join("frames");
        let dest = copy_audio(&handle, &out).unwrap();
        assert_eq!(dest, out.join("audio.mp3"));
        assert_eq!(fs::read(dest).unwrap(), b"not really mp3");
    }
}

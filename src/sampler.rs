//! Per-cell aggregation of source pixels.
//!
//! Each character cell covers a rectangular footprint of source pixels. The
//! sampler averages a strided subsample of that footprint instead of every
//! pixel, trading a little accuracy for a large speedup on high-resolution
//! sources.

use crate::frame::{Raster, Rgb};

/// Rec. 601 luma weights: each channel's contribution to perceived
/// brightness.
pub const R_LUMINANCE: f32 = 0.299;
pub const G_LUMINANCE: f32 = 0.587;
pub const B_LUMINANCE: f32 = 0.114;

/// Pixels are visited at this stride on both axes inside a cell footprint.
const SAMPLE_STRIDE: u32 = 2;

/// Aggregate measurement of one character cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    /// Mean luminance of the sampled pixels, in `[0, 255]`.
    pub brightness: f32,
    /// Per-channel mean color of the same pixels, each channel floored.
    pub color: Rgb,
}

/// Average brightness and color over a strided subsample of the cell's
/// source-space footprint, bounded by the raster edges.
///
/// A footprint that yields zero samples (degenerate cell size, or an origin
/// at or past the raster edge) resolves to brightness 0 on white. That is a
/// defined fallback, not an error.
pub fn sample_cell(
    raster: &Raster,
    origin_x: u32,
    origin_y: u32,
    cell_width: u32,
    cell_height: u32,
) -> CellSample {
    let end_x = origin_x.saturating_add(cell_width).min(raster.width());
    let end_y = origin_y.saturating_add(cell_height).min(raster.height());

    let mut total_brightness = 0.0f32;
    let (mut total_r, mut total_g, mut total_b) = (0u64, 0u64, 0u64);
    let mut samples = 0u64;

    let mut y = origin_y;
    while y < end_y {
        let mut x = origin_x;
        while x < end_x {
            let (r, g, b, _) = raster.pixel(x, y);
            total_brightness +=
                R_LUMINANCE * r as f32 + G_LUMINANCE * g as f32 + B_LUMINANCE * b as f32;
            total_r += u64::from(r);
            total_g += u64::from(g);
            total_b += u64::from(b);
            samples += 1;
            x += SAMPLE_STRIDE;
        }
        y += SAMPLE_STRIDE;
    }

    if samples == 0 {
        return CellSample {
            brightness: 0.0,
            color: Rgb::WHITE,
        };
    }

    CellSample {
        brightness: total_brightness / samples as f32,
        // Integer division floors each channel.
        color: Rgb {
            r: (total_r / samples) as u8,
            g: (total_g / samples) as u8,
            b: (total_b / samples) as u8,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster_from_pixels(width: u32, height: u32, pixels: &[(u8, u8, u8)]) -> Raster {
        let mut data = Vec::with_capacity(pixels.len() * 4);
        for (r, g, b) in pixels {
            data.extend_from_slice(&[*r, *g, *b, 255]);
        }
        Raster::from_rgba(width, height, data).unwrap()
    }

    #[test]
    fn solid_black_cell_is_dark_and_black() {
        let raster = Raster::solid(4, 4, Rgb::BLACK);
        let sample = sample_cell(&raster, 0, 0, 4, 4);
        assert_eq!(sample.brightness, 0.0);
        assert_eq!(sample.color, Rgb::BLACK);
    }

    #[test]
    fn solid_white_cell_is_bright_and_white() {
        let raster = Raster::solid(4, 4, Rgb::WHITE);
        let sample = sample_cell(&raster, 0, 0, 4, 4);
        assert!((sample.brightness - 255.0).abs() < 0.01);
        assert_eq!(sample.color, Rgb::WHITE);
    }

    #[test]
    fn stride_skips_odd_offsets() {
        // Only (0, 0) lies on the stride-2 subgrid of a 2x2 footprint, so
        // the white pixels at odd offsets must not influence the average.
        let raster = raster_from_pixels(
            2,
            2,
            &[(0, 0, 0), (255, 255, 255), (255, 255, 255), (255, 255, 255)],
        );
        let sample = sample_cell(&raster, 0, 0, 2, 2);
        assert_eq!(sample.brightness, 0.0);
        assert_eq!(sample.color, Rgb::BLACK);
    }

    #[test]
    fn channel_means_are_floored() {
        // Sampled pixels at (0, 0) and (2, 0): means r=127.5, g=100.5, b=50.5.
        let raster = raster_from_pixels(
            3,
            1,
            &[(100, 100, 100), (9, 9, 9), (155, 101, 1)],
        );
        let sample = sample_cell(&raster, 0, 0, 3, 1);
        assert_eq!(sample.color, Rgb::new(127, 100, 50));
    }

    #[test]
    fn footprint_is_bounded_by_raster_edges() {
        let raster = Raster::solid(3, 3, Rgb::WHITE);
        // Footprint extends well past the raster; only in-bounds pixels count.
        let sample = sample_cell(&raster, 2, 2, 10, 10);
        assert!((sample.brightness - 255.0).abs() < 0.01);
        assert_eq!(sample.color, Rgb::WHITE);
    }

    #[test]
    fn zero_sample_footprint_falls_back_to_white() {
        let raster = Raster::solid(4, 4, Rgb::BLACK);
        let degenerate = sample_cell(&raster, 0, 0, 0, 0);
        assert_eq!(degenerate.brightness, 0.0);
        assert_eq!(degenerate.color, Rgb::WHITE);

        let past_edge = sample_cell(&raster, 8, 8, 2, 2);
        assert_eq!(past_edge.brightness, 0.0);
        assert_eq!(past_edge.color, Rgb::WHITE);
    }

    #[test]
    fn luminance_weights_apply() {
        let raster = raster_from_pixels(1, 1, &[(255, 0, 0)]);
        let sample = sample_cell(&raster, 0, 0, 1, 1);
        assert!((sample.brightness - 0.299 * 255.0).abs() < 0.01);
    }
}

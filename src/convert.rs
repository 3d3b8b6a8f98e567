//! Whole-frame conversion: one decoded raster in, one [`AsciiFrame`] out.

use rayon::prelude::*;

use crate::frame::{AsciiFrame, Raster, Rgb};
use crate::ramp::CharacterRamp;
use crate::sampler::sample_cell;

/// Terminal characters are roughly twice as tall as they are wide; halving
/// the derived row count keeps the grid's apparent aspect close to the
/// source.
const CHARACTER_ASPECT: f64 = 0.5;

/// Derive the grid height for a target width from the source's native
/// dimensions: `floor(width * (sourceHeight / sourceWidth) * 0.5)`.
/// Computed once per job so every frame shares the same dimensions.
pub fn derive_target_height(target_width: u32, source_width: u32, source_height: u32) -> u32 {
    if source_width == 0 {
        return 0;
    }
    let aspect = source_height as f64 / source_width as f64;
    (target_width as f64 * aspect * CHARACTER_ASPECT).floor() as u32
}

/// Convert one raster into a character grid.
///
/// Cells are laid out row-major; each cell's source-space origin is
/// `(x * xStep, y * yStep)` with integer steps, so the last row and column
/// may be slightly under-sampled when the source does not divide evenly.
/// Rows are independent and computed in parallel.
pub fn frame_to_ascii(
    raster: &Raster,
    target_width: u32,
    target_height: u32,
    ramp: &CharacterRamp,
) -> AsciiFrame {
    let cell_count = target_width as usize * target_height as usize;
    if cell_count == 0 {
        // Degenerate grids (very narrow targets on wide sources) stay
        // structurally valid: zero cells, nothing sampled.
        return AsciiFrame {
            width: target_width,
            height: target_height,
            characters: Vec::new(),
            colors: Vec::new(),
        };
    }

    let x_step = raster.width() / target_width;
    let y_step = raster.height() / target_height;

    let rows: Vec<Vec<(char, Rgb)>> = (0..target_height)
        .into_par_iter()
        .map(|y| {
            (0..target_width)
                .map(|x| {
                    let sample = sample_cell(raster, x * x_step, y * y_step, x_step, y_step);
                    (ramp.char_for(sample.brightness), sample.color)
                })
                .collect()
        })
        .collect();

    let mut characters = Vec::with_capacity(cell_count);
    let mut colors = Vec::with_capacity(cell_count);
    for row in rows {
        for (ch, color) in row {
            characters.push(ch);
            colors.push(color);
        }
    }

    AsciiFrame {
        width: target_width,
        height: target_height,
        characters,
        colors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(charset: &str) -> CharacterRamp {
        CharacterRamp::new(charset).unwrap()
    }

    #[test]
    fn height_derivation_halves_the_aspect() {
        // 640x480 source: aspect 0.75, so 100 columns become 37 rows.
        assert_eq!(derive_target_height(100, 640, 480), 37);
        assert_eq!(derive_target_height(4, 64, 48), 1);
        // Square source at width 80 -> 40 rows.
        assert_eq!(derive_target_height(80, 512, 512), 40);
        assert_eq!(derive_target_height(10, 0, 480), 0);
    }

    #[test]
    fn frame_shape_matches_target_grid() {
        let raster = Raster::solid(64, 48, Rgb::new(40, 80, 120));
        let frame = frame_to_ascii(&raster, 8, 3, &ramp(" .#"));
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.characters.len(), 24);
        assert_eq!(frame.colors.len(), 24);
    }

    #[test]
    fn zero_height_grid_is_empty_but_valid() {
        let raster = Raster::solid(64, 2, Rgb::WHITE);
        let frame = frame_to_ascii(&raster, 1, 0, &ramp(" .#"));
        assert_eq!(frame.width, 1);
        assert_eq!(frame.height, 0);
        assert!(frame.characters.is_empty());
        assert!(frame.colors.is_empty());
    }

    #[test]
    fn solid_black_maps_to_darkest_character() {
        let raster = Raster::solid(40, 30, Rgb::BLACK);
        let frame = frame_to_ascii(&raster, 10, 5, &ramp(" .,:;=+*#@"));
        assert!(frame.characters.iter().all(|&ch| ch == ' '));
        assert!(frame
            .colors
            .iter()
            .all(|color| color.to_string() == "rgb(0, 0, 0)"));
    }

    #[test]
    fn solid_white_maps_to_lightest_character() {
        let raster = Raster::solid(40, 30, Rgb::WHITE);
        let frame = frame_to_ascii(&raster, 10, 5, &ramp(" .,:;=+*#@"));
        assert!(frame.characters.iter().all(|&ch| ch == '@'));
        assert!(frame
            .colors
            .iter()
            .all(|color| color.to_string() == "rgb(255, 255, 255)"));
    }

    #[test]
    fn every_character_comes_from_the_ramp() {
        // A raster with a horizontal brightness gradient.
        let mut data = Vec::new();
        for _y in 0..32 {
            for x in 0..64u32 {
                let v = (x * 4) as u8;
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let raster = Raster::from_rgba(64, 32, data).unwrap();
        let ramp = ramp(" .:#@");
        let frame = frame_to_ascii(&raster, 16, 8, &ramp);
        for ch in &frame.characters {
            assert!(ramp.chars().contains(ch), "character {ch:?} not in ramp");
        }
    }

    #[test]
    fn cells_map_to_their_source_region() {
        // Left half black, right half white; the produced grid must split
        // the same way.
        let mut data = Vec::new();
        for _y in 0..16 {
            for x in 0..32u32 {
                let v = if x < 16 { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let raster = Raster::from_rgba(32, 16, data).unwrap();
        let frame = frame_to_ascii(&raster, 4, 2, &ramp(" #"));
        for y in 0..2 {
            assert_eq!(frame.char_at(0, y), ' ');
            assert_eq!(frame.char_at(1, y), ' ');
            assert_eq!(frame.char_at(2, y), '#');
            assert_eq!(frame.char_at(3, y), '#');
        }
    }

    #[test]
    fn upscaling_target_falls_back_to_defaults() {
        // Target wider than the source: zero-sized footprints resolve to
        // the defined fallback (darkest character on white).
        let raster = Raster::solid(4, 4, Rgb::new(200, 200, 200));
        let frame = frame_to_ascii(&raster, 8, 2, &ramp(" .#"));
        assert!(frame.characters.iter().all(|&ch| ch == ' '));
        assert!(frame.colors.iter().all(|&color| color == Rgb::WHITE));
    }
}

//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! [`clahe`] equalizes a grayscale image tile by tile. Each tile's
//! histogram is clipped at `clip_limit` times the uniform bin height and
//! the excess is spread evenly over all bins before building the tile's
//! mapping; pixels are then remapped by bilinear interpolation between
//! the four nearest tile mappings.
//!
//! When the image size is not a multiple of the grid, the histograms see
//! the image extended on the right and bottom by mirror reflection
//! (without repeating the edge pixel). Every tile then has the same area
//! and the grid has exactly the requested number of tiles.
//!
//! [`equalize_luminance`] applies it to the L channel of L\*a\*b\* only,
//! leaving chroma untouched, and recomposes the RGB image.

use image::{GrayImage, Luma};

use crate::color::{self, Lab};
use crate::policy::ContrastParams;
use crate::types::RgbImage;

const BINS: usize = 256;

/// Equalize local contrast on the lightness channel of `image`.
#[must_use = "returns the equalized image"]
pub fn equalize_luminance(image: &RgbImage, params: ContrastParams) -> RgbImage {
    let (w, h) = image.dimensions();
    let labs: Vec<Lab> = image.pixels().map(|p| color::rgb_to_lab(p.0)).collect();

    let lightness = GrayImage::from_fn(w, h, |x, y| {
        let lab = labs[(y * w + x) as usize];
        Luma([color::to_u8(lab.l * 255.0 / 100.0)])
    });
    let equalized = clahe(&lightness, params.clip_limit, params.tile_grid);

    RgbImage::from_fn(w, h, |x, y| {
        let lab = labs[(y * w + x) as usize];
        let l = f32::from(equalized.get_pixel(x, y).0[0]) * 100.0 / 255.0;
        image::Rgb(color::lab_to_rgb(Lab { l, ..lab }))
    })
}

/// CLAHE on a grayscale image.
///
/// `tile_grid` is `(columns, rows)`; it is reduced when the image is
/// smaller than the grid. A non-positive `clip_limit` disables clipping,
/// which degenerates to plain tile-wise histogram equalization.
#[must_use = "returns the equalized image"]
pub fn clahe(gray: &GrayImage, clip_limit: f32, tile_grid: (u32, u32)) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let tiles_x = tile_grid.0.clamp(1, w);
    let tiles_y = tile_grid.1.clamp(1, h);
    let tile = (w.div_ceil(tiles_x), h.div_ceil(tiles_y));

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            luts.push(tile_lut(gray, (tx * tile.0, ty * tile.1), tile, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    #[allow(clippy::cast_precision_loss)]
    let (inv_tw, inv_th) = (1.0 / tile.0 as f32, 1.0 / tile.1 as f32);

    GrayImage::from_fn(w, h, |x, y| {
        let v = usize::from(gray.get_pixel(x, y).0[0]);

        let (tx1, tx2, xa) = neighbours(x, inv_tw, tiles_x);
        let (ty1, ty2, ya) = neighbours(y, inv_th, tiles_y);

        let top = f32::from(lut_at(tx1, ty1)[v])
            .mul_add(1.0 - xa, f32::from(lut_at(tx2, ty1)[v]) * xa);
        let bottom = f32::from(lut_at(tx1, ty2)[v])
            .mul_add(1.0 - xa, f32::from(lut_at(tx2, ty2)[v]) * xa);
        Luma([color::to_u8(top.mul_add(1.0 - ya, bottom * ya))])
    })
}

/// The two tile indices bracketing pixel coordinate `pos` along one
/// axis, and the interpolation weight of the second.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
fn neighbours(pos: u32, inv_tile: f32, tiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32).mul_add(inv_tile, -0.5);
    let first = f.floor();
    let weight = f - first;
    let first = first as i64;
    let last = i64::from(tiles - 1);
    let lo = first.clamp(0, last) as u32;
    let hi = (first + 1).clamp(0, last) as u32;
    (lo, hi, weight)
}

/// Mirror `pos` into `0..len` without repeating the edge sample
/// (`len = 4`: `3, 4, 5, 6 -> 3, 2, 1, 0`).
const fn reflect(pos: u32, len: u32) -> u32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let pos = pos % period;
    if pos < len { pos } else { period - pos }
}

/// Build the clipped-histogram equalization mapping for one tile.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn tile_lut(
    gray: &GrayImage,
    (x0, y0): (u32, u32),
    (tile_w, tile_h): (u32, u32),
    clip_limit: f32,
) -> [u8; BINS] {
    let (w, h) = gray.dimensions();
    let mut hist = [0u32; BINS];
    for y in y0..y0 + tile_h {
        for x in x0..x0 + tile_w {
            let v = gray.get_pixel(reflect(x, w), reflect(y, h)).0[0];
            hist[usize::from(v)] += 1;
        }
    }
    let area = tile_w * tile_h;

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        let mut excess = 0u32;
        for bin in &mut hist {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }

        let batch = excess / BINS as u32;
        let residual = (excess % BINS as u32) as usize;
        for bin in &mut hist {
            *bin += batch;
        }
        if residual > 0 {
            let step = (BINS / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        cumulative += count;
        *entry = color::to_u8(cumulative as f32 * scale);
    }
    lut
}

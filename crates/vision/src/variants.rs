//! Preprocessed renderings of one page, each submitted to OCR on its own.

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::{box_filter, median_filter};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Grayscale,
    LocalContrast,
    AdaptiveMean,
    Otsu,
}

impl VariantKind {
    pub const ALL: [VariantKind; 4] = [
        VariantKind::Grayscale,
        VariantKind::LocalContrast,
        VariantKind::AdaptiveMean,
        VariantKind::Otsu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Grayscale => "grayscale",
            VariantKind::LocalContrast => "local_contrast",
            VariantKind::AdaptiveMean => "adaptive_mean",
            VariantKind::Otsu => "otsu",
        }
    }
}

/// One rendering, re-expanded to three channels.
#[derive(Debug, Clone)]
pub struct Variant {
    pub kind: VariantKind,
    pub image: RgbImage,
}

const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_TILES: u32 = 8;
/// Adaptive threshold block is 31x31.
const ADAPTIVE_RADIUS: u32 = 15;
const ADAPTIVE_OFFSET: i16 = 10;

/// Grayscale plus a mild denoise; the base every variant is derived from.
pub fn grayscale_base(image: &RgbImage) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    median_filter(&gray, 1, 1)
}

/// Builds the variant set in a fixed order: grayscale, local contrast,
/// adaptive mean threshold, Otsu threshold.
pub fn build_variants(image: &RgbImage) -> Vec<Variant> {
    let base = grayscale_base(image);
    VariantKind::ALL
        .iter()
        .map(|&kind| {
            let rendered = match kind {
                VariantKind::Grayscale => base.clone(),
                VariantKind::LocalContrast => local_contrast(&base, CLAHE_CLIP_LIMIT, CLAHE_TILES),
                VariantKind::AdaptiveMean => adaptive_mean_threshold(&base, ADAPTIVE_RADIUS, ADAPTIVE_OFFSET),
                VariantKind::Otsu => otsu_threshold(&base),
            };
            Variant {
                kind,
                image: DynamicImage::ImageLuma8(rendered).to_rgb8(),
            }
        })
        .collect()
}

/// Binary threshold at a per-pixel local mean minus `offset`.
pub fn adaptive_mean_threshold(gray: &GrayImage, radius: u32, offset: i16) -> GrayImage {
    let means = box_filter(gray, radius, radius);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, px) in gray.enumerate_pixels() {
        let local = means.get_pixel(x, y)[0] as i16 - offset;
        let v = if px[0] as i16 > local { 255 } else { 0 };
        out.put_pixel(x, y, Luma([v]));
    }
    out
}

/// Binary threshold at the global Otsu level.
pub fn otsu_threshold(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let mut out = gray.clone();
    for px in out.pixels_mut() {
        px[0] = if px[0] > level { 255 } else { 0 };
    }
    out
}

/// Contrast-limited adaptive histogram equalization over a `tiles`×`tiles` grid.
///
/// Each tile gets a clipped, equalized lookup table; pixels blend the tables
/// of the four nearest tile centres bilinearly.
pub fn local_contrast(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let tiles_x = tiles.min(w).max(1);
    let tiles_y = tiles.min(h).max(1);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        let (y0, y1) = span(ty, h, tiles_y);
        for tx in 0..tiles_x {
            let (x0, x1) = span(tx, w, tiles_x);
            luts[(ty * tiles_x + tx) as usize] = tile_lut(gray, (x0, y0, x1, y1), clip_limit);
        }
    }

    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;
    let mut out = GrayImage::new(w, h);
    for (x, y, px) in gray.enumerate_pixels() {
        let (tx0, tx1, fx) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, fy) = neighbours(y, tile_h, tiles_y);
        let v = px[0] as usize;
        let at = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
        let top = at(tx0, ty0) * (1.0 - fx) + at(tx1, ty0) * fx;
        let bottom = at(tx0, ty1) * (1.0 - fx) + at(tx1, ty1) * fx;
        let blended = top * (1.0 - fy) + bottom * fy;
        out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Half-open pixel range of tile `index` when `extent` is cut into `count`
/// tiles. Ranges never overlap and are non-empty while `count <= extent`.
fn span(index: u32, extent: u32, count: u32) -> (u32, u32) {
    (index * extent / count, (index + 1) * extent / count)
}

fn tile_lut(gray: &GrayImage, (x0, y0, x1, y1): (u32, u32, u32, u32), clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = x1.saturating_sub(x0) * y1.saturating_sub(y0);
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[i] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Indices of the two tiles whose centres bracket `pos`, and the blend weight.
fn neighbours(pos: u32, tile: f32, count: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = (f.floor() as u32).min(count - 1);
    let hi = (lo + 1).min(count - 1);
    (lo, hi, f - lo as f32)
}

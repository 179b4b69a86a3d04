//! Image preprocessing: contrast normalization, baseline alignment,
//! color-space conversion, background filtering.
//!
//! This module is the only producer of [`ThermalFrame`]. The analysis stages
//! downstream treat its output as read-only.

mod register;

pub use register::register_affine;

use image::{imageops, GrayImage, Rgb, RgbImage};

use crate::error::{AnalysisError, Result};
use crate::frame::ThermalFrame;

/// Preprocess a maintenance frame without a baseline.
pub fn prepare_frame(maintenance: &RgbImage) -> Result<ThermalFrame> {
    check_dimensions(maintenance)?;
    let normalized = normalize_contrast(maintenance);
    let (hue, sat, val) = rgb_to_normalized_hsv(&normalized);
    ThermalFrame::new(normalized, hue, sat, val, None)
}

/// Preprocess a maintenance frame against a baseline frame.
///
/// The maintenance frame is contrast-normalized, resized into the baseline's
/// dimensions and affine-registered onto it; the baseline's value plane is
/// carried along for delta comparison. Registration failure degrades to the
/// resized-but-unaligned frame and is not an error.
pub fn prepare_frame_with_baseline(
    baseline: &RgbImage,
    maintenance: &RgbImage,
) -> Result<ThermalFrame> {
    check_dimensions(baseline)?;
    check_dimensions(maintenance)?;
    let baseline_norm = normalize_contrast(baseline);
    let maintenance_norm = normalize_contrast(maintenance);
    let resized = resize_to_match(&baseline_norm, &maintenance_norm);
    let aligned = register_affine(&baseline_norm, &resized);
    let (_, _, baseline_val) = rgb_to_normalized_hsv(&baseline_norm);
    let (hue, sat, val) = rgb_to_normalized_hsv(&aligned);
    ThermalFrame::new(aligned, hue, sat, val, Some(baseline_val))
}

fn check_dimensions(rgb: &RgbImage) -> Result<()> {
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(AnalysisError::EmptyFrame { width, height });
    }
    Ok(())
}

/// Normalize contrast by histogram-equalizing the HSV value channel.
///
/// Hue and saturation pass through unchanged, so the thermal color structure
/// of the frame is preserved while brightness is spread over the full range.
pub fn normalize_contrast(rgb: &RgbImage) -> RgbImage {
    let (width, height) = rgb.dimensions();
    let mut value = GrayImage::new(width, height);
    for (x, y, px) in rgb.enumerate_pixels() {
        let [r, g, b] = px.0;
        value.put_pixel(x, y, image::Luma([r.max(g).max(b)]));
    }
    let equalized = imageproc::contrast::equalize_histogram(&value);

    let mut out = RgbImage::new(width, height);
    for (x, y, px) in rgb.enumerate_pixels() {
        let [r, g, b] = px.0;
        let (h, s, _) = rgb_pixel_to_hsv(r, g, b);
        let v = f32::from(equalized.get_pixel(x, y).0[0]) / 255.0;
        out.put_pixel(x, y, Rgb(hsv_pixel_to_rgb(h, s, v)));
    }
    out
}

/// Resize `img` into the dimensions of `reference` with area-averaging
/// resampling when shrinking, bilinear when enlarging.
pub fn resize_to_match(reference: &RgbImage, img: &RgbImage) -> RgbImage {
    let (target_w, target_h) = reference.dimensions();
    let (src_w, src_h) = img.dimensions();
    if (target_w, target_h) == (src_w, src_h) {
        return img.clone();
    }
    if target_w <= src_w && target_h <= src_h {
        box_resize(img, target_w, target_h)
    } else {
        imageops::resize(img, target_w, target_h, imageops::FilterType::Triangle)
    }
}

/// Box-average downscale: every output pixel is the mean of the source
/// pixels its footprint covers.
fn box_resize(img: &RgbImage, out_w: u32, out_h: u32) -> RgbImage {
    let (in_w, in_h) = img.dimensions();
    let scale_x = f64::from(in_w) / f64::from(out_w);
    let scale_y = f64::from(in_h) / f64::from(out_h);

    let mut out = RgbImage::new(out_w, out_h);
    for oy in 0..out_h {
        let y0 = (f64::from(oy) * scale_y).floor() as u32;
        let y1 = ((f64::from(oy + 1) * scale_y).ceil() as u32).clamp(y0 + 1, in_h);
        for ox in 0..out_w {
            let x0 = (f64::from(ox) * scale_x).floor() as u32;
            let x1 = ((f64::from(ox + 1) * scale_x).ceil() as u32).clamp(x0 + 1, in_w);

            let mut acc = [0u64; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = img.get_pixel(x, y).0;
                    acc[0] += u64::from(p[0]);
                    acc[1] += u64::from(p[1]);
                    acc[2] += u64::from(p[2]);
                }
            }
            let n = u64::from(x1 - x0) * u64::from(y1 - y0);
            out.put_pixel(
                ox,
                oy,
                Rgb([
                    ((acc[0] + n / 2) / n) as u8,
                    ((acc[1] + n / 2) / n) as u8,
                    ((acc[2] + n / 2) / n) as u8,
                ]),
            );
        }
    }
    out
}

/// Convert an RGB buffer into normalized HSV planes, each channel in `[0, 1]`.
///
/// Hue is circular: 0 and 1 both represent red.
pub fn rgb_to_normalized_hsv(rgb: &RgbImage) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let n = rgb.width() as usize * rgb.height() as usize;
    let mut hue = Vec::with_capacity(n);
    let mut sat = Vec::with_capacity(n);
    let mut val = Vec::with_capacity(n);
    for px in rgb.pixels() {
        let [r, g, b] = px.0;
        let (h, s, v) = rgb_pixel_to_hsv(r, g, b);
        hue.push(h);
        sat.push(s);
        val.push(v);
    }
    (hue, sat, val)
}

/// Estimate the slowly-varying background of a scalar channel plane with a
/// rank (median) filter.
///
/// The plane round-trips through 8-bit quantization around the median
/// filter; a localized hot spot is then measured as a deviation from the
/// returned background.
pub fn background_filter(plane: &[f32], width: u32, height: u32, kernel_size: u32) -> Vec<f32> {
    let raw: Vec<u8> = plane
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let gray = GrayImage::from_raw(width, height, raw).expect("plane length matches dimensions");
    let radius = kernel_size / 2;
    let filtered = imageproc::filter::median_filter(&gray, radius, radius);
    filtered
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) / 255.0)
        .collect()
}

pub(crate) fn rgb_pixel_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta <= 0.0 {
        0.0
    } else if max == r {
        (((g - b) / delta).rem_euclid(6.0)) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    (h, s, v)
}

pub(crate) fn hsv_pixel_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let sector = (h6.floor() as i32).rem_euclid(6);
    let f = h6 - h6.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}

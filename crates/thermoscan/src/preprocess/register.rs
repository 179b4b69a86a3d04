//! Affine baseline registration.
//!
//! Estimates a 2x3 affine transform that maximizes the enhanced correlation
//! coefficient between the grayscale versions of a reference (baseline) and a
//! candidate (maintenance) frame, then warps the candidate into reference
//! coordinates with an inverse map. Registration is best-effort: any
//! numerical failure degrades to the unwarped candidate, never an error.

use image::{Rgb, RgbImage};
use nalgebra::{SMatrix, SVector};

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_EPS: f64 = 1e-6;
const MIN_OVERLAP_PIXELS: usize = 32;
const MIN_VARIANCE: f64 = 1e-12;

/// Row-major 2x3 affine warp mapping reference coordinates into candidate
/// coordinates: `(sx, sy) = (a11 x + a12 y + tx, a21 x + a22 y + ty)`.
type Warp = [f64; 6];

const IDENTITY: Warp = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

/// Register `candidate` onto `reference` (both already the same size).
///
/// Returns the warped candidate on success, or the candidate unchanged when
/// the correlation refinement fails to produce a usable transform.
pub fn register_affine(reference: &RgbImage, candidate: &RgbImage) -> RgbImage {
    if reference.dimensions() != candidate.dimensions() {
        tracing::warn!(
            "registration skipped: reference {:?} vs candidate {:?}",
            reference.dimensions(),
            candidate.dimensions()
        );
        return candidate.clone();
    }
    let (width, height) = reference.dimensions();
    let ref_gray = luminance_plane(reference);
    let cand_gray = luminance_plane(candidate);

    match estimate_affine(&ref_gray, &cand_gray, width as usize, height as usize) {
        Some(warp) => warp_rgb(candidate, &warp),
        None => {
            tracing::warn!("affine registration did not converge; continuing unaligned");
            candidate.clone()
        }
    }
}

fn luminance_plane(rgb: &RgbImage) -> Vec<f64> {
    rgb.pixels()
        .map(|px| {
            let [r, g, b] = px.0;
            (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0
        })
        .collect()
}

/// Gauss-Newton refinement of the 6 affine parameters, maximizing the
/// zero-mean correlation between the reference and the warped candidate.
fn estimate_affine(reference: &[f64], candidate: &[f64], w: usize, h: usize) -> Option<Warp> {
    let (grad_x, grad_y) = central_gradients(candidate, w, h);

    let mut warp = IDENTITY;
    let mut last_rho = f64::NEG_INFINITY;

    for _ in 0..MAX_ITERATIONS {
        let mut n = 0.0f64;
        let mut sum_ir = 0.0;
        let mut sum_iw = 0.0;
        let mut sum_ir2 = 0.0;
        let mut sum_iw2 = 0.0;
        let mut sum_iriw = 0.0;
        let mut sg = SVector::<f64, 6>::zeros();
        let mut sgg = SMatrix::<f64, 6, 6>::zeros();
        let mut sg_ir = SVector::<f64, 6>::zeros();
        let mut sg_iw = SVector::<f64, 6>::zeros();

        for y in 0..h {
            let yf = y as f64;
            for x in 0..w {
                let xf = x as f64;
                let sx = warp[0] * xf + warp[1] * yf + warp[2];
                let sy = warp[3] * xf + warp[4] * yf + warp[5];
                let Some(iw) = sample_plane(candidate, w, h, sx, sy) else {
                    continue;
                };
                let gx = sample_plane(&grad_x, w, h, sx, sy).unwrap_or(0.0);
                let gy = sample_plane(&grad_y, w, h, sx, sy).unwrap_or(0.0);
                let ir = reference[y * w + x];

                let g = SVector::<f64, 6>::from([gx * xf, gx * yf, gx, gy * xf, gy * yf, gy]);
                n += 1.0;
                sum_ir += ir;
                sum_iw += iw;
                sum_ir2 += ir * ir;
                sum_iw2 += iw * iw;
                sum_iriw += ir * iw;
                sg += g;
                sgg += g * g.transpose();
                sg_ir += g * ir;
                sg_iw += g * iw;
            }
        }

        if (n as usize) < MIN_OVERLAP_PIXELS {
            return None;
        }
        let mean_ir = sum_ir / n;
        let mean_iw = sum_iw / n;
        let var_ir = sum_ir2 - n * mean_ir * mean_ir;
        let var_iw = sum_iw2 - n * mean_iw * mean_iw;
        if var_ir <= MIN_VARIANCE || var_iw <= MIN_VARIANCE {
            return None;
        }
        let dot = sum_iriw - n * mean_ir * mean_iw;
        let rho = dot / (var_ir * var_iw).sqrt();
        if (rho - last_rho).abs() < CONVERGENCE_EPS {
            break;
        }
        last_rho = rho;

        // Zero-mean normal equations over the valid overlap.
        let g_mean = sg / n;
        let hessian = sgg - g_mean * sg.transpose();
        let g_dot_iw = sg_iw - sg * mean_iw;
        let g_dot_ir = sg_ir - sg * mean_ir;

        let lu = hessian.lu();
        let hinv_gw = lu.solve(&g_dot_iw)?;
        let num = var_iw - g_dot_iw.dot(&hinv_gw);
        let den = dot - g_dot_ir.dot(&hinv_gw);
        if den <= 0.0 {
            return None;
        }
        let lambda = num / den;
        let residual = g_dot_ir * lambda - g_dot_iw;
        let delta = lu.solve(&residual)?;

        for (p, d) in warp.iter_mut().zip(delta.iter()) {
            *p += d;
        }
        if warp.iter().any(|v| !v.is_finite()) {
            return None;
        }
    }

    Some(warp)
}

fn central_gradients(plane: &[f64], w: usize, h: usize) -> (Vec<f64>, Vec<f64>) {
    let mut gx = vec![0.0; plane.len()];
    let mut gy = vec![0.0; plane.len()];
    for y in 0..h {
        let ym = y.saturating_sub(1);
        let yp = (y + 1).min(h - 1);
        for x in 0..w {
            let xm = x.saturating_sub(1);
            let xp = (x + 1).min(w - 1);
            let idx = y * w + x;
            gx[idx] = (plane[y * w + xp] - plane[y * w + xm]) / 2.0;
            gy[idx] = (plane[yp * w + x] - plane[ym * w + x]) / 2.0;
        }
    }
    (gx, gy)
}

/// Bilinear sample with edge clamping; `None` outside the image.
fn sample_plane(plane: &[f64], w: usize, h: usize, x: f64, y: f64) -> Option<f64> {
    if !(x >= 0.0 && y >= 0.0 && x <= (w - 1) as f64 && y <= (h - 1) as f64) {
        return None;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let top = plane[y0 * w + x0] * (1.0 - fx) + plane[y0 * w + x1] * fx;
    let bottom = plane[y1 * w + x0] * (1.0 - fx) + plane[y1 * w + x1] * fx;
    Some(top * (1.0 - fy) + bottom * fy)
}

/// Inverse-map warp: every output pixel samples the candidate at its warped
/// location; samples falling outside the candidate are black.
fn warp_rgb(img: &RgbImage, warp: &Warp) -> RgbImage {
    let (width, height) = img.dimensions();
    let w = width as usize;
    let h = height as usize;

    let mut channels: [Vec<f64>; 3] = [
        Vec::with_capacity(w * h),
        Vec::with_capacity(w * h),
        Vec::with_capacity(w * h),
    ];
    for px in img.pixels() {
        channels[0].push(f64::from(px.0[0]));
        channels[1].push(f64::from(px.0[1]));
        channels[2].push(f64::from(px.0[2]));
    }

    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        let yf = f64::from(y);
        for x in 0..width {
            let xf = f64::from(x);
            let sx = warp[0] * xf + warp[1] * yf + warp[2];
            let sy = warp[3] * xf + warp[4] * yf + warp[5];
            let px = match sample_plane(&channels[0], w, h, sx, sy) {
                Some(r) => {
                    let g = sample_plane(&channels[1], w, h, sx, sy).unwrap_or(0.0);
                    let b = sample_plane(&channels[2], w, h, sx, sy).unwrap_or(0.0);
                    Rgb([
                        r.round().clamp(0.0, 255.0) as u8,
                        g.round().clamp(0.0, 255.0) as u8,
                        b.round().clamp(0.0, 255.0) as u8,
                    ])
                }
                None => Rgb([0, 0, 0]),
            };
            out.put_pixel(x, y, px);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_image(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = 128.0
                + 60.0 * (x as f32 * 0.3).sin() * (y as f32 * 0.2).cos()
                + 30.0 * ((x + y) as f32 * 0.17).sin();
            let v = v.clamp(0.0, 255.0) as u8;
            *px = Rgb([v, v, v]);
        }
        img
    }

    #[test]
    fn identical_images_register_to_identity() {
        let img = textured_image(48, 40);
        let out = register_affine(&img, &img);
        for (a, b) in img.pixels().zip(out.pixels()) {
            let diff = i32::from(a.0[0]) - i32::from(b.0[0]);
            assert!(diff.abs() <= 1, "identity warp should preserve pixels");
        }
    }

    #[test]
    fn flat_image_degrades_to_unaligned_copy() {
        let reference = RgbImage::from_pixel(32, 32, Rgb([100, 100, 100]));
        let candidate = RgbImage::from_pixel(32, 32, Rgb([140, 140, 140]));
        let out = register_affine(&reference, &candidate);
        assert_eq!(out, candidate);
    }

    #[test]
    fn mismatched_dimensions_degrade_to_candidate() {
        let reference = textured_image(32, 32);
        let candidate = textured_image(40, 32);
        let out = register_affine(&reference, &candidate);
        assert_eq!(out, candidate);
    }

    #[test]
    fn small_translation_is_recovered() {
        let reference = textured_image(64, 56);
        // Shift the reference content right/down by one pixel to build the
        // candidate; registration should pull it back.
        let mut candidate = RgbImage::new(64, 56);
        for (x, y, px) in candidate.enumerate_pixels_mut() {
            let sx = x.saturating_sub(1);
            let sy = y.saturating_sub(1);
            *px = *reference.get_pixel(sx, sy);
        }
        let out = register_affine(&reference, &candidate);

        // Compare away from the borders where warp padding applies.
        let mut total_err = 0u64;
        let mut count = 0u64;
        for y in 4..52u32 {
            for x in 4..60u32 {
                let a = i64::from(reference.get_pixel(x, y).0[0]);
                let b = i64::from(out.get_pixel(x, y).0[0]);
                total_err += a.abs_diff(b);
                count += 1;
            }
        }
        let mean_err = total_err as f64 / count as f64;
        assert!(
            mean_err < 6.0,
            "registered image should track the reference, mean err {mean_err}"
        );
    }

    #[test]
    fn sample_plane_clamps_edges_and_rejects_outside() {
        let plane = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(sample_plane(&plane, 2, 2, 0.0, 0.0), Some(1.0));
        assert_eq!(sample_plane(&plane, 2, 2, 1.0, 1.0), Some(4.0));
        assert!(sample_plane(&plane, 2, 2, -0.1, 0.0).is_none());
        assert!(sample_plane(&plane, 2, 2, 0.0, 1.1).is_none());
    }
}

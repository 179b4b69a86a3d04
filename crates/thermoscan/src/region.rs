//! Candidate regions and bounding-box geometry.

use serde::{Deserialize, Serialize};

/// Axis-aligned integer box as supplied by a candidate provider.
///
/// Coordinates may lie partially or entirely outside the frame; the engine
/// never trusts provider-side geometry and clips before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip into a `frame_width` x `frame_height` frame.
    ///
    /// The result always satisfies `x < frame_width`, `y < frame_height`,
    /// `width >= 1`, `height >= 1`, `x + width <= frame_width` and
    /// `y + height <= frame_height`. Degenerate boxes clamp to 1x1.
    ///
    /// Frame dimensions must be non-zero; [`crate::ThermalFrame`] guarantees
    /// this for every frame it hands out.
    pub fn clip(self, frame_width: u32, frame_height: u32) -> RegionBounds {
        debug_assert!(frame_width > 0 && frame_height > 0);
        let fw = i64::from(frame_width);
        let fh = i64::from(frame_height);
        let x = i64::from(self.x).clamp(0, fw - 1);
        let y = i64::from(self.y).clamp(0, fh - 1);
        let width = i64::from(self.width).clamp(1, fw - x);
        let height = i64::from(self.height).clamp(1, fh - y);
        RegionBounds {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        }
    }
}

/// A bounding box clipped into frame bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionBounds {
    /// Bounds covering a whole frame.
    pub fn full_frame(frame_width: u32, frame_height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame_width,
            height: frame_height,
        }
    }

    /// Pixel count of the box itself.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Elongation of the box: longer side over shorter side, always >= 1.
    pub fn aspect_ratio(self) -> f64 {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height).max(1);
        f64::from(long) / f64::from(short)
    }
}

/// Where a candidate region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Proposed by the external object detector.
    External,
    /// Discovered by global fallback segmentation.
    Fallback,
}

/// A candidate region to be confirmed or rejected by thermal analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateRegion {
    pub bbox: BoundingBox,
    /// Provider confidence in [0, 1].
    pub confidence: f32,
    pub origin: CandidateOrigin,
}

impl CandidateRegion {
    /// Candidate proposed by the external detector.
    pub fn external(bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            origin: CandidateOrigin::External,
        }
    }

    /// Candidate discovered by fallback segmentation.
    pub fn fallback(bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            origin: CandidateOrigin::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(bounds: RegionBounds, fw: u32, fh: u32) {
        assert!(bounds.x < fw);
        assert!(bounds.y < fh);
        assert!(bounds.width >= 1);
        assert!(bounds.height >= 1);
        assert!(bounds.x + bounds.width <= fw);
        assert!(bounds.y + bounds.height <= fh);
    }

    #[test]
    fn clip_keeps_interior_box_unchanged() {
        let b = BoundingBox::new(10, 20, 30, 40).clip(100, 100);
        assert_eq!(
            b,
            RegionBounds {
                x: 10,
                y: 20,
                width: 30,
                height: 40
            }
        );
    }

    #[test]
    fn clip_satisfies_invariant_for_awkward_boxes() {
        let frame = (64u32, 48u32);
        let cases = [
            BoundingBox::new(-10, -10, 5, 5),
            BoundingBox::new(200, 200, 10, 10),
            BoundingBox::new(60, 40, 100, 100),
            BoundingBox::new(0, 0, 0, 0),
            BoundingBox::new(-5, 10, -3, 2),
            BoundingBox::new(63, 47, 1, 1),
            BoundingBox::new(i32::MIN, i32::MAX, i32::MAX, i32::MIN),
        ];
        for bbox in cases {
            assert_invariant(bbox.clip(frame.0, frame.1), frame.0, frame.1);
        }
    }

    #[test]
    fn degenerate_box_clamps_to_unit_size() {
        let b = BoundingBox::new(10, 10, 0, -4).clip(32, 32);
        assert_eq!(b.width, 1);
        assert_eq!(b.height, 1);
    }

    #[test]
    fn aspect_ratio_is_at_least_one() {
        let wide = RegionBounds {
            x: 0,
            y: 0,
            width: 50,
            height: 10,
        };
        let tall = RegionBounds {
            x: 0,
            y: 0,
            width: 10,
            height: 50,
        };
        assert!((wide.aspect_ratio() - 5.0).abs() < 1e-12);
        assert!((tall.aspect_ratio() - 5.0).abs() < 1e-12);
        let square = RegionBounds {
            x: 0,
            y: 0,
            width: 7,
            height: 7,
        };
        assert!((square.aspect_ratio() - 1.0).abs() < 1e-12);
    }
}

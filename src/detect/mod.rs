//! 2D line segment detection.
//!
//! The reconstruction pipeline only needs segments; any detector implementing
//! [`SegmentDetector`] can feed it. [`GradientLineDetector`] is the built-in
//! implementation:
//!
//! 1. Downscale so the larger image side is at most `max_image_width`.
//! 2. Sobel gradients and region growing over aligned pixels.
//! 3. PCA fit per region; endpoints from the projection extent.
//! 4. Rescale to original coordinates, drop segments not longer than
//!    `diagonal * min_length_factor`, order longest first and cap the count.

mod gradient;
mod region;

pub use gradient::{sobel_gradients, Gradients};

use crate::types::LineSegment;
use image::imageops::{self, FilterType};
use image::GrayImage;
use region::{GrowParams, RegionGrower};
use serde::{Deserialize, Serialize};

pub trait SegmentDetector {
    fn detect(&self, image: &GrayImage) -> Vec<LineSegment>;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Larger image side used for detection (pixels).
    pub max_image_width: u32,
    /// Maximum number of segments kept per image.
    pub max_segments: usize,
    /// Minimum Sobel magnitude for region pixels (intensities in [0, 1]).
    pub magnitude_threshold: f32,
    /// Orientation tolerance around the seed (degrees).
    pub angle_tolerance_deg: f32,
    pub min_region_pixels: usize,
    pub min_aligned_fraction: f32,
    /// Minimum segment length relative to the image diagonal.
    pub min_length_factor: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_image_width: 1920,
            max_segments: 3000,
            magnitude_threshold: 0.25,
            angle_tolerance_deg: 22.5,
            min_region_pixels: 12,
            min_aligned_fraction: 0.6,
            min_length_factor: crate::view::MIN_LINE_LENGTH_FACTOR,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GradientLineDetector {
    pub options: DetectorOptions,
}

impl GradientLineDetector {
    pub fn new(options: DetectorOptions) -> Self {
        Self { options }
    }
}

impl SegmentDetector for GradientLineDetector {
    fn detect(&self, image: &GrayImage) -> Vec<LineSegment> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let opts = &self.options;
        let max_dim = w.max(h);
        let max_width = opts.max_image_width.max(1);

        let resized;
        let (work, upscale_x, upscale_y) = if max_dim > max_width {
            let s = max_width as f64 / max_dim as f64;
            let nw = ((w as f64 * s).round() as u32).max(1);
            let nh = ((h as f64 * s).round() as u32).max(1);
            resized = imageops::resize(image, nw, nh, FilterType::Triangle);
            (&resized, w as f64 / nw as f64, h as f64 / nh as f64)
        } else {
            (image, 1.0, 1.0)
        };

        let grad = sobel_gradients(work);
        let params = GrowParams {
            magnitude_threshold: opts.magnitude_threshold,
            angle_tolerance: opts.angle_tolerance_deg.to_radians(),
            min_region_pixels: opts.min_region_pixels.max(2),
            min_aligned_fraction: opts.min_aligned_fraction,
        };
        let raw = RegionGrower::new(&grad, params).extract();

        let diagonal = ((w as f64).powi(2) + (h as f64).powi(2)).sqrt();
        let min_len = diagonal * opts.min_length_factor;
        let mut segments: Vec<LineSegment> = raw
            .into_iter()
            .map(|s| {
                LineSegment::new(
                    [s.p1[0] * upscale_x, s.p1[1] * upscale_y],
                    [s.p2[0] * upscale_x, s.p2[1] * upscale_y],
                )
            })
            .filter(|s| s.length() > min_len)
            .collect();
        segments.sort_by(|a, b| b.length().total_cmp(&a.length()));
        segments.truncate(opts.max_segments);

        log::debug!(
            "GradientLineDetector: {}x{} -> {} segments",
            w,
            h,
            segments.len()
        );
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square_image(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let inside = x >= w / 4 && x < 3 * w / 4 && y >= h / 4 && y < 3 * h / 4;
            Luma([if inside { 220 } else { 30 }])
        })
    }

    #[test]
    fn finds_square_edges() {
        let det = GradientLineDetector::default();
        let segments = det.detect(&square_image(160, 120));
        assert!(segments.len() >= 4, "got {}", segments.len());
        for pair in segments.windows(2) {
            assert!(pair[0].length() >= pair[1].length());
        }
        assert!(segments[0].length() > 50.0);
    }

    #[test]
    fn downscaled_detection_maps_back_to_original_frame() {
        let det = GradientLineDetector::new(DetectorOptions {
            max_image_width: 160,
            ..Default::default()
        });
        let segments = det.detect(&square_image(320, 240));
        assert!(!segments.is_empty());
        let longest = segments[0];
        assert!(longest.length() > 120.0, "length {}", longest.length());
        for p in [longest.p1, longest.p2] {
            assert!(p[0] >= 0.0 && p[0] <= 320.0);
            assert!(p[1] >= 0.0 && p[1] <= 240.0);
        }
    }

    #[test]
    fn caps_segment_count() {
        let det = GradientLineDetector::new(DetectorOptions {
            max_segments: 2,
            ..Default::default()
        });
        assert_eq!(det.detect(&square_image(160, 120)).len(), 2);
    }

    #[test]
    fn flat_image_has_no_segments() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(GradientLineDetector::default().detect(&img).is_empty());
    }
}

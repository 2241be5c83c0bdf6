//! Sobel gradients on a single-channel float buffer.
//!
//! Border pixels are handled by clamping. Orientation is the gradient angle
//! `atan2(gy, gx)` folded into [0, π).

use image::GrayImage;

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Per-pixel gradient buffers, row-major with stride `width`.
#[derive(Clone, Debug)]
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub gx: Vec<f32>,
    pub gy: Vec<f32>,
    /// `sqrt(gx^2 + gy^2)` on intensities scaled to [0, 1].
    pub mag: Vec<f32>,
}

impl Gradients {
    #[inline]
    pub fn orientation(&self, idx: usize) -> f32 {
        normalize_half_pi(self.gy[idx].atan2(self.gx[idx]))
    }
}

/// Fold an angle into [0, π).
#[inline]
pub fn normalize_half_pi(angle: f32) -> f32 {
    angle.rem_euclid(std::f32::consts::PI)
}

/// Smallest difference between two π-periodic orientations.
#[inline]
pub fn orientation_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).abs() % std::f32::consts::PI;
    d.min(std::f32::consts::PI - d)
}

pub fn sobel_gradients(img: &GrayImage) -> Gradients {
    let w = img.width() as usize;
    let h = img.height() as usize;
    let n = w * h;
    let mut gx = vec![0.0f32; n];
    let mut gy = vec![0.0f32; n];
    let mut mag = vec![0.0f32; n];
    if n == 0 {
        return Gradients {
            width: w,
            height: h,
            gx,
            gy,
            mag,
        };
    }

    let data: Vec<f32> = img.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, &yy) in y_idx.iter().enumerate() {
                let row = &data[yy * w..(yy + 1) * w];
                for (kx, &xx) in x_idx.iter().enumerate() {
                    sum_x += row[xx] * SOBEL_KERNEL_X[ky][kx];
                    sum_y += row[xx] * SOBEL_KERNEL_Y[ky][kx];
                }
            }
            let idx = y * w + x;
            gx[idx] = sum_x;
            gy[idx] = sum_y;
            mag[idx] = (sum_x * sum_x + sum_y * sum_y).sqrt();
        }
    }

    Gradients {
        width: w,
        height: h,
        gx,
        gy,
        mag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn vertical_edge_has_horizontal_gradient() {
        let img = GrayImage::from_fn(8, 8, |x, _| if x < 4 { Luma([0]) } else { Luma([255]) });
        let g = sobel_gradients(&img);
        let idx = 3 * 8 + 4;
        assert!(g.mag[idx] > 1.0);
        assert!(g.gy[idx].abs() < 1e-6);
        assert!(g.orientation(idx).abs() < 1e-6);
        assert_eq!(g.mag[3 * 8 + 1], 0.0);
    }

    #[test]
    fn orientation_difference_wraps() {
        let pi = std::f32::consts::PI;
        assert!((orientation_difference(0.05, pi - 0.05) - 0.1).abs() < 1e-5);
        assert!((orientation_difference(0.3, 0.1) - 0.2).abs() < 1e-6);
    }
}

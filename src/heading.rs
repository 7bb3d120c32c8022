// src/heading.rs
//
// Ground-color heading heuristic. Much simpler than the correlation
// pipeline: it shares only the radial angle scoring idea. The frame is
// converted to YUV, mean-pooled, masked by three independent color
// bands, and masked cells vote for the nearest of a small set of
// candidate ray angles fanning over the half-plane above bottom-center.

use crate::types::{Frame, HeadingConfig};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HeadingError {
    #[error("heading angle {angle:.3} rad outside the valid half-plane [0, pi]")]
    AngleOutOfRange { angle: f64 },
}

pub struct HeadingHeuristic {
    config: HeadingConfig,
    ray_angles: Vec<f64>,
    heading: f64,
}

impl HeadingHeuristic {
    /// Candidate ray angles are fixed at construction; any angle outside
    /// [0, pi] is rejected here rather than at frame time.
    pub fn new(config: HeadingConfig) -> Result<Self, HeadingError> {
        let n = config.ray_count.max(1);
        let ray_angles: Vec<f64> = (0..n)
            .map(|k| {
                if n == 1 {
                    config.ray_min
                } else {
                    config.ray_min
                        + (config.ray_max - config.ray_min) * k as f64 / (n - 1) as f64
                }
            })
            .collect();
        for &angle in &ray_angles {
            if !(0.0..=std::f64::consts::PI).contains(&angle) {
                return Err(HeadingError::AngleOutOfRange { angle });
            }
        }
        Ok(Self {
            config,
            ray_angles,
            heading: std::f64::consts::FRAC_PI_2,
        })
    }

    /// Current low-pass filtered heading, radians; pi/2 is straight up
    /// the image (straight ahead), before any frame has been seen.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Score a frame and fold the winning ray into the filtered heading.
    /// On error the previous heading is left untouched.
    pub fn update(&mut self, frame: &Frame) -> Result<f64, HeadingError> {
        let (mask, mask_cols, mask_rows) = self.ground_mask(frame);
        let center_col = mask_cols as f64 / 2.0;

        let mut scores = vec![0.0f64; self.ray_angles.len()];
        let mut masked_cells = 0usize;
        for row in 0..mask_rows {
            for col in 0..mask_cols {
                if !mask[row * mask_cols + col] {
                    continue;
                }
                masked_cells += 1;
                // angle from bottom-center through the cell, in
                // full-resolution pixel units
                let dy = ((mask_rows - row) * self.config.pool_rows) as f64;
                let dx = (col as f64 - center_col) * self.config.pool_cols as f64;
                let angle = dy.atan2(dx);
                let ray = self.nearest_ray(angle)?;
                scores[ray] += 1.0;
            }
        }

        if masked_cells == 0 {
            // no ground class visible, nothing to steer towards
            debug!("empty ground mask, heading unchanged");
            return Ok(self.heading);
        }

        let best = scores
            .iter()
            .zip(&self.config.ray_weights)
            .map(|(s, w)| s * w)
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)
            .unwrap_or(self.ray_angles.len() / 2);

        let alpha = self.config.alpha;
        self.heading = alpha * self.ray_angles[best] + (1.0 - alpha) * self.heading;

        debug!(
            masked_cells,
            best_ray = self.ray_angles[best],
            heading = self.heading,
            "heading updated"
        );
        Ok(self.heading)
    }

    /// Index of the candidate ray closest to `angle`. The angle must lie
    /// in the half-plane [0, pi] above the image bottom.
    pub fn nearest_ray(&self, angle: f64) -> Result<usize, HeadingError> {
        if !(0.0..=std::f64::consts::PI).contains(&angle) {
            return Err(HeadingError::AngleOutOfRange { angle });
        }
        let idx = self
            .ray_angles
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - angle).abs().total_cmp(&(*b - angle).abs()))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        Ok(idx)
    }

    /// Mean-pooled YUV mask: a cell belongs to the ground class when all
    /// three pooled channels fall inside their configured bands.
    fn ground_mask(&self, frame: &Frame) -> (Vec<bool>, usize, usize) {
        let pool_rows = self.config.pool_rows.max(1);
        let pool_cols = self.config.pool_cols.max(1);
        let mask_rows = frame.height / pool_rows;
        let mask_cols = frame.width / pool_cols;

        let mut mask = vec![false; mask_rows * mask_cols];
        for cell_row in 0..mask_rows {
            for cell_col in 0..mask_cols {
                let mut sum = [0.0f32; 3];
                for y in cell_row * pool_rows..(cell_row + 1) * pool_rows {
                    for x in cell_col * pool_cols..(cell_col + 1) * pool_cols {
                        let [r, g, b] = frame.pixel(x, y);
                        let (yy, u, v) = rgb_to_yuv(r as f32, g as f32, b as f32);
                        sum[0] += yy;
                        sum[1] += u;
                        sum[2] += v;
                    }
                }
                let count = (pool_rows * pool_cols) as f32;
                let mean = [sum[0] / count, sum[1] / count, sum[2] / count];
                mask[cell_row * mask_cols + cell_col] = in_band(mean[0], self.config.y_band)
                    && in_band(mean[1], self.config.u_band)
                    && in_band(mean[2], self.config.v_band);
            }
        }
        (mask, mask_cols, mask_rows)
    }
}

/// BT.601 RGB to YUV, chroma offset +128.
#[inline]
pub fn rgb_to_yuv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = -0.16874 * r - 0.33126 * g + 0.5 * b + 128.0;
    let v = 0.5 * r - 0.41869 * g - 0.08131 * b + 128.0;
    (y, u, v)
}

#[inline]
fn in_band(value: f32, band: [f32; 2]) -> bool {
    value >= band[0] && value <= band[1]
}

// src/correlation.rs
//
// Patch-normalized cross-correlation along a sample line. Patch i from
// the reference frame is scored against patch j from the comparison
// frame for every pair inside the search window, building one N x N
// similarity matrix per line. Works directly on the raw RGB bytes.

use crate::sampling::SampleLine;
use crate::types::{CorrelationConfig, Frame};

/// N x N score table for one line. Entries that could not be computed
/// (patch out of bounds, zero-norm patch, outside the search window)
/// hold NaN and are excluded from every downstream statistic.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    scores: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            scores: vec![f32::NAN; n * n],
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.scores[i * self.n + j]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, score: f32) {
        self.scores[i * self.n + j] = score;
    }

    /// Valid entries of row i as (column, score).
    pub fn valid_row(&self, i: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.scores[i * self.n..(i + 1) * self.n]
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_nan())
            .map(|(j, &s)| (j, s))
    }
}

pub struct PatchCorrelator {
    kernel_height: usize,
    kernel_width: usize,
    /// Pairs with |i - j| >= window / 2 are skipped when set
    search_window: Option<usize>,
}

impl PatchCorrelator {
    pub fn new(config: &CorrelationConfig, search_window: Option<usize>) -> Self {
        Self {
            kernel_height: config.kernel_height,
            kernel_width: config.kernel_width,
            search_window,
        }
    }

    /// Correlate the line's samples between the reference frame (row
    /// index) and the comparison frame (column index).
    pub fn correlate_line(
        &self,
        reference: &Frame,
        comparison: &Frame,
        line: &SampleLine,
    ) -> SimilarityMatrix {
        let n = line.len();
        let mut matrix = SimilarityMatrix::new(n);

        // Reference patches are reused across the whole row
        let reference_patches: Vec<Option<Vec<f32>>> = line
            .positions
            .iter()
            .map(|&(x, y)| self.normalized_patch(reference, x, y))
            .collect();

        for (j, &(x, y)) in line.positions.iter().enumerate() {
            let Some(comparison_patch) = self.normalized_patch(comparison, x, y) else {
                continue;
            };
            for (i, reference_patch) in reference_patches.iter().enumerate() {
                if let Some(window) = self.search_window {
                    if i.abs_diff(j) >= window / 2 {
                        continue;
                    }
                }
                if let Some(reference_patch) = reference_patch {
                    matrix.set(i, j, dot(reference_patch, comparison_patch.as_slice()));
                }
            }
        }

        matrix
    }

    /// Extract the kernel-sized patch centered at (cx, cy), all three
    /// channels, divided by its own L2 norm. Returns None when the patch
    /// would cross the frame border or has zero norm (uniform black);
    /// neither case may leak a NaN or infinity into the score.
    fn normalized_patch(&self, frame: &Frame, cx: i32, cy: i32) -> Option<Vec<f32>> {
        let half_h = (self.kernel_height / 2) as i32;
        let half_w = (self.kernel_width / 2) as i32;

        let top = cy - half_h;
        let left = cx - half_w;
        let bottom = top + self.kernel_height as i32;
        let right = left + self.kernel_width as i32;

        if top < 0 || left < 0 || bottom > frame.height as i32 || right > frame.width as i32 {
            return None;
        }

        let mut patch = Vec::with_capacity(self.kernel_height * self.kernel_width * 3);
        for y in top..bottom {
            let row_start = (y as usize * frame.width + left as usize) * 3;
            let row_end = row_start + self.kernel_width * 3;
            patch.extend(frame.data[row_start..row_end].iter().map(|&v| v as f32));
        }

        let norm = patch.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return None;
        }
        for value in &mut patch {
            *value /= norm;
        }
        Some(patch)
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::{DependencyAxis, SampleLine};
    use crate::types::CorrelationConfig;

    /// Deterministic textured frame so patches are non-degenerate.
    fn textured_frame(width: usize, height: usize, shift_x: i32) -> Frame {
        let mut data = vec![0u8; width * height * 3];
        for y in 0..height {
            for x in 0..width {
                let sx = (x as i32 - shift_x).rem_euclid(width as i32) as usize;
                let v = noise(sx, y);
                let idx = (y * width + x) * 3;
                data[idx] = v;
                data[idx + 1] = v.wrapping_mul(3);
                data[idx + 2] = v.wrapping_add(97);
            }
        }
        Frame::new(data, width, height, 0)
    }

    fn noise(x: usize, y: usize) -> u8 {
        let mut h = (x as u64).wrapping_mul(6364136223846793005).wrapping_add(y as u64);
        h ^= h >> 13;
        h = h.wrapping_mul(1274126177);
        (h >> 24) as u8
    }

    fn straight_line(y: i32, xs: impl Iterator<Item = i32>) -> SampleLine {
        SampleLine {
            origin: (0.0, y as f32),
            direction: (1.0, 0.0),
            dependency: DependencyAxis::Lateral,
            positions: xs.map(|x| (x, y)).collect(),
        }
    }

    fn correlator(window: Option<usize>) -> PatchCorrelator {
        PatchCorrelator::new(
            &CorrelationConfig {
                kernel_height: 8,
                kernel_width: 8,
            },
            window,
        )
    }

    #[test]
    fn identical_patches_score_one() {
        let frame = textured_frame(100, 50, 0);
        let line = straight_line(25, (10..90).step_by(10));
        let matrix = correlator(None).correlate_line(&frame, &frame, &line);

        for i in 0..line.len() {
            assert!((matrix.get(i, i) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn out_of_bounds_patch_is_invalid() {
        let frame = textured_frame(100, 50, 0);
        // first position is too close to the left border for an 8x8 patch
        let line = straight_line(25, [2, 20, 40, 60].into_iter());
        let matrix = correlator(None).correlate_line(&frame, &frame, &line);

        assert!(matrix.get(0, 0).is_nan());
        assert!(matrix.get(0, 1).is_nan());
        assert!(matrix.get(1, 0).is_nan());
        assert!(!matrix.get(1, 1).is_nan());
    }

    #[test]
    fn zero_norm_patch_is_invalid() {
        let width = 100;
        let height = 50;
        // all-black region on the left half, texture on the right
        let mut frame = textured_frame(width, height, 0);
        for y in 0..height {
            for x in 0..50 {
                let idx = (y * width + x) * 3;
                frame.data[idx] = 0;
                frame.data[idx + 1] = 0;
                frame.data[idx + 2] = 0;
            }
        }
        let line = straight_line(25, [20, 70, 80].into_iter());
        let matrix = correlator(None).correlate_line(&frame, &frame, &line);

        assert!(matrix.get(0, 0).is_nan());
        assert!(matrix.get(0, 1).is_nan());
        assert!((matrix.get(1, 1) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn search_window_masks_far_pairs() {
        let frame = textured_frame(200, 50, 0);
        let line = straight_line(25, (10..190).step_by(10));
        let matrix = correlator(Some(8)).correlate_line(&frame, &frame, &line);

        // |i - j| < 4 evaluated, everything else skipped
        assert!(!matrix.get(5, 8).is_nan());
        assert!(matrix.get(5, 9).is_nan());
        assert!(matrix.get(0, 10).is_nan());
    }

    #[test]
    fn scores_stay_in_unit_range() {
        let a = textured_frame(100, 50, 0);
        let b = textured_frame(100, 50, 3);
        let line = straight_line(25, (10..90).step_by(5));
        let matrix = correlator(None).correlate_line(&a, &b, &line);

        for i in 0..line.len() {
            for (_, score) in matrix.valid_row(i) {
                assert!((0.0..=1.0 + 1e-6).contains(&score));
            }
        }
    }
}

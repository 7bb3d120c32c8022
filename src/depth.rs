// src/depth.rs
//
// Turns one line's similarity matrix into sparse depth and confidence
// samples, then merges all lines of a frame into the shared maps.

use crate::correlation::SimilarityMatrix;
use crate::maps::ScalarMap;
use crate::sampling::SampleLine;
use crate::types::DepthConfig;

/// One sparse write produced by a line.
#[derive(Debug, Clone, Copy)]
pub struct DepthSample {
    pub x: i32,
    pub y: i32,
    pub depth: f32,
    pub confidence: f32,
}

/// Depth and confidence maps for one frame plus an explicit per-pixel
/// write mask. Depth 0.0 (offset 0) is a legitimate estimate, so
/// written-ness has to be tracked separately from the values.
#[derive(Debug, Clone)]
pub struct DepthEvidence {
    depth: ScalarMap,
    confidence: ScalarMap,
    written: Vec<bool>,
}

impl DepthEvidence {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            depth: ScalarMap::new(width, height),
            confidence: ScalarMap::new(width, height),
            written: vec![false; width * height],
        }
    }

    pub fn depth(&self) -> &ScalarMap {
        &self.depth
    }

    pub fn confidence(&self) -> &ScalarMap {
        &self.confidence
    }

    pub fn is_written(&self, x: usize, y: usize) -> bool {
        self.written[y * self.depth.width() + x]
    }

    /// Unconditional write; the merge policy decides whether to call it.
    pub fn record(&mut self, x: usize, y: usize, depth: f32, confidence: f32) {
        self.depth.set(x, y, depth);
        self.confidence.set(x, y, confidence);
        self.written[y * self.depth.width() + x] = true;
    }

    /// Every written cell as (x, y, depth), zero depths included.
    pub fn written_cells(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.depth
            .cells()
            .filter(|&(x, y, _)| self.is_written(x, y))
    }
}

pub struct DepthEstimator {
    config: DepthConfig,
}

impl DepthEstimator {
    pub fn new(config: DepthConfig) -> Self {
        Self { config }
    }

    /// Per sample index i: best-matching column among the valid scores
    /// of row i (ties broken towards the lowest index). The index offset
    /// |i - j*| becomes the depth proxy; the margin of the best score
    /// over the row mean becomes the confidence. Rows without valid
    /// scores, or with a flat profile, contribute nothing.
    pub fn estimate_line(&self, line: &SampleLine, matrix: &SimilarityMatrix) -> Vec<DepthSample> {
        let n = matrix.size();
        debug_assert_eq!(n, line.len());
        let mut samples = Vec::new();

        for i in 0..n {
            let mut best_j = None;
            let mut best_score = f32::NEG_INFINITY;
            let mut sum = 0.0f32;
            let mut sum_sq = 0.0f32;
            let mut count = 0usize;

            for (j, score) in matrix.valid_row(i) {
                if score > best_score {
                    best_score = score;
                    best_j = Some(j);
                }
                sum += score;
                sum_sq += score * score;
                count += 1;
            }

            let Some(best_j) = best_j else {
                continue;
            };

            let mean = sum / count as f32;
            let variance = (sum_sq / count as f32 - mean * mean).max(0.0);
            if variance.sqrt() < self.config.min_row_std {
                // flat correlation profile carries no evidence
                continue;
            }

            let offset = i.abs_diff(best_j) as f32;
            let depth = (self.config.max_depth * offset / (n - 1) as f32)
                .clamp(0.0, self.config.max_depth);
            let confidence = best_score - mean;

            let (x, y) = line.positions[i];
            samples.push(DepthSample {
                x,
                y,
                depth,
                confidence,
            });
        }

        samples
    }

    /// Fold sparse samples into the shared evidence. Collisions at a
    /// pixel touched by more than one line resolve max-confidence-wins,
    /// which is deterministic no matter what order the lines were
    /// evaluated in.
    pub fn merge(&self, samples: &[DepthSample], evidence: &mut DepthEvidence) {
        for sample in samples {
            if sample.x < 0
                || sample.y < 0
                || sample.x as usize >= evidence.depth().width()
                || sample.y as usize >= evidence.depth().height()
            {
                continue;
            }
            let (x, y) = (sample.x as usize, sample.y as usize);
            if !evidence.is_written(x, y) || sample.confidence > evidence.confidence().get(x, y) {
                evidence.record(x, y, sample.depth, sample.confidence);
            }
        }
    }
}

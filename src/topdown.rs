// src/topdown.rs
//
// Bird's-eye remap: every written depth cell places a mark in a
// synthetic top-down strip, depth rescaled into the row index. Columns
// are independent of each other.

use crate::depth::DepthEvidence;
use crate::maps::ScalarMap;
use crate::types::TopDownConfig;

pub struct TopDownProjector {
    rows: usize,
    factor: f32,
    max_depth: f32,
}

impl TopDownProjector {
    pub fn new(config: &TopDownConfig, max_depth: f32) -> Self {
        Self {
            rows: config.rows,
            factor: config.factor,
            max_depth,
        }
    }

    /// Remap per-frame evidence. Goes through the write mask so a cell
    /// whose estimate is exactly 0.0 still places its mark.
    pub fn project(&self, evidence: &DepthEvidence) -> ScalarMap {
        let mut strip = ScalarMap::new(evidence.depth().width(), self.rows);
        for (x, _, depth) in evidence.written_cells() {
            self.mark(&mut strip, x, depth);
        }
        strip
    }

    /// Remap an accumulated map (the temporal memory), where zero means
    /// no surviving evidence.
    pub fn project_map(&self, map: &ScalarMap) -> ScalarMap {
        let mut strip = ScalarMap::new(map.width(), self.rows);
        for (x, _, depth) in map.written_cells() {
            self.mark(&mut strip, x, depth);
        }
        strip
    }

    fn mark(&self, strip: &mut ScalarMap, x: usize, depth: f32) {
        let top_row = self.rows - 1;
        let scaled = depth / self.max_depth * self.factor * top_row as f32;
        let row = (scaled.floor() as usize).min(top_row);
        strip.set(x, row, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TopDownConfig;

    fn evidence_with(cells: &[(usize, usize, f32)]) -> DepthEvidence {
        let mut evidence = DepthEvidence::new(10, 10);
        for &(x, y, depth) in cells {
            evidence.record(x, y, depth, 0.5);
        }
        evidence
    }

    #[test]
    fn depth_lands_on_rescaled_row() {
        let projector = TopDownProjector::new(
            &TopDownConfig {
                rows: 100,
                factor: 1.0,
            },
            200.0,
        );
        // halfway to max depth
        let strip = projector.project(&evidence_with(&[(4, 7, 100.0)]));
        assert_eq!(strip.height(), 100);
        // 100 / 200 * 99 = 49.5 -> row 49
        assert_eq!(strip.get(4, 49), 1.0);
        assert_eq!(strip.written_cells().count(), 1);
    }

    #[test]
    fn rows_clamp_at_strip_height() {
        let projector = TopDownProjector::new(
            &TopDownConfig {
                rows: 50,
                factor: 2.0,
            },
            100.0,
        );
        // factor 2 would overshoot the strip
        let strip = projector.project(&evidence_with(&[(1, 1, 100.0)]));
        assert_eq!(strip.get(1, 49), 1.0);
    }

    #[test]
    fn zero_depth_cell_marks_the_nearest_row() {
        let projector = TopDownProjector::new(
            &TopDownConfig {
                rows: 50,
                factor: 1.0,
            },
            100.0,
        );
        let strip = projector.project(&evidence_with(&[(3, 8, 0.0)]));
        assert_eq!(strip.get(3, 0), 1.0);
        assert_eq!(strip.written_cells().count(), 1);
    }

    #[test]
    fn columns_are_independent() {
        let projector = TopDownProjector::new(
            &TopDownConfig {
                rows: 10,
                factor: 1.0,
            },
            90.0,
        );
        let strip = projector.project(&evidence_with(&[(0, 0, 90.0), (2, 1, 10.0)]));
        assert_eq!(strip.get(0, 9), 1.0);
        assert_eq!(strip.get(2, 1), 1.0);
        assert_eq!(strip.written_cells().count(), 2);
    }

    #[test]
    fn memory_remap_skips_empty_cells() {
        let projector = TopDownProjector::new(
            &TopDownConfig {
                rows: 10,
                factor: 1.0,
            },
            90.0,
        );
        let mut memory = ScalarMap::new(4, 4);
        memory.set(1, 2, 45.0);
        let strip = projector.project_map(&memory);
        assert_eq!(strip.get(1, 4), 1.0);
        assert_eq!(strip.written_cells().count(), 1);
    }
}

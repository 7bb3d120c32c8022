// src/sampling.rs
//
// Produces the ordered patch-center sequences the correlator walks:
// a radial fan from the focus point, a horizontal raster, and optional
// hand-placed lines from the configuration.

use crate::types::{SamplingConfig, SpacingPolicy};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("degenerate sample line from ({0:.1}, {1:.1}) to ({2:.1}, {3:.1}): {4} points")]
    DegenerateLine(f32, f32, f32, f32, usize),
    #[error(
        "manual line arrays disagree: {locations} locations, {directions} directions, {dependencies} dependency flags"
    )]
    MismatchedArrays {
        locations: usize,
        directions: usize,
        dependencies: usize,
    },
    #[error("manual dependency flag must be 0 (forward) or 1 (lateral), got {0}")]
    InvalidDependencyFlag(u8),
}

/// Which egomotion component the apparent motion along a line depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyAxis {
    Forward,
    Lateral,
}

/// Ordered sequence of patch-center positions along one search path.
#[derive(Debug, Clone)]
pub struct SampleLine {
    pub origin: (f32, f32),
    /// Unit direction from origin towards the end point
    pub direction: (f32, f32),
    pub dependency: DependencyAxis,
    pub positions: Vec<(i32, i32)>,
}

impl SampleLine {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub struct LineSampler {
    config: SamplingConfig,
    frame_width: usize,
    frame_height: usize,
}

impl LineSampler {
    pub fn new(config: SamplingConfig, frame_width: usize, frame_height: usize) -> Self {
        Self {
            config,
            frame_width,
            frame_height,
        }
    }

    /// Build one sample line between two points. `speed` is the clamped
    /// body-velocity factor for the line's dependency axis: its sign
    /// reverses the walk direction and, when step scaling is enabled,
    /// its magnitude widens the spacing.
    pub fn sample_line(
        &self,
        start: (f32, f32),
        end: (f32, f32),
        dependency: DependencyAxis,
        speed: f64,
    ) -> Result<SampleLine, SamplingError> {
        let (start, end) = if speed < 0.0 { (end, start) } else { (start, end) };

        let step = if self.config.scale_step_with_speed {
            self.config.step * speed.abs() as f32
        } else {
            self.config.step
        };

        let dx = end.0 - start.0;
        let dy = end.1 - start.1;
        let distance = (dx * dx + dy * dy).sqrt();
        let count = (distance / step).floor() as usize;
        if count < 2 {
            return Err(SamplingError::DegenerateLine(
                start.0, start.1, end.0, end.1, count,
            ));
        }

        let xs = spaced_positions(start.0, end.0, count, self.config.spacing);
        let ys = spaced_positions(start.1, end.1, count, self.config.spacing);
        let positions = xs.into_iter().zip(ys).collect();

        Ok(SampleLine {
            origin: start,
            direction: (dx / distance, dy / distance),
            dependency,
            positions,
        })
    }

    /// Radial fan from the focus point to points on an interior ellipse,
    /// one line per `sweep_resolution_deg` around the full circle.
    pub fn radial_fan(
        &self,
        focus: (f32, f32),
        forward_speed: f64,
    ) -> Result<Vec<SampleLine>, SamplingError> {
        let center_x = self.frame_width as f32 / 2.0;
        let center_y = self.frame_height as f32 / 2.0;
        let semi_x = center_x - self.config.edge_margin;
        let semi_y = center_y - self.config.edge_margin;

        let mut lines = Vec::new();
        let mut angle_deg = 0u32;
        while angle_deg < 360 {
            let angle = (angle_deg as f32).to_radians();
            let end = (
                center_x + semi_x * angle.cos(),
                center_y + semi_y * angle.sin(),
            );
            lines.push(self.sample_line(focus, end, DependencyAxis::Forward, forward_speed)?);
            angle_deg += self.config.sweep_resolution_deg.max(1);
        }
        Ok(lines)
    }

    /// Parallel left-to-right lines every `raster_spacing` rows.
    pub fn horizontal_raster(
        &self,
        lateral_speed: f64,
    ) -> Result<Vec<SampleLine>, SamplingError> {
        let start_x = self.config.edge_margin;
        let end_x = self.frame_width as f32 - self.config.edge_margin;

        let mut lines = Vec::new();
        let mut y = self.config.edge_margin;
        while y < self.frame_height as f32 - self.config.edge_margin {
            lines.push(self.sample_line(
                (start_x, y),
                (end_x, y),
                DependencyAxis::Lateral,
                lateral_speed,
            )?);
            y += self.config.raster_spacing.max(1) as f32;
        }
        Ok(lines)
    }

    /// Hand-placed lines from the configuration's parallel arrays.
    /// Array lengths are validated here, before any frame is processed.
    pub fn manual_lines(
        &self,
        forward_speed: f64,
        lateral_speed: f64,
    ) -> Result<Vec<SampleLine>, SamplingError> {
        let Some(manual) = &self.config.manual else {
            return Ok(Vec::new());
        };

        if manual.locations.len() != manual.directions.len()
            || manual.locations.len() != manual.dependencies.len()
        {
            return Err(SamplingError::MismatchedArrays {
                locations: manual.locations.len(),
                directions: manual.directions.len(),
                dependencies: manual.dependencies.len(),
            });
        }

        let mut lines = Vec::with_capacity(manual.locations.len());
        for ((location, direction), &flag) in manual
            .locations
            .iter()
            .zip(&manual.directions)
            .zip(&manual.dependencies)
        {
            let dependency = match flag {
                0 => DependencyAxis::Forward,
                1 => DependencyAxis::Lateral,
                other => return Err(SamplingError::InvalidDependencyFlag(other)),
            };
            let speed = match dependency {
                DependencyAxis::Forward => forward_speed,
                DependencyAxis::Lateral => lateral_speed,
            };
            let norm = (direction[0] * direction[0] + direction[1] * direction[1]).sqrt();
            if norm == 0.0 {
                return Err(SamplingError::DegenerateLine(
                    location[0],
                    location[1],
                    location[0],
                    location[1],
                    0,
                ));
            }
            let end = (
                location[0] + direction[0] / norm * manual.length,
                location[1] + direction[1] / norm * manual.length,
            );
            lines.push(self.sample_line((location[0], location[1]), end, dependency, speed)?);
        }
        Ok(lines)
    }

    pub fn search_window(&self) -> Option<usize> {
        self.config.search_window
    }
}

/// `count` coordinates from `start` to `end` along one axis. Linear
/// spacing floors a uniform interpolation; logarithmic spacing inverts a
/// floored geometric progression from the end point, so samples bunch up
/// near the end.
fn spaced_positions(start: f32, end: f32, count: usize, spacing: SpacingPolicy) -> Vec<i32> {
    debug_assert!(count >= 2);
    match spacing {
        SpacingPolicy::Linear => (0..count)
            .map(|k| {
                let t = k as f32 / (count - 1) as f32;
                (start + t * (end - start)).floor() as i32
            })
            .collect(),
        SpacingPolicy::Logarithmic => {
            let extent = end - start;
            let magnitude = extent.abs().max(1.0);
            let sign = extent.signum();
            (0..count)
                .map(|k| {
                    // geometric progression from 1 up to the axis extent
                    let g = magnitude.powf(k as f32 / (count - 1) as f32);
                    (end - sign * g.floor()).floor() as i32
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ManualLinesConfig, SamplingConfig, SpacingPolicy};

    fn sampler(config: SamplingConfig) -> LineSampler {
        LineSampler::new(config, 520, 240)
    }

    #[test]
    fn point_count_follows_distance_over_step() {
        let s = sampler(SamplingConfig {
            step: 2.0,
            ..SamplingConfig::default()
        });
        let line = s
            .sample_line((10.0, 20.0), (110.0, 20.0), DependencyAxis::Lateral, 1.0)
            .unwrap();
        // distance 100, step 2
        assert_eq!(line.len(), 50);
        assert_eq!(line.positions[0], (10, 20));
        assert_eq!(*line.positions.last().unwrap(), (110, 20));
    }

    #[test]
    fn zero_length_line_is_rejected() {
        let s = sampler(SamplingConfig::default());
        let err = s
            .sample_line((50.0, 50.0), (50.0, 50.0), DependencyAxis::Forward, 1.0)
            .unwrap_err();
        assert!(matches!(err, SamplingError::DegenerateLine(..)));
    }

    #[test]
    fn too_short_line_is_rejected() {
        let s = sampler(SamplingConfig {
            step: 10.0,
            ..SamplingConfig::default()
        });
        // distance 15 / step 10 -> 1 point
        let err = s
            .sample_line((0.0, 0.0), (15.0, 0.0), DependencyAxis::Forward, 1.0)
            .unwrap_err();
        assert!(matches!(err, SamplingError::DegenerateLine(.., 1)));
    }

    #[test]
    fn linear_spacing_is_monotonic_and_uniform() {
        let positions = spaced_positions(0.0, 90.0, 10, SpacingPolicy::Linear);
        assert_eq!(positions.len(), 10);
        for pair in positions.windows(2) {
            assert_eq!(pair[1] - pair[0], 10);
        }
    }

    #[test]
    fn logarithmic_spacing_bunches_near_end() {
        let positions = spaced_positions(0.0, 128.0, 8, SpacingPolicy::Logarithmic);
        // first sample sits one pixel off the end point
        assert_eq!(positions[0], 127);
        // last sample reaches the start
        assert_eq!(*positions.last().unwrap(), 0);
        // gaps grow towards the start
        let first_gap = (positions[0] - positions[1]).abs();
        let last_gap = (positions[positions.len() - 2] - positions[positions.len() - 1]).abs();
        assert!(last_gap > first_gap);
    }

    #[test]
    fn negative_speed_reverses_walk_direction() {
        let s = sampler(SamplingConfig::default());
        let forward = s
            .sample_line((0.0, 0.0), (100.0, 0.0), DependencyAxis::Lateral, 2.0)
            .unwrap();
        let reverse = s
            .sample_line((0.0, 0.0), (100.0, 0.0), DependencyAxis::Lateral, -2.0)
            .unwrap();
        assert_eq!(forward.positions[0], (0, 0));
        assert_eq!(reverse.positions[0], (100, 0));
        assert_eq!(reverse.direction.0, -1.0);
    }

    #[test]
    fn speed_scaling_widens_step() {
        let s = sampler(SamplingConfig {
            step: 2.0,
            scale_step_with_speed: true,
            ..SamplingConfig::default()
        });
        let slow = s
            .sample_line((0.0, 0.0), (100.0, 0.0), DependencyAxis::Forward, 1.0)
            .unwrap();
        let fast = s
            .sample_line((0.0, 0.0), (100.0, 0.0), DependencyAxis::Forward, 4.0)
            .unwrap();
        assert_eq!(slow.len(), 50);
        assert_eq!(fast.len(), 12);
    }

    #[test]
    fn radial_fan_covers_full_circle() {
        let s = sampler(SamplingConfig {
            sweep_resolution_deg: 30,
            ..SamplingConfig::default()
        });
        let lines = s.radial_fan((260.0, 120.0), 1.0).unwrap();
        assert_eq!(lines.len(), 12);
        for line in &lines {
            assert!(line.len() >= 2);
            assert_eq!(line.dependency, DependencyAxis::Forward);
        }
    }

    #[test]
    fn raster_lines_are_horizontal() {
        let s = sampler(SamplingConfig {
            raster_spacing: 60,
            ..SamplingConfig::default()
        });
        let lines = s.horizontal_raster(1.0).unwrap();
        assert_eq!(lines.len(), 4);
        for line in &lines {
            let y0 = line.positions[0].1;
            assert!(line.positions.iter().all(|&(_, y)| y == y0));
            assert_eq!(line.dependency, DependencyAxis::Lateral);
        }
    }

    #[test]
    fn manual_array_mismatch_is_a_setup_error() {
        let s = sampler(SamplingConfig {
            manual: Some(ManualLinesConfig {
                locations: vec![[260.0, 120.0], [100.0, 100.0]],
                directions: vec![[1.0, 0.0]],
                dependencies: vec![1, 1],
                length: 60.0,
            }),
            ..SamplingConfig::default()
        });
        let err = s.manual_lines(1.0, 1.0).unwrap_err();
        assert!(matches!(err, SamplingError::MismatchedArrays { .. }));
    }

    #[test]
    fn manual_lines_built_from_arrays() {
        let s = sampler(SamplingConfig {
            manual: Some(ManualLinesConfig {
                locations: vec![[260.0, 120.0], [260.0, 60.0]],
                directions: vec![[1.0, 0.0], [0.0, -1.0]],
                dependencies: vec![1, 0],
                length: 40.0,
            }),
            ..SamplingConfig::default()
        });
        let lines = s.manual_lines(1.0, 1.0).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].dependency, DependencyAxis::Lateral);
        assert_eq!(lines[1].dependency, DependencyAxis::Forward);
    }
}

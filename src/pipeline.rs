// src/pipeline.rs
//
// Ties the stages together for one frame pair: egomotion projection,
// line sampling, correlation, depth estimation, temporal memory and the
// bird's-eye remaps. Lines are independent, so correlation and per-line
// depth estimation fan out across the thread pool; merging into the
// shared maps stays sequential and conflict-free.

use std::time::{Duration, Instant};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::correlation::PatchCorrelator;
use crate::depth::{DepthEstimator, DepthEvidence, DepthSample};
use crate::egomotion::{EgomotionProjector, EgomotionSolution};
use crate::heading::HeadingHeuristic;
use crate::maps::ScalarMap;
use crate::memory::TemporalMemory;
use crate::sampling::{DependencyAxis, LineSampler, SampleLine};
use crate::topdown::TopDownProjector;
use crate::types::{Config, Frame, VehicleState};

/// Everything produced for one frame pair, handed to the renderer.
#[derive(Debug)]
pub struct FrameAnalysis {
    pub timestamp_us: u64,
    pub solution: EgomotionSolution,
    /// Lines evaluated this pair, in merge order
    pub lines: Vec<SampleLine>,
    pub evidence: DepthEvidence,
    /// Evidence from the horizontal raster alone; empty when the raster
    /// was shed
    pub horizontal: DepthEvidence,
    /// Snapshot of the temporal memory after this pair's update
    pub memory: ScalarMap,
    pub topdown: ScalarMap,
    pub topdown_memory: ScalarMap,
    pub heading: Option<f64>,
    pub raster_dropped: bool,
    pub elapsed: Duration,
}

/// Running counters, logged once at the end of a run.
#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    pub pairs_processed: usize,
    pub lines_evaluated: usize,
    pub samples_merged: usize,
    pub rasters_dropped: usize,
}

pub struct Pipeline {
    projector: EgomotionProjector,
    sampler: LineSampler,
    correlator: PatchCorrelator,
    estimator: DepthEstimator,
    memory: TemporalMemory,
    topdown: TopDownProjector,
    heading: Option<HeadingHeuristic>,
    deadline: Option<Duration>,
    frame_width: usize,
    frame_height: usize,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(config: &Config, frame_width: usize, frame_height: usize) -> Result<Self> {
        let heading = if config.heading.enabled {
            Some(HeadingHeuristic::new(config.heading.clone())?)
        } else {
            None
        };

        Ok(Self {
            projector: EgomotionProjector::new(config.egomotion.clone(), frame_width, frame_height),
            sampler: LineSampler::new(config.sampling.clone(), frame_width, frame_height),
            correlator: PatchCorrelator::new(&config.correlation, config.sampling.search_window),
            estimator: DepthEstimator::new(config.depth.clone()),
            memory: TemporalMemory::new(
                frame_width,
                frame_height,
                config.memory.decay,
                config.depth.max_depth,
            ),
            topdown: TopDownProjector::new(&config.topdown, config.depth.max_depth),
            heading,
            deadline: config.output.deadline_ms.map(Duration::from_millis),
            frame_width,
            frame_height,
            stats: PipelineStats::default(),
        })
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Process one consecutive frame pair against the vehicle state
    /// nearest to the reference frame's timestamp.
    pub fn process_pair(
        &mut self,
        reference: &Frame,
        comparison: &Frame,
        state: &VehicleState,
    ) -> Result<FrameAnalysis> {
        let start = Instant::now();

        let solution = self.projector.project(state);
        let forward = solution.speed_factor(DependencyAxis::Forward);
        let lateral = solution.speed_factor(DependencyAxis::Lateral);

        // Radial fan and manual lines always run; the horizontal raster
        // is the first stage shed under deadline pressure.
        let mut lines = self.sampler.radial_fan(solution.focus, forward)?;
        lines.extend(self.sampler.manual_lines(forward, lateral)?);
        let sample_sets = self.evaluate(reference, comparison, &lines);

        let mut raster_sets = Vec::new();
        let mut raster_dropped = false;
        match self.deadline {
            Some(deadline) if start.elapsed() >= deadline => {
                raster_dropped = true;
                self.stats.rasters_dropped += 1;
                warn!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "deadline exceeded, dropping horizontal raster"
                );
            }
            _ => {
                let raster = self.sampler.horizontal_raster(lateral)?;
                raster_sets = self.evaluate(reference, comparison, &raster);
                lines.extend(raster);
            }
        }

        let mut evidence = DepthEvidence::new(self.frame_width, self.frame_height);
        for samples in &sample_sets {
            self.estimator.merge(samples, &mut evidence);
            self.stats.samples_merged += samples.len();
        }

        // Raster evidence goes into the shared evidence and, separately,
        // into its own set for the raster-only view.
        let mut horizontal = DepthEvidence::new(self.frame_width, self.frame_height);
        for samples in &raster_sets {
            self.estimator.merge(samples, &mut evidence);
            self.estimator.merge(samples, &mut horizontal);
            self.stats.samples_merged += samples.len();
        }

        self.memory.update(evidence.depth());

        let topdown = self.topdown.project(&evidence);
        let topdown_memory = self.topdown.project_map(self.memory.map());

        // A heading domain error abandons this frame's update only; the
        // previous estimate stays in effect.
        let heading = match &mut self.heading {
            Some(heuristic) => match heuristic.update(comparison) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(error = %err, "heading update failed, keeping previous");
                    Some(heuristic.heading())
                }
            },
            None => None,
        };

        self.stats.pairs_processed += 1;
        self.stats.lines_evaluated += lines.len();

        let elapsed = start.elapsed();
        debug!(
            timestamp_us = reference.timestamp_us,
            lines = lines.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "frame pair processed"
        );

        Ok(FrameAnalysis {
            timestamp_us: reference.timestamp_us,
            solution,
            lines,
            evidence,
            horizontal,
            memory: self.memory.map().clone(),
            topdown,
            topdown_memory,
            heading,
            raster_dropped,
            elapsed,
        })
    }

    /// Correlate and depth-estimate a batch of lines in parallel.
    fn evaluate(
        &self,
        reference: &Frame,
        comparison: &Frame,
        lines: &[SampleLine],
    ) -> Vec<Vec<DepthSample>> {
        lines
            .par_iter()
            .map(|line| {
                let matrix = self.correlator.correlate_line(reference, comparison, line);
                self.estimator.estimate_line(line, &matrix)
            })
            .collect()
    }

    pub fn log_summary(&self) {
        info!(
            pairs = self.stats.pairs_processed,
            lines = self.stats.lines_evaluated,
            samples = self.stats.samples_merged,
            rasters_dropped = self.stats.rasters_dropped,
            "run complete"
        );
    }
}

// src/main.rs

mod config;
mod correlation;
mod depth;
mod egomotion;
mod heading;
mod io;
mod maps;
mod memory;
mod pipeline;
mod render;
mod sampling;
mod topdown;
mod types;

use std::path::Path;

use anyhow::Result;
use tracing::{error, info, warn};

use io::{FrameDataset, StateLog};
use pipeline::Pipeline;
use render::ArtifactWriter;
use types::Config;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.level.as_str())
        .init();

    info!("Egomotion depth estimation starting");
    info!(config = %config_path, "✓ Configuration loaded");

    let dataset = FrameDataset::scan(Path::new(&config.input.frame_dir))?;
    let state_log = StateLog::load(Path::new(&config.input.state_log))?;

    let reference = dataset.load(0, config.input.rotate_quarter_turn)?;
    let mut pipeline = Pipeline::new(&config, reference.width, reference.height)?;
    let writer = ArtifactWriter::new(&config.output, &config.correlation, config.depth.max_depth)?;
    info!(
        width = reference.width,
        height = reference.height,
        pairs = dataset.len() - 1,
        "✓ Pipeline ready"
    );

    let mut reference = reference;
    for index in 1..dataset.len() {
        let comparison = dataset.load(index, config.input.rotate_quarter_turn)?;
        if (comparison.width, comparison.height) != (reference.width, reference.height) {
            warn!(
                timestamp_us = comparison.timestamp_us,
                "frame size changed mid-dataset, restarting pair chain"
            );
            reference = comparison;
            continue;
        }

        let state = state_log.nearest(reference.timestamp_s());
        match pipeline.process_pair(&reference, &comparison, state) {
            Ok(analysis) => {
                if let Some(heading) = analysis.heading {
                    info!(
                        timestamp_us = analysis.timestamp_us,
                        heading_rad = heading,
                        "heading"
                    );
                }
                writer.write(&analysis, &reference, &comparison)?;
            }
            Err(err) => {
                error!(
                    timestamp_us = reference.timestamp_us,
                    error = %err,
                    "frame pair failed, continuing with the next"
                );
            }
        }
        reference = comparison;
    }

    pipeline.log_summary();
    Ok(())
}

// src/config.rs

use crate::types::Config;
use anyhow::{bail, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bad parameters before any frame is touched.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.memory.decay) {
            bail!(
                "memory.decay must lie in [0, 1), got {}",
                self.memory.decay
            );
        }
        if self.sampling.step <= 0.0 {
            bail!("sampling.step must be positive, got {}", self.sampling.step);
        }
        if self.correlation.kernel_height < 2 || self.correlation.kernel_width < 2 {
            bail!(
                "correlation kernel must be at least 2x2, got {}x{}",
                self.correlation.kernel_height,
                self.correlation.kernel_width
            );
        }
        if let Some(window) = self.sampling.search_window {
            if window < 2 {
                bail!("sampling.search_window must be at least 2, got {}", window);
            }
        }
        if self.depth.max_depth <= 0.0 {
            bail!("depth.max_depth must be positive, got {}", self.depth.max_depth);
        }
        if self.topdown.rows == 0 {
            bail!("topdown.rows must be positive");
        }
        for (name, band) in [
            ("y_band", self.heading.y_band),
            ("u_band", self.heading.u_band),
            ("v_band", self.heading.v_band),
        ] {
            if band[0] > band[1] {
                bail!("heading.{name} lower bound {} exceeds upper {}", band[0], band[1]);
            }
        }
        if self.heading.ray_weights.len() != self.heading.ray_count {
            bail!(
                "heading.ray_weights has {} entries for {} rays",
                self.heading.ray_weights.len(),
                self.heading.ray_count
            );
        }
        if !(0.0..=1.0).contains(&self.heading.alpha) {
            bail!("heading.alpha must lie in [0, 1], got {}", self.heading.alpha);
        }
        Ok(())
    }
}

// src/io/statelog.rs
//
// Flight-state CSV: one row per autopilot sample with attitude (rad)
// and world-frame velocity. Rows are matched to frames by nearest
// timestamp; the log rate is typically much higher than the frame rate,
// so the nearest sample is at most a few milliseconds off.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::Vector3;
use serde::Deserialize;
use tracing::info;

use crate::types::VehicleState;

#[derive(Debug, Deserialize)]
struct StateRecord {
    time: f64,
    att_phi: f64,
    att_theta: f64,
    att_psi: f64,
    vel_x: f64,
    vel_y: f64,
    vel_z: f64,
}

pub struct StateLog {
    /// Sorted by timestamp
    states: Vec<VehicleState>,
}

impl StateLog {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening state log {}", path.display()))?;
        let log = Self::from_reader(file)
            .with_context(|| format!("parsing state log {}", path.display()))?;
        info!(samples = log.len(), path = %path.display(), "state log loaded");
        Ok(log)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut states = Vec::new();
        for record in csv_reader.deserialize() {
            let record: StateRecord = record?;
            states.push(VehicleState {
                roll: record.att_phi,
                pitch: record.att_theta,
                yaw: record.att_psi,
                vel_world: Vector3::new(record.vel_x, record.vel_y, record.vel_z),
                timestamp_s: record.time,
            });
        }
        if states.is_empty() {
            bail!("state log holds no samples");
        }
        states.sort_by(|a, b| a.timestamp_s.total_cmp(&b.timestamp_s));
        Ok(Self { states })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Sample with the smallest |t - timestamp_s|. Timestamps before the
    /// first or after the last sample clamp to the ends.
    pub fn nearest(&self, timestamp_s: f64) -> &VehicleState {
        let idx = self
            .states
            .partition_point(|s| s.timestamp_s < timestamp_s);
        if idx == 0 {
            return &self.states[0];
        }
        if idx == self.states.len() {
            return &self.states[self.states.len() - 1];
        }
        let before = &self.states[idx - 1];
        let after = &self.states[idx];
        if (timestamp_s - before.timestamp_s) <= (after.timestamp_s - timestamp_s) {
            before
        } else {
            after
        }
    }
}

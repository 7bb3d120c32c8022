// src/io/mod.rs
//
// Offline inputs: a folder of timestamped frames and the matching
// flight-state CSV log.

pub mod dataset;
pub mod statelog;

pub use dataset::FrameDataset;
pub use statelog::StateLog;

// src/io/dataset.rs

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::imageops;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::types::Frame;

/// Frame image on disk, named `<microseconds>.jpg` or `.png`.
#[derive(Debug, Clone)]
struct FrameEntry {
    path: PathBuf,
    timestamp_us: u64,
}

/// Sorted index over a dataset folder. Decoding is deferred to `load`
/// so only the pair being processed is ever held in memory.
pub struct FrameDataset {
    entries: Vec<FrameEntry>,
}

impl FrameDataset {
    /// Scan a folder for timestamped frame images. Files whose stem is
    /// not a microsecond timestamp are skipped with a warning.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).max_depth(1).into_iter() {
            let entry = entry.with_context(|| format!("scanning {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_image = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("jpg") | Some("jpeg") | Some("png")
            );
            if !is_image {
                continue;
            }
            match path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                Some(timestamp_us) => entries.push(FrameEntry {
                    path: path.to_path_buf(),
                    timestamp_us,
                }),
                None => warn!(path = %path.display(), "not a timestamped frame, skipping"),
            }
        }

        if entries.len() < 2 {
            bail!(
                "need at least two frames in {}, found {}",
                dir.display(),
                entries.len()
            );
        }
        entries.sort_by_key(|e| e.timestamp_us);
        info!(frames = entries.len(), dir = %dir.display(), "dataset indexed");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode one frame to RGB. Datasets recorded with the camera on its
    /// side carry a clockwise quarter turn; `rotate_quarter_turn` undoes
    /// it before any pixel is read.
    pub fn load(&self, index: usize, rotate_quarter_turn: bool) -> Result<Frame> {
        let entry = &self.entries[index];
        let decoded = image::open(&entry.path)
            .with_context(|| format!("decoding {}", entry.path.display()))?
            .to_rgb8();
        let rgb = if rotate_quarter_turn {
            imageops::rotate270(&decoded)
        } else {
            decoded
        };
        let (width, height) = rgb.dimensions();
        Ok(Frame::new(
            rgb.into_raw(),
            width as usize,
            height as usize,
            entry.timestamp_us,
        ))
    }
}

// src/render.rs
//
// Per-frame raster artifacts for offline inspection. Each analysed pair
// writes one PNG per artifact kind under `<out_dir>/<kind>/`, named by
// the reference frame's microsecond timestamp, so a whole run can be
// scrubbed through folder by folder.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{ImageBuffer, Rgb, RgbImage};
use tracing::debug;

use crate::maps::ScalarMap;
use crate::pipeline::FrameAnalysis;
use crate::sampling::DependencyAxis;
use crate::types::{CorrelationConfig, Frame, OutputConfig};

const KINDS: [&str; 10] = [
    "original",
    "mixed",
    "squares",
    "depth",
    "confidence",
    "combined",
    "horizontal",
    "memory",
    "topdown",
    "topdown_memory",
];

const FORWARD_COLOR: Rgb<u8> = Rgb([220, 40, 40]);
const LATERAL_COLOR: Rgb<u8> = Rgb([40, 80, 220]);
const FOCUS_COLOR: Rgb<u8> = Rgb([40, 200, 60]);

pub struct ArtifactWriter {
    out_dir: PathBuf,
    enabled: bool,
    kernel_width: usize,
    kernel_height: usize,
    max_depth: f32,
}

impl ArtifactWriter {
    /// Create the artifact folder tree up front so a failing disk shows
    /// up at startup rather than mid-run.
    pub fn new(
        output: &OutputConfig,
        correlation: &CorrelationConfig,
        max_depth: f32,
    ) -> Result<Self> {
        let out_dir = PathBuf::from(&output.out_dir);
        if output.save_artifacts {
            for kind in KINDS {
                let dir = out_dir.join(kind);
                fs::create_dir_all(&dir)
                    .with_context(|| format!("creating artifact dir {}", dir.display()))?;
            }
        }
        Ok(Self {
            out_dir,
            enabled: output.save_artifacts,
            kernel_width: correlation.kernel_width,
            kernel_height: correlation.kernel_height,
            max_depth,
        })
    }

    pub fn write(
        &self,
        analysis: &FrameAnalysis,
        reference: &Frame,
        comparison: &Frame,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let stamp = analysis.timestamp_us;
        self.save("original", stamp, frame_to_image(reference)?)?;
        self.save("mixed", stamp, blend_frames(reference, comparison)?)?;
        self.save("squares", stamp, self.squares_overlay(analysis, reference)?)?;
        self.save(
            "depth",
            stamp,
            map_to_gray(analysis.evidence.depth(), self.max_depth),
        )?;
        let confidence = analysis.evidence.confidence();
        self.save(
            "confidence",
            stamp,
            map_to_gray(confidence, confidence.max_value()),
        )?;
        self.save("combined", stamp, combined_image(analysis))?;
        self.save(
            "horizontal",
            stamp,
            map_to_gray(analysis.horizontal.depth(), self.max_depth),
        )?;
        self.save("memory", stamp, map_to_gray(&analysis.memory, self.max_depth))?;
        self.save("topdown", stamp, map_to_gray(&analysis.topdown, 1.0))?;
        self.save(
            "topdown_memory",
            stamp,
            map_to_gray(&analysis.topdown_memory, 1.0),
        )?;

        debug!(timestamp_us = stamp, "artifacts written");
        Ok(())
    }

    fn save(&self, kind: &str, timestamp_us: u64, image: RgbImage) -> Result<()> {
        let path = self.out_dir.join(kind).join(format!("{timestamp_us}.png"));
        image
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Reference frame with one kernel-sized outline per sample position
    /// and a cross at the focus point. Forward-dependent lines draw red,
    /// lateral ones blue.
    fn squares_overlay(&self, analysis: &FrameAnalysis, reference: &Frame) -> Result<RgbImage> {
        let mut image = frame_to_image(reference)?;
        for line in &analysis.lines {
            let color = match line.dependency {
                DependencyAxis::Forward => FORWARD_COLOR,
                DependencyAxis::Lateral => LATERAL_COLOR,
            };
            for &(x, y) in &line.positions {
                draw_rect_outline(
                    &mut image,
                    x - (self.kernel_width / 2) as i32,
                    y - (self.kernel_height / 2) as i32,
                    self.kernel_width as i32,
                    self.kernel_height as i32,
                    color,
                );
            }
        }
        let (fx, fy) = analysis.solution.focus;
        draw_cross(&mut image, fx as i32, fy as i32, 6, FOCUS_COLOR);
        Ok(image)
    }
}

fn frame_to_image(frame: &Frame) -> Result<RgbImage> {
    ImageBuffer::from_raw(frame.width as u32, frame.height as u32, frame.data.clone())
        .context("frame buffer size does not match its dimensions")
}

/// 50/50 blend of the pair; motion shows up as ghosting.
fn blend_frames(a: &Frame, b: &Frame) -> Result<RgbImage> {
    let mut data = Vec::with_capacity(a.data.len());
    for (&pa, &pb) in a.data.iter().zip(&b.data) {
        data.push(((pa as u16 + pb as u16) / 2) as u8);
    }
    ImageBuffer::from_raw(a.width as u32, a.height as u32, data)
        .context("blended buffer size does not match frame dimensions")
}

/// Grayscale render of a map, full white at `scale`.
fn map_to_gray(map: &ScalarMap, scale: f32) -> RgbImage {
    let scale = scale.max(f32::EPSILON);
    RgbImage::from_fn(map.width() as u32, map.height() as u32, |x, y| {
        let v = (map.get(x as usize, y as usize) / scale * 255.0).clamp(0.0, 255.0) as u8;
        Rgb([v, v, v])
    })
}

/// Depth modulated by confidence, normalized to the brightest cell.
/// Iterates the write mask so zero-depth estimates are not skipped.
fn combined_image(analysis: &FrameAnalysis) -> RgbImage {
    let confidence = analysis.evidence.confidence();
    let depth = analysis.evidence.depth();
    let mut combined = ScalarMap::new(depth.width(), depth.height());
    for (x, y, d) in analysis.evidence.written_cells() {
        combined.set(x, y, d * confidence.get(x, y));
    }
    let peak = combined.max_value();
    map_to_gray(&combined, peak)
}

fn draw_rect_outline(image: &mut RgbImage, x0: i32, y0: i32, w: i32, h: i32, color: Rgb<u8>) {
    for x in x0..x0 + w {
        put_pixel_safe(image, x, y0, color);
        put_pixel_safe(image, x, y0 + h - 1, color);
    }
    for y in y0..y0 + h {
        put_pixel_safe(image, x0, y, color);
        put_pixel_safe(image, x0 + w - 1, y, color);
    }
}

fn draw_cross(image: &mut RgbImage, cx: i32, cy: i32, arm: i32, color: Rgb<u8>) {
    for d in -arm..=arm {
        put_pixel_safe(image, cx + d, cy, color);
        put_pixel_safe(image, cx, cy + d, color);
    }
}

#[inline]
fn put_pixel_safe(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

// src/types.rs

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub egomotion: EgomotionConfig,
    pub sampling: SamplingConfig,
    pub correlation: CorrelationConfig,
    pub depth: DepthConfig,
    pub memory: MemoryConfig,
    pub topdown: TopDownConfig,
    pub heading: HeadingConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            egomotion: EgomotionConfig::default(),
            sampling: SamplingConfig::default(),
            correlation: CorrelationConfig::default(),
            depth: DepthConfig::default(),
            memory: MemoryConfig::default(),
            topdown: TopDownConfig::default(),
            heading: HeadingConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory of frames named `<microseconds>.jpg` (or `.png`)
    pub frame_dir: String,
    /// CSV log of attitude + world velocity samples
    pub state_log: String,
    /// Datasets are stored rotated a quarter turn; undo it on decode
    pub rotate_quarter_turn: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            frame_dir: "data/frames".to_string(),
            state_log: "data/state.csv".to_string(),
            rotate_quarter_turn: true,
        }
    }
}

/// Axis composition order for the world-to-body rotation.
///
/// Two conventions exist in earlier versions of this algorithm; which one
/// matches a given flight log must be validated against a known trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationOrder {
    /// Rz(yaw) * Ry(pitch) * Rx(roll)
    Zyx,
    /// Rx(yaw) * Ry(pitch) * Rz(roll)
    Xyz,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EgomotionConfig {
    pub rotation_order: RotationOrder,
    /// Pixels of focus-point shift per unit of screen velocity
    pub focus_gain: f32,
    /// Minimum distance from the focus point to each frame border
    pub focus_margin_x: f32,
    pub focus_margin_y: f32,
}

impl Default for EgomotionConfig {
    fn default() -> Self {
        Self {
            rotation_order: RotationOrder::Zyx,
            focus_gain: 40.0,
            focus_margin_x: 60.0,
            focus_margin_y: 40.0,
        }
    }
}

/// Spacing of sample positions along a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingPolicy {
    /// Uniform interpolation between the endpoints
    Linear,
    /// Geometric progression, denser near the end point
    Logarithmic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Nominal pixel distance between consecutive sample positions
    pub step: f32,
    pub spacing: SpacingPolicy,
    /// Angular resolution of the radial fan, degrees
    pub sweep_resolution_deg: u32,
    /// Vertical distance between horizontal raster lines, pixels
    pub raster_spacing: u32,
    /// Keep line endpoints this far inside the frame
    pub edge_margin: f32,
    /// Restrict the correlator to |i - j| < window / 2
    pub search_window: Option<usize>,
    /// Scale the sample step by the clamped body-velocity component
    /// of the line's dependency axis
    pub scale_step_with_speed: bool,
    /// Extra evaluation lines given as parallel arrays
    pub manual: Option<ManualLinesConfig>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            step: 4.0,
            spacing: SpacingPolicy::Linear,
            sweep_resolution_deg: 20,
            raster_spacing: 50,
            edge_margin: 10.0,
            search_window: Some(40),
            scale_step_with_speed: false,
            manual: None,
        }
    }
}

/// Hand-placed evaluation lines: `locations[k]` anchors a line of
/// `length` pixels along `directions[k]`; `dependencies[k]` is 0 for
/// forward-motion dependent, 1 for lateral. All three arrays must have
/// equal length; this is checked before any frame is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualLinesConfig {
    pub locations: Vec<[f32; 2]>,
    pub directions: Vec<[f32; 2]>,
    pub dependencies: Vec<u8>,
    pub length: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Patch height in pixels
    pub kernel_height: usize,
    /// Patch width in pixels
    pub kernel_width: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            kernel_height: 10,
            kernel_width: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Upper bound of the depth proxy; every map entry stays within it
    pub max_depth: f32,
    /// Rows whose valid-score standard deviation falls below this are
    /// treated as flat (no evidence) and skipped
    pub min_row_std: f32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            max_depth: 255.0,
            min_row_std: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Fraction of the accumulated map forgotten each frame, in [0, 1)
    pub decay: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { decay: 0.2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopDownConfig {
    /// Height of the bird's-eye strip, rows
    pub rows: usize,
    /// Extra scaling of depth before the row remap
    pub factor: f32,
}

impl Default for TopDownConfig {
    fn default() -> Self {
        Self {
            rows: 240,
            factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    pub enabled: bool,
    /// YUV inclusive bands for the ground color class
    pub y_band: [f32; 2],
    pub u_band: [f32; 2],
    pub v_band: [f32; 2],
    /// Mean-pooling block size (rows, cols) before masking
    pub pool_rows: usize,
    pub pool_cols: usize,
    /// Candidate ray angles span [ray_min, ray_max] inside [0, pi]
    pub ray_count: usize,
    pub ray_min: f64,
    pub ray_max: f64,
    /// Per-ray vote weights, center-heavy; length must equal ray_count
    pub ray_weights: Vec<f64>,
    /// Low-pass coefficient: heading = alpha * new + (1 - alpha) * old
    pub alpha: f64,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            y_band: [80.0, 255.0],
            u_band: [30.0, 89.0],
            v_band: [90.0, 145.0],
            pool_rows: 24,
            pool_cols: 10,
            ray_count: 7,
            ray_min: std::f64::consts::FRAC_PI_6,
            ray_max: 5.0 * std::f64::consts::FRAC_PI_6,
            ray_weights: vec![0.1, 0.5, 0.85, 1.0, 0.85, 0.5, 0.1],
            alpha: 0.08,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub out_dir: String,
    pub save_artifacts: bool,
    /// Drop the horizontal raster when a frame pair exceeds this budget
    pub deadline_ms: Option<u64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: "renders".to_string(),
            save_artifacts: true,
            deadline_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Immutable RGB frame, row-major: `data[(y * width + x) * 3 + c]`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Microsecond timestamp taken from the source file name
    pub timestamp_us: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: usize, height: usize, timestamp_us: u64) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            data,
            width,
            height,
            timestamp_us,
        }
    }

    pub fn timestamp_s(&self) -> f64 {
        self.timestamp_us as f64 * 1e-6
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

/// Attitude + world-frame velocity at one log timestamp.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub vel_world: Vector3<f64>,
    pub timestamp_s: f64,
}

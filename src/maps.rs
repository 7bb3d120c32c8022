// src/maps.rs
//
// Frame-resolution evidence grids. One flat f32 buffer backs the depth,
// confidence, memory and top-down maps; only the pixels touched by a
// sample line ever hold non-zero values.

/// Row-major scalar grid: value at (x, y) = data[y * width + x].
#[derive(Debug, Clone)]
pub struct ScalarMap {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl ScalarMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0.0; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Iterate every cell as (x, y, value).
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(idx, &v)| (idx % width, idx / width, v))
    }

    /// Cells that hold evidence (non-zero).
    pub fn written_cells(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.cells().filter(|&(_, _, v)| v != 0.0)
    }

    /// Element-wise addition of another map of the same shape.
    pub fn add_assign(&mut self, other: &ScalarMap) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for (dst, src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst += *src;
        }
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(0.0_f32, f32::max)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

// src/memory.rs
//
// Decaying accumulator that blends each frame's depth evidence with
// history. Strictly sequential across frame pairs: frame N's state
// depends on frame N-1's.

use crate::maps::ScalarMap;

pub struct TemporalMemory {
    map: ScalarMap,
    /// Fraction forgotten per update, in [0, 1); validated at config load
    decay: f32,
    /// Values never exceed this, so decay = 0 cannot grow unbounded
    max_value: f32,
}

impl TemporalMemory {
    pub fn new(width: usize, height: usize, decay: f32, max_value: f32) -> Self {
        debug_assert!((0.0..1.0).contains(&decay));
        Self {
            map: ScalarMap::new(width, height),
            decay,
            max_value,
        }
    }

    /// memory = memory * (1 - decay) + contribution, clamped per cell.
    pub fn update(&mut self, contribution: &ScalarMap) {
        let keep = 1.0 - self.decay;
        let max_value = self.max_value;
        for (cell, &value) in self
            .map
            .as_mut_slice()
            .iter_mut()
            .zip(contribution.as_slice())
        {
            *cell = (*cell * keep + value).clamp(0.0, max_value);
        }
    }

    pub fn map(&self) -> &ScalarMap {
        &self.map
    }

    pub fn reset(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(width: usize, height: usize, x: usize, y: usize, v: f32) -> ScalarMap {
        let mut map = ScalarMap::new(width, height);
        map.set(x, y, v);
        map
    }

    #[test]
    fn zero_decay_first_update_equals_contribution() {
        let mut memory = TemporalMemory::new(8, 8, 0.0, 255.0);
        let c = contribution(8, 8, 2, 3, 40.0);
        memory.update(&c);
        assert_eq!(memory.map().get(2, 3), 40.0);
        assert_eq!(memory.map().get(0, 0), 0.0);
    }

    #[test]
    fn zero_decay_accumulates_without_forgetting() {
        let mut memory = TemporalMemory::new(8, 8, 0.0, 255.0);
        let c = contribution(8, 8, 2, 3, 40.0);
        memory.update(&c);
        memory.update(&c);
        memory.update(&c);
        assert_eq!(memory.map().get(2, 3), 120.0);
    }

    #[test]
    fn high_decay_tracks_the_latest_frame() {
        let mut memory = TemporalMemory::new(8, 8, 0.9, 255.0);
        memory.update(&contribution(8, 8, 2, 3, 100.0));
        memory.update(&contribution(8, 8, 2, 3, 10.0));
        // only 10% of the old 100 survives one update
        let v = memory.map().get(2, 3);
        assert!((v - 20.0).abs() < 1e-4);
    }

    #[test]
    fn values_clamp_at_configured_maximum() {
        let mut memory = TemporalMemory::new(4, 4, 0.0, 100.0);
        let c = contribution(4, 4, 1, 1, 80.0);
        memory.update(&c);
        memory.update(&c);
        assert_eq!(memory.map().get(1, 1), 100.0);
    }
}

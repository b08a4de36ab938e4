use std::collections::VecDeque;

const STD_FLOOR: f32 = 1e-6;

/// Bounded FIFO of scalar rewards with a running mean and population
/// standard deviation. Oldest entries are evicted once capacity is reached.
pub struct RewardWindow {
    values: VecDeque<f32>,
    capacity: usize,
}

impl RewardWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }

    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    pub fn std(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / self.values.len() as f32;
        var.sqrt()
    }
}

/// Normalizes rewards against the long-horizon window statistic.
///
/// A degenerate standard deviation (constant rewards early in training, or a
/// non-finite accumulation) falls back to unit variance instead of letting a
/// division by zero corrupt the returns.
pub fn normalize(rewards: &[f32], window: &RewardWindow) -> Vec<f32> {
    let mean = window.mean();
    let mut std = window.std();
    if !std.is_finite() || std < STD_FLOOR {
        tracing::warn!(std, "degenerate reward statistic, assuming unit variance");
        std = 1.0;
    }
    rewards.iter().map(|r| (r - mean) / std).collect()
}

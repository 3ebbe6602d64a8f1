use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded draw sequence shared by every generator in a run.
///
/// All helpers are built on [`SequenceRng::next_unit`], so the number of
/// draws each call consumes is fixed and the sequence is reproducible for a
/// given seed.
#[derive(Debug, Clone)]
pub struct SequenceRng {
    inner: ChaCha8Rng,
}

impl SequenceRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Inclusive integer in `[min, max]`. Bounds are swapped when reversed.
    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let span = (max as f64) - (min as f64) + 1.0;
        let offset = (self.next_unit() * span).floor() as i64;
        min.saturating_add(offset).min(max)
    }

    pub fn float_range(&mut self, min: f64, max: f64) -> f64 {
        self.next_unit() * (max - min) + min
    }

    /// Uniform pick. Consumes one draw even for single-item slices.
    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let last = items.len() as i64 - 1;
        let index = self.int_range(0, last) as usize;
        items.get(index)
    }

    /// Cumulative-weight pick; missing weights count as zero.
    pub fn weighted_choice<'a, T>(&mut self, items: &'a [T], weights: &[f64]) -> Option<&'a T> {
        let total: f64 = weights.iter().take(items.len()).sum();
        let mut roll = self.next_unit() * total;
        for (index, item) in items.iter().enumerate() {
            roll -= weights.get(index).copied().unwrap_or(0.0);
            if roll <= 0.0 {
                return Some(item);
            }
        }
        items.last()
    }

    /// Standard normal variate via Box-Muller.
    pub fn gaussian(&mut self) -> f64 {
        let mut u = 0.0;
        while u == 0.0 {
            u = self.next_unit();
        }
        let mut v = 0.0;
        while v == 0.0 {
            v = self.next_unit();
        }
        (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
    }
}

impl RngCore for SequenceRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.inner.fill_bytes(dst)
    }
}

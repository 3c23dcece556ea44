use std::fmt;

use rand::{
    distributions::{uniform::SampleUniform, Distribution, Uniform},
    Rng, SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

pub const DEFAULT_BATCH_SIZE: usize = 1024;

pub fn new_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Random draws over a fixed range, pre-generated in batches.
///
/// A batch of `batch_size` values is drawn at once and handed out one by one;
/// the next batch is drawn when the cursor runs off the end.
pub struct RandomSource<W: SampleUniform> {
    rng: ChaCha8Rng,
    range: Uniform<W>,
    batch: Vec<W>,
    cursor: usize,
    batch_size: usize,
}

impl<W> RandomSource<W>
where
    W: SampleUniform + Copy,
    W::Sampler: Clone,
{
    pub fn new(seed: Option<u64>, range: Uniform<W>, batch_size: usize) -> Self {
        Self {
            rng: new_rng(seed),
            range,
            batch: Vec::new(),
            cursor: 0,
            batch_size: batch_size.max(1),
        }
    }

    /// Independent source over the same range.
    pub fn reseeded(&self, seed: Option<u64>) -> Self {
        Self::new(seed, self.range.clone(), self.batch_size)
    }

    pub fn next_value(&mut self) -> W {
        if self.cursor >= self.batch.len() {
            self.refill();
        }
        let value = self.batch[self.cursor];
        self.cursor += 1;
        value
    }

    /// Uniform index in `0..len`.
    pub fn next_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn refill(&mut self) {
        trace!("refill random batch: {}", self.batch_size);
        self.batch.clear();
        let range = &self.range;
        let rng = &mut self.rng;
        self.batch
            .extend((0..self.batch_size).map(|_| range.sample(rng)));
        self.cursor = 0;
    }
}

impl<W: SampleUniform> fmt::Debug for RandomSource<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSource")
            .field("batch_size", &self.batch_size)
            .field("buffered", &(self.batch.len() - self.cursor.min(self.batch.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_repeat() {
        let mut a = RandomSource::new(Some(7), Uniform::new_inclusive(1i64, 100), 16);
        let mut b = RandomSource::new(Some(7), Uniform::new_inclusive(1i64, 100), 16);
        let xs: Vec<_> = (0..100).map(|_| a.next_value()).collect();
        let ys: Vec<_> = (0..100).map(|_| b.next_value()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (1..=100).contains(x)));
    }

    #[test]
    fn closed_range_reaches_both_ends() {
        let mut source = RandomSource::new(Some(0), Uniform::new_inclusive(1i64, 4), 64);
        let mut count = [0usize; 5];
        for _ in 0..10000 {
            count[source.next_value() as usize] += 1;
        }
        assert_eq!(count[0], 0);
        assert!(count[1..].iter().all(|&c| c > 2000), "{count:?}");
    }

    #[test]
    fn zero_batch_draws_one_at_a_time() {
        let mut source = RandomSource::new(Some(1), Uniform::new(0.0f32, 1.0), 0);
        assert_eq!(source.batch_size(), 1);
        for _ in 0..1000 {
            let r = source.next_value();
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn reseeded_is_independent() {
        let mut a = RandomSource::new(Some(3), Uniform::new_inclusive(1i64, 1 << 40), 8);
        let mut b = a.reseeded(Some(4));
        let xs: Vec<_> = (0..32).map(|_| a.next_value()).collect();
        let ys: Vec<_> = (0..32).map(|_| b.next_value()).collect();
        assert_ne!(xs, ys);
    }
}

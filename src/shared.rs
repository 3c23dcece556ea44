use std::sync::Arc;

use parking_lot::Mutex;
use rand::distributions::uniform::SampleUniform;

use crate::{
    sampler::WeightedSampler,
    weight::{Exact, Probability, WeightPolicy},
};

/// One sampler drawn from by many callers, each draw serialized by a lock.
///
/// Clones share the sampler and its random source. Callers that do not
/// need a common random stream should prefer [`WeightedSampler::fork`].
#[derive(Debug)]
pub struct SharedSampler<T, P: WeightPolicy> {
    inner: Arc<Mutex<WeightedSampler<T, P>>>,
}

impl<T, P: WeightPolicy> Clone for SharedSampler<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, P: WeightPolicy> From<WeightedSampler<T, P>> for SharedSampler<T, P> {
    fn from(sampler: WeightedSampler<T, P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sampler)),
        }
    }
}

impl<T, P> SharedSampler<T, P>
where
    P: WeightPolicy,
    <P::Weight as SampleUniform>::Sampler: Clone,
{
    pub fn item_count(&self) -> usize {
        self.inner.lock().item_count()
    }

    pub fn bucket_count(&self) -> usize {
        self.inner.lock().bucket_count()
    }
}

impl<T: Clone> SharedSampler<T, Exact> {
    pub fn next_item(&self) -> T {
        self.inner.lock().next_item().clone()
    }
}

impl<T: Clone> SharedSampler<T, Probability> {
    pub fn next_item(&self) -> Option<T> {
        self.inner.lock().next_item().cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, thread};

    use super::*;
    use crate::builder::Builder;

    #[test]
    fn draws_across_threads() {
        let mut builder = Builder::integer();
        builder.seed(17);
        builder.add("a", 1).unwrap().add("b", 3).unwrap();
        let shared = SharedSampler::from(builder.build().unwrap());
        assert_eq!(shared.item_count(), 2);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let mut count: HashMap<&str, u32> = HashMap::new();
                    for _ in 0..25_000 {
                        *count.entry(shared.next_item()).or_default() += 1;
                    }
                    count
                })
            })
            .collect();

        let mut total: HashMap<&str, u32> = HashMap::new();
        for handle in handles {
            for (item, n) in handle.join().unwrap() {
                *total.entry(item).or_default() += n;
            }
        }
        assert_eq!(total.values().sum::<u32>(), 100_000);
        let b = total["b"] as f64 / 100_000.0;
        assert!((b - 0.75).abs() < 0.01, "{total:?}");
    }

    #[test]
    fn probability_shared() {
        let mut builder = Builder::probability();
        builder.seed(2);
        builder.add("x", 0.5).unwrap().add("y", 0.5).unwrap();
        let shared = SharedSampler::from(builder.build().unwrap());
        assert_eq!(shared.bucket_count(), 1);
        assert_eq!(shared.item_count(), 2);
        assert!((0..1000).all(|_| shared.next_item().is_some()));
    }
}

use std::sync::Arc;

use rand::distributions::uniform::SampleUniform;
use tracing::debug;

use crate::{
    configure::SamplerConfig,
    error::SamplerError,
    rand::RandomSource,
    weight::{Exact, Probability, WeightPolicy, WeightedEntry},
};

/// Items whose weights fall into one weight class, keyed by the cumulative
/// weight of every bucket up to and including this one.
#[derive(Debug, Clone)]
pub(crate) struct Bucket<T, W> {
    cumulative: W,
    items: Vec<T>,
}

/// Sorts `entries` by weight and sweeps them into buckets.
///
/// Returns the buckets in ascending cumulative order together with the
/// grand total.
fn bucketize<T, P: WeightPolicy>(
    policy: &P,
    mut entries: Vec<WeightedEntry<T, P::Weight>>,
) -> Result<(Vec<Bucket<T, P::Weight>>, P::Weight), SamplerError> {
    entries.sort_by(|a, b| policy.order(&a.weight, &b.weight));

    let mut buckets: Vec<Bucket<T, P::Weight>> = Vec::new();
    let mut total = policy.zero();
    let mut representative = None;

    for WeightedEntry { item, weight } in entries {
        total = policy
            .accumulate(total, weight)
            .ok_or_else(|| SamplerError::capacity(total, weight))?;
        let joins = representative.is_some_and(|r| policy.same_class(r, weight));
        match buckets.last_mut() {
            Some(bucket) if joins => {
                bucket.items.push(item);
                bucket.cumulative = total;
            }
            _ => buckets.push(Bucket {
                cumulative: total,
                items: vec![item],
            }),
        }
        representative = Some(weight);
    }

    let total = policy.seal(total);
    if let Some(last) = buckets.last_mut() {
        last.cumulative = total;
    }
    Ok((buckets, total))
}

/// Draws items with a frequency proportional to their weight.
///
/// Items sharing a weight class are kept in one bucket, so a draw costs a
/// binary search over the distinct weights plus a uniform pick inside the
/// bucket. The bucket index is immutable and shared between forks; only the
/// random source is per instance.
#[derive(Debug)]
pub struct WeightedSampler<T, P: WeightPolicy> {
    policy: P,
    buckets: Arc<[Bucket<T, P::Weight>]>,
    item_count: usize,
    total: P::Weight,
    source: RandomSource<P::Weight>,
}

impl<T, P> WeightedSampler<T, P>
where
    P: WeightPolicy,
    <P::Weight as SampleUniform>::Sampler: Clone,
{
    pub(crate) fn new(
        policy: P,
        entries: Vec<WeightedEntry<T, P::Weight>>,
        config: &SamplerConfig,
    ) -> Result<Self, SamplerError> {
        if entries.is_empty() {
            return Err(SamplerError::Empty);
        }
        let item_count = entries.len();
        let (buckets, total) = bucketize(&policy, entries)?;
        debug!(
            "weighted sampler: items: {}, buckets: {}, total weight: {}",
            item_count,
            buckets.len(),
            total
        );
        let source = RandomSource::new(config.seed, policy.draw_range(total), config.batch_size);
        Ok(Self {
            policy,
            buckets: buckets.into(),
            item_count,
            total,
            source,
        })
    }

    /// A sampler over the same buckets with its own random source, for use
    /// on another thread without locking.
    pub fn fork(&self, seed: Option<u64>) -> Self {
        Self {
            policy: self.policy.clone(),
            buckets: Arc::clone(&self.buckets),
            item_count: self.item_count,
            total: self.total,
            source: self.source.reseeded(seed),
        }
    }

    pub const fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Grand total of all weights (committed mass in probability mode).
    pub fn total_weight(&self) -> P::Weight {
        self.total
    }

    pub const fn policy(&self) -> &P {
        &self.policy
    }

    /// Index of the bucket covering `r`, if any.
    fn locate(&self, r: P::Weight) -> Option<usize> {
        let buckets = &self.buckets;
        let mut from = 0;
        let mut to = buckets.len() - 1;

        while from < to {
            let mid = from + (to - from) / 2;
            let cumulative = buckets[mid].cumulative;
            if self.policy.is_hit(r, cumulative) {
                return Some(mid);
            } else if r > cumulative {
                from = mid + 1;
            } else {
                match mid.checked_sub(1) {
                    Some(m) => to = m,
                    None => break,
                }
            }
        }

        // the search may stop short of the first covering bucket
        buckets[from..]
            .iter()
            .position(|bucket| self.policy.covers(r, bucket.cumulative))
            .map(|offset| from + offset)
    }

    fn select(&mut self) -> Result<&T, P::Weight> {
        let r = self.source.next_value();
        let index = self.locate(r).ok_or(r)?;
        let items = &self.buckets[index].items;
        let item = match items.len() {
            1 => &items[0],
            n => &items[self.source.next_index(n)],
        };
        Ok(item)
    }
}

impl<T> WeightedSampler<T, Exact> {
    /// Draws the next item.
    ///
    /// # Panics
    ///
    /// If no bucket covers the draw, which means the cumulative weights are
    /// inconsistent with the draw range.
    pub fn next_item(&mut self) -> &T {
        match self.select() {
            Ok(item) => item,
            Err(r) => panic!("failed to select random item: draw {r} is beyond every bucket"),
        }
    }
}

impl<T> WeightedSampler<T, Probability> {
    /// Draws the next item, or `None` when the draw lands in the probability
    /// mass that no item was given.
    pub fn next_item(&mut self) -> Option<&T> {
        self.select().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use statrs::distribution::{ChiSquared, ContinuousCDF};

    use super::*;

    fn seeded() -> SamplerConfig {
        SamplerConfig {
            seed: Some(42),
            ..Default::default()
        }
    }

    fn exact(weights: &[(&'static str, i64)]) -> WeightedSampler<&'static str, Exact> {
        let entries = weights
            .iter()
            .map(|&(item, weight)| WeightedEntry::new(item, weight))
            .collect();
        WeightedSampler::new(Exact, entries, &seeded()).unwrap()
    }

    fn probability(
        resolution: f32,
        weights: &[(&'static str, f64)],
    ) -> WeightedSampler<&'static str, Probability> {
        let entries = weights
            .iter()
            .map(|&(item, weight)| WeightedEntry::new(item, weight))
            .collect();
        WeightedSampler::new(Probability::new(resolution), entries, &seeded()).unwrap()
    }

    fn cumulative<T, P: WeightPolicy>(sampler: &WeightedSampler<T, P>) -> Vec<P::Weight> {
        sampler.buckets.iter().map(|b| b.cumulative).collect()
    }

    #[test]
    fn groups_equal_weights() {
        let sampler = exact(&[("d", 5), ("a", 1), ("b", 2), ("c", 2), ("e", 1)]);
        assert_eq!(sampler.item_count(), 5);
        assert_eq!(sampler.bucket_count(), 3);
        assert_eq!(cumulative(&sampler), vec![2, 6, 11]);
        assert_eq!(sampler.total_weight(), 11);
    }

    #[test]
    fn distinct_weights_one_bucket_each() {
        let sampler = exact(&[("a", 3), ("b", 1), ("c", 2)]);
        assert_eq!(sampler.bucket_count(), sampler.item_count());
        assert_eq!(cumulative(&sampler), vec![1, 3, 6]);
    }

    #[test]
    fn locate_every_draw_value() {
        let sampler = exact(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5), ("f", 6)]);
        let bounds = cumulative(&sampler);
        for r in 1..=sampler.total_weight() {
            let expected = bounds.iter().position(|&c| r <= c).unwrap();
            assert_eq!(sampler.locate(r), Some(expected), "draw {r}");
        }
        assert_eq!(sampler.locate(sampler.total_weight() + 1), None);
    }

    #[test]
    fn single_item() {
        let mut sampler = exact(&[("only", 7)]);
        assert_eq!(sampler.bucket_count(), 1);
        for _ in 0..1000 {
            assert_eq!(*sampler.next_item(), "only");
        }
    }

    #[test]
    fn frequencies_follow_weights() {
        let weights = [("a", 1), ("b", 1), ("c", 2), ("d", 4), ("e", 8)];
        let total: i64 = weights.iter().map(|w| w.1).sum();
        let mut sampler = exact(&weights);
        let draws = 200_000;
        let mut count: HashMap<&str, u64> = HashMap::new();
        for _ in 0..draws {
            *count.entry(*sampler.next_item()).or_default() += 1;
        }

        let statistic: f64 = weights
            .iter()
            .map(|&(item, weight)| {
                let expected = draws as f64 * weight as f64 / total as f64;
                let observed = count.get(item).copied().unwrap_or_default() as f64;
                (observed - expected).powi(2) / expected
            })
            .sum();
        let critical = ChiSquared::new((weights.len() - 1) as f64)
            .unwrap()
            .inverse_cdf(0.999);
        assert!(statistic < critical, "chi2 {statistic} >= {critical}: {count:?}");
    }

    #[test]
    fn fork_shares_buckets() {
        let sampler = exact(&[("a", 1), ("b", 2)]);
        let mut fork = sampler.fork(Some(1));
        assert!(Arc::ptr_eq(&sampler.buckets, &fork.buckets));
        assert_eq!(fork.item_count(), 2);
        assert!(["a", "b"].contains(fork.next_item()));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = exact(&[("a", 1), ("b", 2), ("c", 3)]);
        let mut b = exact(&[("a", 1), ("b", 2), ("c", 3)]);
        for _ in 0..1000 {
            assert_eq!(a.next_item(), b.next_item());
        }
    }

    #[test]
    fn probability_buckets_within_resolution() {
        let sampler = probability(0.01, &[("x", 0.3), ("y", 0.305), ("z", 0.2)]);
        assert_eq!(sampler.bucket_count(), 2);
        assert_eq!(sampler.item_count(), 3);
    }

    // Adjacent weights chain into one bucket even though the first and last
    // members are further apart than the resolution.
    #[test]
    fn probability_buckets_chain() {
        let sampler = probability(
            0.006,
            &[("a", 0.100), ("b", 0.105), ("c", 0.110), ("d", 0.115)],
        );
        assert_eq!(sampler.bucket_count(), 1);
        assert_eq!(sampler.item_count(), 4);
    }

    #[test]
    fn probability_full_mass_never_misses() {
        let mut sampler = probability(
            0.01,
            &[("a", 0.5), ("b", 0.25), ("c", 0.125), ("d", 0.125)],
        );
        assert_eq!(sampler.total_weight(), 1.0);
        for _ in 0..100_000 {
            assert!(sampler.next_item().is_some());
        }
    }

    #[test]
    fn probability_missing_mass_yields_none() {
        let mut sampler = probability(0.01, &[("x", 0.3), ("y", 0.3)]);
        assert_eq!(sampler.bucket_count(), 1);
        let draws = 100_000;
        let misses = (0..draws).filter(|_| sampler.next_item().is_none()).count();
        let rate = misses as f64 / draws as f64;
        assert!((rate - 0.4).abs() < 0.01, "miss rate {rate}");
    }

    #[test]
    fn probability_scan_is_strict() {
        let sampler = probability(0.0, &[("a", 0.25), ("b", 0.5)]);
        assert_eq!(cumulative(&sampler), vec![0.25, 0.75]);
        assert_eq!(sampler.locate(0.25), Some(1));
        assert_eq!(sampler.locate(0.75), None);
        assert_eq!(sampler.locate(0.0), Some(0));
    }

    // A draw within the resolution of a boundary stops the binary search at
    // that bucket, although the strict scan would pick the next one.
    #[test]
    fn probability_draw_near_boundary_selects_that_bucket() {
        let sampler = probability(0.01, &[("c", 0.3), ("a", 0.1), ("b", 0.2)]);
        assert_eq!(sampler.bucket_count(), 3);
        let bounds = cumulative(&sampler);
        assert!((bounds[1] - 0.3).abs() < 1e-9);

        assert_eq!(sampler.locate(bounds[1] + 0.005), Some(1));
        assert_eq!(sampler.locate(bounds[1] - 0.005), Some(1));
        assert_eq!(sampler.locate(bounds[1] + 0.02), Some(2));
        assert_eq!(sampler.locate(0.05), Some(0));
    }

    #[test]
    fn empty_entries_rejected() {
        let result = WeightedSampler::<u8, Exact>::new(Exact, Vec::new(), &seeded());
        assert!(matches!(result, Err(SamplerError::Empty)));
    }
}

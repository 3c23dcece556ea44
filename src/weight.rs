use std::{cmp::Ordering, fmt};

use rand::distributions::{uniform::SampleUniform, Uniform};

use crate::error::SamplerError;

/// An item together with its (normalized) weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEntry<T, W> {
    pub item: T,
    pub weight: W,
}

impl<T, W> WeightedEntry<T, W> {
    pub const fn new(item: T, weight: W) -> Self {
        Self { item, weight }
    }
}

/// How a sampler compares, groups, accumulates and draws its weights.
///
/// The bucketing and search algorithm in [`crate::WeightedSampler`] is written
/// once against this trait; each weight representation supplies a policy.
pub trait WeightPolicy: Clone + fmt::Debug {
    type Weight: Copy + PartialOrd + fmt::Debug + fmt::Display + SampleUniform;

    fn zero(&self) -> Self::Weight;

    /// Total order used to sort entries before bucketing.
    fn order(&self, a: &Self::Weight, b: &Self::Weight) -> Ordering;

    /// Whether `weight` belongs to the bucket whose most recent member
    /// weighs `representative`.
    fn same_class(&self, representative: Self::Weight, weight: Self::Weight) -> bool;

    /// Running total plus `weight`, `None` on overflow.
    fn accumulate(&self, total: Self::Weight, weight: Self::Weight) -> Option<Self::Weight>;

    /// Final value stored as the cumulative weight of the last bucket.
    fn seal(&self, total: Self::Weight) -> Self::Weight {
        total
    }

    /// Distribution of the draw value for a sampler whose grand total is `total`.
    fn draw_range(&self, total: Self::Weight) -> Uniform<Self::Weight>;

    /// Early exit during the binary search.
    fn is_hit(&self, r: Self::Weight, cumulative: Self::Weight) -> bool;

    /// Whether a bucket with this cumulative weight covers the draw `r`
    /// during the terminal forward scan.
    fn covers(&self, r: Self::Weight, cumulative: Self::Weight) -> bool;
}

/// Exact integer weights. Draws are taken from the closed range `[1, total]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exact;

impl WeightPolicy for Exact {
    type Weight = i64;

    fn zero(&self) -> i64 {
        0
    }

    fn order(&self, a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }

    fn same_class(&self, representative: i64, weight: i64) -> bool {
        representative == weight
    }

    fn accumulate(&self, total: i64, weight: i64) -> Option<i64> {
        total.checked_add(weight)
    }

    fn draw_range(&self, total: i64) -> Uniform<i64> {
        Uniform::new_inclusive(1, total)
    }

    fn is_hit(&self, r: i64, cumulative: i64) -> bool {
        r == cumulative
    }

    fn covers(&self, r: i64, cumulative: i64) -> bool {
        r <= cumulative
    }
}

/// Absolute probability weights in `(0, 1]`.
///
/// Weights arrive as `f32`; they and their cumulative mass are kept as `f64`
/// so that summing many small weights does not drift away from 1.
///
/// `resolution` is a deliberate fuzz parameter: two probabilities closer than
/// it are treated as equal, both when grouping entries into buckets and when
/// matching a draw against a cumulative boundary. Grouping compares each
/// entry with its immediate predecessor, so a chain of close weights can
/// spread a single bucket wider than `resolution`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probability {
    resolution: f32,
}

impl Probability {
    pub const DEFAULT_RESOLUTION: f32 = 0.01;
    pub const MAX_RESOLUTION: f32 = 0.5;
    /// How far a committed mass may sit from 1 and still count as full.
    ///
    /// Every `f32` weight is off by at most half an `f32` ulp relative to its
    /// value, so weights meant to sum to 1 land within `f32::EPSILON / 2` of
    /// it once added up in `f64`.
    pub const FULL_MASS_TOLERANCE: f64 = f32::EPSILON as f64;

    pub(crate) const fn new(resolution: f32) -> Self {
        Self { resolution }
    }

    pub(crate) fn validate_resolution(resolution: f32) -> Result<f32, SamplerError> {
        if !(0.0..=Self::MAX_RESOLUTION).contains(&resolution) {
            return Err(SamplerError::ResolutionOutOfRange(resolution));
        }
        Ok(resolution)
    }

    pub const fn resolution(&self) -> f32 {
        self.resolution
    }
}

impl Default for Probability {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESOLUTION)
    }
}

impl WeightPolicy for Probability {
    type Weight = f64;

    fn zero(&self) -> f64 {
        0.0
    }

    fn order(&self, a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }

    fn same_class(&self, representative: f64, weight: f64) -> bool {
        (weight - representative).abs() < f64::from(self.resolution)
    }

    fn accumulate(&self, total: f64, weight: f64) -> Option<f64> {
        Some(total + weight)
    }

    // a fully allocated mass must never lose draws to rounding
    fn seal(&self, total: f64) -> f64 {
        if (1.0 - total).abs() <= Self::FULL_MASS_TOLERANCE {
            1.0
        } else {
            total
        }
    }

    fn draw_range(&self, _total: f64) -> Uniform<f64> {
        Uniform::new(0.0, 1.0)
    }

    fn is_hit(&self, r: f64, cumulative: f64) -> bool {
        (r - cumulative).abs() < f64::from(self.resolution)
    }

    fn covers(&self, r: f64, cumulative: f64) -> bool {
        r < cumulative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_edges() {
        let p = Exact;
        assert!(p.same_class(3, 3));
        assert!(!p.same_class(3, 4));
        assert!(p.covers(5, 5));
        assert!(!p.covers(6, 5));
        assert_eq!(p.accumulate(i64::MAX, 1), None);
        assert_eq!(p.accumulate(2, 3), Some(5));
    }

    #[test]
    fn probability_edges() {
        let p = Probability::new(0.01);
        assert!(p.same_class(0.30, 0.305));
        assert!(!p.same_class(0.30, 0.32));
        // strict boundary in the terminal scan
        assert!(!p.covers(0.5, 0.5));
        assert!(p.covers(0.49, 0.5));
        assert!(p.is_hit(0.595, 0.6));
        assert_eq!(p.seal(1.0 - Probability::FULL_MASS_TOLERANCE / 2.0), 1.0);
        assert_eq!(p.seal(1.0 + Probability::FULL_MASS_TOLERANCE), 1.0);
        assert_eq!(p.seal(0.6), 0.6);
    }

    #[test]
    fn zero_resolution_groups_nothing() {
        let p = Probability::new(0.0);
        assert!(!p.same_class(0.25, 0.25));
    }
}

use std::{fmt, mem};

use rand::distributions::uniform::SampleUniform;
use tracing::{debug, warn};

use crate::{
    configure::SamplerConfig,
    decimal::Decimal,
    error::SamplerError,
    sampler::WeightedSampler,
    weight::{Exact, Probability, WeightPolicy, WeightedEntry},
};

/// A raw weight representation accepted by [`Builder::add`].
///
/// The representation validates every weight as it arrives, keeps a running
/// tally to reject overflow early, and finally normalizes the accumulated
/// weights into the policy the sampler runs on.
pub trait Representation {
    type Input: Copy + fmt::Debug + fmt::Display;
    type Tally: Copy + fmt::Debug;
    type Policy: WeightPolicy;

    fn initial_tally(&self) -> Self::Tally;

    /// Tally after admitting `weight`, or why it cannot be admitted.
    fn admit(&self, tally: Self::Tally, weight: Self::Input) -> Result<Self::Tally, SamplerError>;

    fn configure(&mut self, _config: &SamplerConfig) -> Result<(), SamplerError> {
        Ok(())
    }

    /// Called with the final tally right before the sampler is built.
    fn inspect(&self, _tally: Self::Tally) {}

    #[allow(clippy::type_complexity)]
    fn normalize<T>(
        &self,
        entries: Vec<WeightedEntry<T, Self::Input>>,
    ) -> Result<
        (
            Self::Policy,
            Vec<WeightedEntry<T, <Self::Policy as WeightPolicy>::Weight>>,
        ),
        SamplerError,
    >;
}

/// Exact `i64` weights. The tally is the capacity left below `i64::MAX`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerWeights;

impl Representation for IntegerWeights {
    type Input = i64;
    type Tally = i64;
    type Policy = Exact;

    fn initial_tally(&self) -> i64 {
        i64::MAX
    }

    fn admit(&self, remaining: i64, weight: i64) -> Result<i64, SamplerError> {
        if weight <= 0 {
            return Err(SamplerError::NonPositiveWeight(weight.to_string()));
        }
        match remaining.checked_sub(weight) {
            Some(left) if left >= 0 => Ok(left),
            _ => Err(SamplerError::capacity(i64::MAX - remaining, weight)),
        }
    }

    fn normalize<T>(
        &self,
        entries: Vec<WeightedEntry<T, i64>>,
    ) -> Result<(Exact, Vec<WeightedEntry<T, i64>>), SamplerError> {
        Ok((Exact, entries))
    }
}

/// Decimal weights, rescaled to the largest scale among them before the
/// sampler is built. The tally is the exact running sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalWeights;

impl Representation for DecimalWeights {
    type Input = Decimal;
    type Tally = Decimal;
    type Policy = Exact;

    fn initial_tally(&self) -> Decimal {
        Decimal::from(0)
    }

    fn admit(&self, total: Decimal, weight: Decimal) -> Result<Decimal, SamplerError> {
        if !weight.is_positive() {
            return Err(SamplerError::NonPositiveWeight(weight.to_string()));
        }
        // the sum is kept at the largest scale seen, so it always fits once normalized
        total
            .checked_add(&weight)
            .ok_or_else(|| SamplerError::capacity(total, weight))
    }

    fn normalize<T>(
        &self,
        entries: Vec<WeightedEntry<T, Decimal>>,
    ) -> Result<(Exact, Vec<WeightedEntry<T, i64>>), SamplerError> {
        let scale = entries
            .iter()
            .map(|entry| entry.weight.scale())
            .max()
            .unwrap_or_default();
        debug!("normalizing decimal weights to scale {}", scale);
        let entries = entries
            .into_iter()
            .map(|WeightedEntry { item, weight }| {
                weight
                    .rescale(scale)
                    .map(|weight| WeightedEntry::new(item, weight))
                    .ok_or_else(|| SamplerError::capacity(i64::MAX, weight))
            })
            .collect::<Result<_, _>>()?;
        Ok((Exact, entries))
    }
}

/// Absolute probabilities in `(0, 1]`. The tally is the committed mass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbabilityWeights {
    policy: Probability,
}

impl ProbabilityWeights {
    fn set_resolution(&mut self, resolution: f32) -> Result<(), SamplerError> {
        self.policy = Probability::new(Probability::validate_resolution(resolution)?);
        Ok(())
    }
}

impl Representation for ProbabilityWeights {
    type Input = f32;
    type Tally = f64;
    type Policy = Probability;

    fn initial_tally(&self) -> f64 {
        0.0
    }

    fn admit(&self, mass: f64, weight: f32) -> Result<f64, SamplerError> {
        if weight.is_nan() || weight > 1.0 {
            return Err(SamplerError::ProbabilityOutOfRange(weight));
        }
        if weight <= 0.0 {
            return Err(SamplerError::NonPositiveWeight(weight.to_string()));
        }
        let committed = mass + f64::from(weight);
        if committed > 1.0 + Probability::FULL_MASS_TOLERANCE {
            return Err(SamplerError::capacity(mass, weight));
        }
        Ok(committed)
    }

    fn configure(&mut self, config: &SamplerConfig) -> Result<(), SamplerError> {
        self.set_resolution(config.resolution)
    }

    fn inspect(&self, mass: f64) {
        if mass < 1.0 - Probability::FULL_MASS_TOLERANCE {
            warn!(
                "probability mass {} is below 1, {:.2}% of draws select nothing",
                mass,
                (1.0 - mass) * 100.0
            );
        }
    }

    fn normalize<T>(
        &self,
        entries: Vec<WeightedEntry<T, f32>>,
    ) -> Result<(Probability, Vec<WeightedEntry<T, f64>>), SamplerError> {
        let entries = entries
            .into_iter()
            .map(|WeightedEntry { item, weight }| WeightedEntry::new(item, f64::from(weight)))
            .collect();
        Ok((self.policy, entries))
    }
}

/// Accumulates validated `(item, weight)` pairs and builds an immutable
/// [`WeightedSampler`].
///
/// ```
/// use weighted_sampler::Builder;
///
/// let mut builder = Builder::integer();
/// builder.add("a", 1)?.add("b", 1)?.add("c", 2)?;
/// let mut sampler = builder.build()?;
/// assert_eq!(sampler.item_count(), 3);
/// assert_eq!(sampler.bucket_count(), 2);
/// assert!(["a", "b", "c"].contains(sampler.next_item()));
/// # Ok::<(), weighted_sampler::SamplerError>(())
/// ```
#[derive(Debug)]
pub struct Builder<T, R: Representation> {
    representation: R,
    entries: Vec<WeightedEntry<T, R::Input>>,
    tally: R::Tally,
    config: SamplerConfig,
}

pub type IntegerBuilder<T> = Builder<T, IntegerWeights>;
pub type DecimalBuilder<T> = Builder<T, DecimalWeights>;
pub type ProbabilityBuilder<T> = Builder<T, ProbabilityWeights>;

impl<T> Builder<T, IntegerWeights> {
    pub fn integer() -> Self {
        Self::with_representation(IntegerWeights)
    }
}

impl<T> Builder<T, DecimalWeights> {
    pub fn decimal() -> Self {
        Self::with_representation(DecimalWeights)
    }
}

impl<T> Builder<T, ProbabilityWeights> {
    pub fn probability() -> Self {
        Self::with_representation(ProbabilityWeights::default())
    }

    /// Sets the tolerance below which two probabilities count as equal.
    pub fn resolution(&mut self, resolution: f32) -> Result<&mut Self, SamplerError> {
        self.representation.set_resolution(resolution)?;
        self.config.resolution = resolution;
        Ok(self)
    }

    /// Probability mass committed so far. Anything short of 1 is the share of
    /// draws that will select no item.
    pub const fn capacity(&self) -> f64 {
        self.tally
    }
}

impl<T, R: Representation> Builder<T, R> {
    pub fn with_representation(representation: R) -> Self {
        Self {
            tally: representation.initial_tally(),
            representation,
            entries: Vec::new(),
            config: SamplerConfig::default(),
        }
    }

    /// Applies seed and batch size, and the resolution for probabilities.
    /// The resolution is validated for every representation.
    pub fn configure(&mut self, config: &SamplerConfig) -> Result<&mut Self, SamplerError> {
        Probability::validate_resolution(config.resolution)?;
        self.representation.configure(config)?;
        self.config = *config;
        Ok(self)
    }

    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn batch_size(&mut self, batch_size: usize) -> &mut Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Adds `item` with `weight`. A rejected weight leaves the builder as it was.
    pub fn add(&mut self, item: T, weight: R::Input) -> Result<&mut Self, SamplerError> {
        self.tally = self.representation.admit(self.tally, weight)?;
        self.entries.push(WeightedEntry::new(item, weight));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the sampler from everything added so far and resets the builder.
    pub fn build(&mut self) -> Result<WeightedSampler<T, R::Policy>, SamplerError>
    where
        <<R::Policy as WeightPolicy>::Weight as SampleUniform>::Sampler: Clone,
    {
        if self.entries.is_empty() {
            return Err(SamplerError::Empty);
        }
        let entries = mem::take(&mut self.entries);
        let tally = mem::replace(&mut self.tally, self.representation.initial_tally());
        debug!("building sampler from {} items, tally: {:?}", entries.len(), tally);
        self.representation.inspect(tally);
        let (policy, entries) = self.representation.normalize(entries)?;
        WeightedSampler::new(policy, entries, &self.config)
    }
}

//! Perturbation source for future-dated ("predicted") probabilities.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Half-width of the perturbation band, in percentage points.
pub const JITTER_SPAN: f64 = 5.0;

/// Produces one perturbation per forecast month.
pub trait Jitter {
    /// A value in `[-JITTER_SPAN, JITTER_SPAN)`.
    fn sample(&mut self) -> f64;
}

/// Uniform noise from a seedable RNG.
#[derive(Debug, Clone)]
pub struct UniformJitter {
    rng: StdRng,
}

impl UniformJitter {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Jitter for UniformJitter {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(-JITTER_SPAN..JITTER_SPAN)
    }
}

/// Always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&mut self) -> f64 {
        0.0
    }
}

/// Always the same value; handy for pinning the perturbed path in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// How each request obtains its jitter source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterMode {
    /// Fresh entropy per request.
    #[default]
    Random,
    /// Every request replays the same sequence.
    Seeded(u64),
    /// Predictions are not perturbed.
    Disabled,
}

impl JitterMode {
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or(Self::Random, Self::Seeded)
    }

    pub fn build(&self) -> Box<dyn Jitter + Send> {
        match self {
            Self::Random => Box::new(UniformJitter::from_entropy()),
            Self::Seeded(seed) => Box::new(UniformJitter::seeded(*seed)),
            Self::Disabled => Box::new(NoJitter),
        }
    }
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Raw metric values before alert evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub cpu: f64,
    pub mem: f64,
    pub disk: f64,
    pub temperature: f64,
}

/// Produces one sample per generation tick.
pub trait ReadingSource: Send {
    fn sample(&mut self) -> Sample;
}

/// Uniformly distributed samples within plausible ranges.
#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingSource for RandomSource {
    fn sample(&mut self) -> Sample {
        Sample {
            cpu: self.rng.gen_range(5.0..100.0),
            mem: self.rng.gen_range(10.0..95.0),
            disk: self.rng.gen_range(5.0..95.0),
            temperature: self.rng.gen_range(18.0..95.0),
        }
    }
}

/// Replays a fixed list of samples, repeating the last one once exhausted.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    samples: Vec<Sample>,
    position: usize,
}

impl SequenceSource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            position: 0,
        }
    }
}

impl ReadingSource for SequenceSource {
    fn sample(&mut self) -> Sample {
        let fallback = Sample {
            cpu: 0.0,
            mem: 0.0,
            disk: 0.0,
            temperature: 0.0,
        };

        let index = self.position.min(self.samples.len().saturating_sub(1));
        self.position += 1;
        self.samples.get(index).copied().unwrap_or(fallback)
    }
}

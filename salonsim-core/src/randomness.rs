//! Seeded random stream for deterministic simulation.
//!
//! A simulation owns exactly one [`RandomStream`] and threads it explicitly to
//! every process that samples, so two simulations built with the same seed
//! draw the same numbers in the same order, even side by side in one process.

use rand::distributions::Open01;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use tracing::trace;

use crate::error::SimError;

#[derive(Debug, Clone)]
pub struct RandomStream {
    seed: u64,
    rng: ChaCha8Rng,
    draws: u64,
}

impl RandomStream {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of samples taken so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    /// Uniform draw in the open interval `(0, 1)`.
    pub fn open_unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.sample(Open01)
    }

    /// Exponential draw with the given mean: `-mean * ln(U)`, `U ∈ (0, 1)`.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        let u = self.open_unit();
        let value = -mean * u.ln();
        trace!(mean, value, "Exponential draw");
        value
    }

    /// Uniform draw in `[min, max)`; `min` itself when the range is empty.
    pub fn uniform_between(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.unit()
    }

    /// Uniformly chosen index into a collection of `len` items.
    pub fn choose_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.draws += 1;
        Some(self.rng.gen_range(0..len))
    }

    /// Poisson draw with the given mean.
    pub fn poisson(&mut self, mean: f64) -> Result<u64, SimError> {
        let dist = Poisson::new(mean)
            .map_err(|e| SimError::Configuration(format!("invalid Poisson mean {mean}: {e}")))?;
        self.draws += 1;
        let value: f64 = dist.sample(&mut self.rng);
        Ok(value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomStream::new(10);
        let mut b = RandomStream::new(10);
        for _ in 0..100 {
            assert_eq!(a.unit().to_bits(), b.unit().to_bits());
        }
        assert_eq!(a.draws(), 100);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = RandomStream::new(1);
        let mut b = RandomStream::new(2);
        let xs: Vec<u64> = (0..8).map(|_| a.unit().to_bits()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.unit().to_bits()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_open_unit_never_hits_bounds() {
        let mut rng = RandomStream::new(3);
        for _ in 0..10_000 {
            let u = rng.open_unit();
            assert!(u > 0.0 && u < 1.0);
        }
    }

    #[test]
    fn test_exponential_is_positive_with_plausible_mean() {
        let mut rng = RandomStream::new(4);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| rng.exponential(15.0)).sum();
        let mean = total / n as f64;
        assert!(mean > 14.0 && mean < 16.0, "sample mean {mean}");
    }

    #[test]
    fn test_uniform_between_stays_in_range() {
        let mut rng = RandomStream::new(5);
        for _ in 0..1_000 {
            let v = rng.uniform_between(15.0, 35.0);
            assert!((15.0..35.0).contains(&v));
        }
        assert_eq!(rng.uniform_between(10.0, 10.0), 10.0);
    }

    #[test]
    fn test_choose_index() {
        let mut rng = RandomStream::new(6);
        assert_eq!(rng.choose_index(0), None);
        for _ in 0..100 {
            assert!(rng.choose_index(5).unwrap() < 5);
        }
        assert_eq!(rng.choose_index(1), Some(0));
    }

    #[test]
    fn test_poisson() {
        let mut rng = RandomStream::new(7);
        let n = 5_000;
        let total: u64 = (0..n).map(|_| rng.poisson(15.0).unwrap()).sum();
        let mean = total as f64 / n as f64;
        assert!(mean > 14.5 && mean < 15.5, "sample mean {mean}");
        assert!(matches!(rng.poisson(0.0), Err(SimError::Configuration(_))));
    }
}

//! Random variate generation for Bayesian bandits

use rand::Rng;
use rand_distr::StandardNormal;

/// Sample from `Gamma(shape, 1)`.
///
/// Marsaglia and Tsang's method for `shape >= 1`; smaller shapes are boosted
/// with `Gamma(a) = Gamma(a + 1) * U^(1/a)`. The rejection loop runs until a
/// sample is accepted. `shape` must be positive and finite.
pub fn sample_gamma<R: Rng + ?Sized>(shape: f64, rng: &mut R) -> f64 {
    if shape < 1.0 {
        let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
        return sample_gamma(shape + 1.0, rng) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    loop {
        let x: f64 = rng.sample(StandardNormal);
        let v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }

        let v = v * v * v;
        let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);

        if u < 1.0 - 0.0331 * x.powi(4) || u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Sample from `Beta(alpha, beta)` as `X / (X + Y)` with
/// `X ~ Gamma(alpha, 1)` and `Y ~ Gamma(beta, 1)`
pub fn sample_beta<R: Rng + ?Sized>(alpha: f64, beta: f64, rng: &mut R) -> f64 {
    let x = sample_gamma(alpha, rng);
    let y = sample_gamma(beta, rng);
    let total = x + y;

    // Both draws can underflow for tiny shapes
    if total <= 0.0 {
        return alpha / (alpha + beta);
    }

    x / total
}

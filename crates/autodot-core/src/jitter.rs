//! Uniform-disk spatial jitter.

use rand::Rng;

/// Sample a point uniformly (by area) from the disk of `radius` around
/// `center`.
///
/// A `radius` of zero (or anything non-positive / non-finite) returns
/// `center` unchanged, so zero-jitter points fire at exact coordinates.
pub fn sample(center: (f64, f64), radius: f64) -> (f64, f64) {
    sample_with(center, radius, &mut rand::thread_rng())
}

/// Same as [`sample`] but with an explicit RNG, for deterministic tests.
pub fn sample_with<R: Rng + ?Sized>(center: (f64, f64), radius: f64, rng: &mut R) -> (f64, f64) {
    if !(radius > 0.0) {
        return center;
    }
    let theta = rng.gen::<f64>() * std::f64::consts::TAU;
    // sqrt keeps the distribution uniform by area; without it samples
    // cluster toward the center.
    let r = radius * rng.gen::<f64>().sqrt();
    (center.0 + r * theta.cos(), center.1 + r * theta.sin())
}

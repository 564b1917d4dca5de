//! Holographic Reduced Representations (HRR)
//!
//! Fixed-width real vector representation with algebraic operations:
//! - Superposition (+): merge traces while preserving similarity to each
//! - Convolution (⊛): circular-convolution binding, computed in the
//!   frequency domain
//! - Random index permutations for role/order encoding
//! - Cosine similarity for retrieval

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::StandardNormal;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Default vector dimensionality. The literature uses 64 to 2048 depending
/// on how much retrieval noise is tolerable; 512 is a generous middle.
pub const DEFAULT_DIM: usize = 512;

/// A holographic reduced representation: a fixed-width real vector.
///
/// Symbol vectors are drawn i.i.d. from a zero-mean Gaussian and
/// unit-normalized, which makes unrelated vectors nearly orthogonal in
/// expectation. Accumulators start from [`Hrr::zeros`] and grow by
/// superposition, so their magnitude reflects accumulated evidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hrr {
    v: Vec<f64>,
}

impl Hrr {
    /// Create the zero vector of dimensionality `n` (the empty accumulator).
    pub fn zeros(n: usize) -> Self {
        Hrr { v: vec![0.0; n] }
    }

    /// Draw a fresh random unit vector of dimensionality `n`.
    ///
    /// Components are sampled from a zero-mean Gaussian with sd `1/n` and
    /// the result is normalized to unit length.
    pub fn random(n: usize, rng: &mut StdRng) -> Self {
        let sd = 1.0 / n as f64;
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            let g: f64 = rng.sample(StandardNormal);
            v.push(g * sd);
        }
        let mut hrr = Hrr { v };
        hrr.normalize();
        hrr
    }

    /// Wrap an existing component vector.
    pub fn from_vec(v: Vec<f64>) -> Self {
        Hrr { v }
    }

    /// Vector dimensionality.
    pub fn dim(&self) -> usize {
        self.v.len()
    }

    /// Raw components.
    pub fn as_slice(&self) -> &[f64] {
        &self.v
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.v.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Scale to unit length in place. The zero vector is left unchanged.
    pub fn normalize(&mut self) {
        let nrm = self.norm();
        if nrm > 0.0 {
            for x in &mut self.v {
                *x /= nrm;
            }
        }
    }

    /// Unit-length copy.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.normalize();
        out
    }

    /// Componentwise sum: `self + other`.
    pub fn superpose(&self, other: &Hrr) -> Hrr {
        debug_assert_eq!(self.dim(), other.dim(), "dimensionality mismatch");
        let v = self
            .v
            .iter()
            .zip(&other.v)
            .map(|(a, b)| a + b)
            .collect();
        Hrr { v }
    }

    /// Superpose `other` into `self` in place.
    pub fn accumulate(&mut self, other: &Hrr) {
        debug_assert_eq!(self.dim(), other.dim(), "dimensionality mismatch");
        for (a, b) in self.v.iter_mut().zip(&other.v) {
            *a += b;
        }
    }

    /// Subtract `other` from `self` in place (negated evidence).
    pub fn retract(&mut self, other: &Hrr) {
        debug_assert_eq!(self.dim(), other.dim(), "dimensionality mismatch");
        for (a, b) in self.v.iter_mut().zip(&other.v) {
            *a -= b;
        }
    }

    /// Scale every component in place (decay / forgetting).
    pub fn scale(&mut self, k: f64) {
        for x in &mut self.v {
            *x *= k;
        }
    }

    /// Negated copy: `-self`.
    pub fn negate(&self) -> Hrr {
        Hrr {
            v: self.v.iter().map(|x| -x).collect(),
        }
    }

    /// Add zero-mean Gaussian noise with standard deviation `sd` to every
    /// component in place (time-scaled corruption).
    pub fn perturb(&mut self, sd: f64, rng: &mut StdRng) {
        for x in &mut self.v {
            let g: f64 = rng.sample(StandardNormal);
            *x += g * sd;
        }
    }

    /// Raw circular convolution: `self ⊛ other`.
    ///
    /// Computed as the inverse Fourier transform of the elementwise product
    /// of the forward transforms. No renormalization is applied, so the
    /// magnitude of chained traces carries through superposition.
    pub fn convolve(&self, other: &Hrr) -> Hrr {
        debug_assert_eq!(self.dim(), other.dim(), "dimensionality mismatch");
        Hrr {
            v: circular_convolution(&self.v, &other.v),
        }
    }

    /// Similarity-preserving binding: circular convolution followed by
    /// renormalization.
    ///
    /// # Examples
    ///
    /// ```
    /// use holomem::Hrr;
    /// use rand::SeedableRng;
    ///
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    /// let a = Hrr::random(256, &mut rng);
    /// let b = Hrr::random(256, &mut rng);
    ///
    /// let bound = a.bind(&b);
    /// // The binding resembles neither of its inputs.
    /// assert!(bound.compare(&a).abs() < 0.3);
    /// assert!(bound.compare(&b).abs() < 0.3);
    /// ```
    pub fn bind(&self, other: &Hrr) -> Hrr {
        let mut out = self.convolve(other);
        out.normalize();
        out
    }

    /// Approximate inverse under convolution: element 0 is kept and the
    /// remainder is reversed.
    pub fn involution(&self) -> Hrr {
        let n = self.v.len();
        let mut v = Vec::with_capacity(n);
        v.push(self.v[0]);
        for i in 1..n {
            v.push(self.v[n - i]);
        }
        Hrr { v }
    }

    /// Circular correlation: convolve the involution of `self` with `other`.
    ///
    /// Recovers an approximation of `b` from a bound pair:
    ///
    /// ```
    /// use holomem::Hrr;
    /// use rand::SeedableRng;
    ///
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    /// let a = Hrr::random(1024, &mut rng);
    /// let b = Hrr::random(1024, &mut rng);
    ///
    /// let trace = a.bind(&b);
    /// let recovered = a.correlate(&trace);
    /// assert!(recovered.compare(&b) > 0.4);
    /// ```
    pub fn correlate(&self, other: &Hrr) -> Hrr {
        self.involution().convolve(other)
    }

    /// Reorder components by a fixed permutation: `out[p[i]] = self[i]`.
    pub fn permute(&self, p: &Permutation) -> Hrr {
        debug_assert_eq!(self.dim(), p.len(), "permutation length mismatch");
        let mut v = vec![0.0; self.v.len()];
        for (i, &x) in self.v.iter().enumerate() {
            v[p.map[i]] = x;
        }
        Hrr { v }
    }

    /// Dot product.
    pub fn dot(&self, other: &Hrr) -> f64 {
        self.v.iter().zip(&other.v).map(|(a, b)| a * b).sum()
    }

    /// Cosine similarity in [-1, 1]; defined as 0 when either norm is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use holomem::Hrr;
    /// use rand::SeedableRng;
    ///
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    /// let a = Hrr::random(512, &mut rng);
    /// assert!((a.compare(&a) - 1.0).abs() < 1e-9);
    /// assert_eq!(a.compare(&Hrr::zeros(512)), 0.0);
    /// ```
    pub fn compare(&self, other: &Hrr) -> f64 {
        let scale = self.norm() * other.norm();
        if scale == 0.0 {
            return 0.0;
        }
        self.dot(other) / scale
    }
}

/// A fixed random reordering of vector indices, used as a role marker:
/// permuting a value vector by a slot's permutation encodes "value filling
/// this slot", and a distinguished `left` permutation makes ordered binding
/// non-commutative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permutation {
    map: Vec<usize>,
}

impl Permutation {
    /// Draw a uniformly random permutation of `[0..n)`.
    pub fn random(n: usize, rng: &mut StdRng) -> Self {
        let mut map: Vec<usize> = (0..n).collect();
        map.shuffle(rng);
        Permutation { map }
    }

    /// The identity permutation.
    pub fn identity(n: usize) -> Self {
        Permutation {
            map: (0..n).collect(),
        }
    }

    /// Number of indices covered.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True for the zero-length permutation.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The inverse reordering.
    pub fn inverse(&self) -> Permutation {
        let mut map = vec![0; self.map.len()];
        for (i, &j) in self.map.iter().enumerate() {
            map[j] = i;
        }
        Permutation { map }
    }
}

/// Circular convolution of two equal-length real vectors via FFT.
fn circular_convolution(a: &[f64], b: &[f64]) -> Vec<f64> {
    let n = a.len();
    let mut fa: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let mut fb: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut fa);
    fft.process(&mut fb);

    let mut prod: Vec<Complex<f64>> = fa.iter().zip(&fb).map(|(x, y)| x * y).collect();

    let ifft = planner.plan_fft_inverse(n);
    ifft.process(&mut prod);

    // rustfft leaves the inverse transform unscaled
    prod.iter().map(|c| c.re / n as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xC0FFEE)
    }

    #[test]
    fn random_vectors_are_unit_length() {
        let mut rng = rng();
        let v = Hrr::random(512, &mut rng);
        assert!((v.norm() - 1.0).abs() < 1e-9, "norm = {}", v.norm());
    }

    #[test]
    fn convolve_with_delta_is_identity() {
        let mut rng = rng();
        let a = Hrr::random(64, &mut rng);
        let mut delta = vec![0.0; 64];
        delta[0] = 1.0;
        let out = a.convolve(&Hrr::from_vec(delta));
        for (x, y) in out.as_slice().iter().zip(a.as_slice()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn convolution_is_commutative() {
        let mut rng = rng();
        let a = Hrr::random(128, &mut rng);
        let b = Hrr::random(128, &mut rng);
        let ab = a.convolve(&b);
        let ba = b.convolve(&a);
        assert!(ab.compare(&ba) > 1.0 - 1e-9);
    }

    #[test]
    fn convolution_distributes_over_superposition() {
        let mut rng = rng();
        let a = Hrr::random(128, &mut rng);
        let b = Hrr::random(128, &mut rng);
        let c = Hrr::random(128, &mut rng);
        let left = a.convolve(&b.superpose(&c));
        let right = a.convolve(&b).superpose(&a.convolve(&c));
        for (x, y) in left.as_slice().iter().zip(right.as_slice()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn permutation_roundtrip() {
        let mut rng = rng();
        let a = Hrr::random(256, &mut rng);
        let p = Permutation::random(256, &mut rng);
        let back = a.permute(&p).permute(&p.inverse());
        assert!(back.compare(&a) > 1.0 - 1e-9);
    }

    #[test]
    fn permuted_vector_is_dissimilar() {
        let mut rng = rng();
        let a = Hrr::random(512, &mut rng);
        let p = Permutation::random(512, &mut rng);
        assert!(a.permute(&p).compare(&a).abs() < 0.2);
    }

    #[test]
    fn negate_flips_similarity() {
        let mut rng = rng();
        let a = Hrr::random(128, &mut rng);
        assert!((a.negate().compare(&a) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_norm_compare_is_zero() {
        let z = Hrr::zeros(64);
        let mut rng = rng();
        let a = Hrr::random(64, &mut rng);
        assert_eq!(z.compare(&a), 0.0);
        assert_eq!(a.compare(&z), 0.0);
    }
}

//! Symbol environment and role table.
//!
//! Tokens map to stable random basis vectors, slot names map to random
//! index permutations. Both are created lazily on first sight and never
//! mutated afterwards.

use crate::hrr::{Hrr, Permutation};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Lazy environment of token vectors and slot permutations.
///
/// Owns the store's random source, so a seeded `SymbolSpace` reproduces the
/// same basis vectors in the same creation order.
#[derive(Debug)]
pub struct SymbolSpace {
    dim: usize,
    rng: StdRng,
    symbols: HashMap<String, Hrr>,
    roles: HashMap<String, Permutation>,
    placeholder: Hrr,
    left: Permutation,
}

impl SymbolSpace {
    /// Create a symbol space of dimensionality `dim`.
    ///
    /// With `seed = None` the random source is drawn from entropy.
    pub fn new(dim: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let placeholder = Hrr::random(dim, &mut rng);
        let left = Permutation::random(dim, &mut rng);
        SymbolSpace {
            dim,
            rng,
            symbols: HashMap::new(),
            roles: HashMap::new(),
            placeholder,
            left,
        }
    }

    /// Vector dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The vector for `token`, drawing a fresh random unit vector the first
    /// time the token is seen. Idempotent: repeated calls return the same
    /// vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use holomem::SymbolSpace;
    ///
    /// let mut space = SymbolSpace::new(256, Some(1));
    /// let first = space.symbol("apple").clone();
    /// let second = space.symbol("apple").clone();
    /// assert_eq!(first, second);
    /// ```
    pub fn symbol(&mut self, token: &str) -> &Hrr {
        if !self.symbols.contains_key(token) {
            let v = Hrr::random(self.dim, &mut self.rng);
            self.symbols.insert(token.to_string(), v);
        }
        &self.symbols[token]
    }

    /// Whether `token` has a basis vector already.
    pub fn is_known(&self, token: &str) -> bool {
        self.symbols.contains_key(token)
    }

    /// The role permutation for `slot`, created on first sight.
    pub fn role(&mut self, slot: &str) -> &Permutation {
        if !self.roles.contains_key(slot) {
            let p = Permutation::random(self.dim, &mut self.rng);
            self.roles.insert(slot.to_string(), p);
        }
        &self.roles[slot]
    }

    /// The fixed vector standing in for the `?` wildcard.
    pub fn placeholder(&self) -> &Hrr {
        &self.placeholder
    }

    /// The distinguished permutation that imposes left-to-right order on
    /// slotless records.
    pub fn left(&self) -> &Permutation {
        &self.left
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no token has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_creation_is_idempotent() {
        let mut space = SymbolSpace::new(128, Some(42));
        let a = space.symbol("x").clone();
        let b = space.symbol("x").clone();
        assert_eq!(a, b);
        assert_eq!(space.len(), 1);
    }

    #[test]
    fn distinct_tokens_get_distinct_vectors() {
        let mut space = SymbolSpace::new(256, Some(42));
        let a = space.symbol("x").clone();
        let b = space.symbol("y").clone();
        assert!(a.compare(&b).abs() < 0.3);
    }

    #[test]
    fn seeded_spaces_reproduce() {
        let mut one = SymbolSpace::new(128, Some(9));
        let mut two = SymbolSpace::new(128, Some(9));
        assert_eq!(one.symbol("a"), two.symbol("a"));
        assert_eq!(one.role("slot"), two.role("slot"));
        assert_eq!(one.placeholder(), two.placeholder());
    }

    #[test]
    fn roles_are_stable() {
        let mut space = SymbolSpace::new(64, Some(5));
        let p = space.role("from").clone();
        let q = space.role("from").clone();
        assert_eq!(p, q);
    }
}

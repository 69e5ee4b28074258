//! Set-function transforms over capacity tables indexed by coalition mask.

use super::coalition::Coalition;

/// Möbius transform `m(A) = Σ_{B⊆A} (-1)^{|A\B|} v(B)`.
///
/// Computed in place one criterion at a time, which yields the same
/// alternating sum in `O(n·2^n)`.
pub fn mobius_transform(values: &[f64], n: usize) -> Vec<f64> {
    let mut m = values.to_vec();
    for i in 0..n {
        let bit = 1usize << i;
        for mask in 0..m.len() {
            if mask & bit != 0 {
                m[mask] -= m[mask ^ bit];
            }
        }
    }
    m
}

/// Inverse of [`mobius_transform`]: `v(A) = Σ_{B⊆A} m(B)`.
pub fn zeta_transform(mobius: &[f64], n: usize) -> Vec<f64> {
    let mut v = mobius.to_vec();
    for i in 0..n {
        let bit = 1usize << i;
        for mask in 0..v.len() {
            if mask & bit != 0 {
                v[mask] += v[mask ^ bit];
            }
        }
    }
    v
}

/// Shapley interaction index of every coalition.
///
/// `I(A) = Σ_{B⊇A} m(B) / (|B| − |A| + 1)`. For singletons this is the
/// Shapley value.
pub fn interaction_indices(mobius: &[f64], n: usize) -> Vec<f64> {
    let full = Coalition::full(n);
    let mut indices = vec![0.0; mobius.len()];
    for a in Coalition::all(n) {
        let rest = Coalition::from_bits(full.bits() & !a.bits());
        let a_len = a.len();
        indices[a.index()] = rest
            .subsets()
            .map(|extra| {
                let b = a.union(extra);
                mobius[b.index()] / (b.len() - a_len + 1) as f64
            })
            .sum();
    }
    indices
}

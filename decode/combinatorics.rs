//! Genotype cardinality arithmetic.

use crate::types::DecodeError;

/// Exact binomial coefficient `C(n, k)`, failing when the result does not fit
/// in a `u32`.
pub fn n_choose_k(n: u64, k: u64) -> Result<u32, DecodeError> {
    if k > n {
        return Ok(0);
    }
    let k_small = k.min(n - k);
    let mut result: u64 = 1;
    for i in 1..=k_small {
        // C(n - k_small + i, i) = C(n - k_small + i - 1, i - 1) * (n - k_small + i) / i,
        // and the division is always exact.
        result = result
            .checked_mul(n - k_small + i)
            .ok_or(DecodeError::Overflow { n, k })?
            / i;
        if result > u64::from(u32::MAX) {
            return Err(DecodeError::Overflow { n, k });
        }
    }
    Ok(result as u32)
}

/// The widest row any sample can occupy for a variant.
///
/// Phased data stores one probability per allele for each haplotype. Unphased
/// data stores one probability per unordered genotype, which is the number of
/// multisets of size `max_ploidy` drawn from `n_alleles`.
pub fn max_probabilities(max_ploidy: u8, n_alleles: u16, phased: bool) -> Result<u32, DecodeError> {
    if phased {
        return Ok(u32::from(n_alleles));
    }
    if n_alleles == 0 {
        return Ok(0);
    }
    let n_alleles = u64::from(n_alleles);
    n_choose_k(u64::from(max_ploidy) + n_alleles - 1, n_alleles - 1)
}

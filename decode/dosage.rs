//! Expected allele counts derived from decoded probabilities.
//!
//! Only biallelic variants have a well-defined scalar dosage. Unphased rows of a
//! biallelic variant are ordered by the number of copies of the second allele,
//! so column `j` holds the probability of exactly `j` copies. Phased rows hold
//! one `[P(first), P(second)]` pair per haplotype.

use crate::genotypes::DecodedGenotypes;
use crate::types::DecodeError;
use crate::variant::GenotypeBlock;
use ndarray::Array1;

#[derive(Debug, Clone, PartialEq)]
pub struct MinorAlleleDosage {
    /// Index of the allele being counted: 0 or 1.
    pub allele: u16,
    pub dosage: Array1<f32>,
}

fn require_biallelic(n_alleles: u16) -> Result<(), DecodeError> {
    if n_alleles == 2 {
        Ok(())
    } else {
        Err(DecodeError::UnsupportedDosage(n_alleles))
    }
}

/// Per-sample expected count of the second allele. Missing samples are NaN.
pub fn alt_dosage(
    genotypes: &DecodedGenotypes,
    n_alleles: u16,
) -> Result<Array1<f32>, DecodeError> {
    require_biallelic(n_alleles)?;
    let dosage = (0..genotypes.n_samples())
        .map(|sample| {
            if genotypes.is_missing(sample as u32) {
                return f32::NAN;
            }
            let Some(rows) = genotypes.sample_rows(sample) else {
                return f32::NAN;
            };
            if genotypes.phased() {
                rows.column(1).sum()
            } else {
                let copies = genotypes.ploidy()[sample] as usize;
                rows.row(0)
                    .iter()
                    .take(copies + 1)
                    .enumerate()
                    .map(|(j, &p)| j as f32 * p)
                    .sum::<f32>()
            }
        })
        .collect();
    Ok(dosage)
}

/// Counts whichever allele is rarer across the samples that decoded to a
/// number. Ties count the second allele.
pub fn minor_allele_dosage(
    genotypes: &DecodedGenotypes,
    n_alleles: u16,
) -> Result<MinorAlleleDosage, DecodeError> {
    let alt = alt_dosage(genotypes, n_alleles)?;

    let mut alt_total = 0f64;
    let mut ploidy_total = 0f64;
    for (&d, &p) in alt.iter().zip(genotypes.ploidy()) {
        if !d.is_nan() {
            alt_total += f64::from(d);
            ploidy_total += f64::from(p);
        }
    }

    if alt_total > ploidy_total / 2.0 {
        let ref_dosage = alt
            .iter()
            .zip(genotypes.ploidy())
            .map(|(&d, &p)| f32::from(p) - d)
            .collect();
        Ok(MinorAlleleDosage {
            allele: 0,
            dosage: ref_dosage,
        })
    } else {
        Ok(MinorAlleleDosage {
            allele: 1,
            dosage: alt,
        })
    }
}

impl GenotypeBlock {
    pub fn alt_dosage(&mut self) -> Result<Array1<f32>, DecodeError> {
        let n_alleles = self.n_alleles();
        alt_dosage(self.genotypes()?, n_alleles)
    }

    pub fn minor_allele_dosage(&mut self) -> Result<MinorAlleleDosage, DecodeError> {
        let n_alleles = self.n_alleles();
        minor_allele_dosage(self.genotypes()?, n_alleles)
    }
}

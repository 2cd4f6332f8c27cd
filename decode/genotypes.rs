use ndarray::{Array2, ArrayView2, s};

/// The decoded contents of one genotype block.
///
/// `probs` is row-major with `max_probs` columns. Unphased blocks have one row per
/// sample; phased blocks have one row per haplotype, so sample `i` owns
/// `ploidy[i]` consecutive rows. Columns past a row's own cardinality are NaN.
#[derive(Debug, Clone)]
pub struct DecodedGenotypes {
    phased: bool,
    min_ploidy: u8,
    max_ploidy: u8,
    ploidy: Vec<u8>,
    missing: Vec<u32>,
    row_starts: Vec<usize>,
    probs: Array2<f32>,
}

/// Row offsets for every sample plus a trailing end marker.
pub fn row_starts(ploidy: &[u8], phased: bool) -> Vec<usize> {
    let mut starts = Vec::with_capacity(ploidy.len() + 1);
    let mut next = 0usize;
    starts.push(next);
    for &p in ploidy {
        next += if phased { p as usize } else { 1 };
        starts.push(next);
    }
    starts
}

impl DecodedGenotypes {
    /// Assembles decoded state and overwrites every row of every missing sample
    /// with NaN.
    pub fn new(
        phased: bool,
        min_ploidy: u8,
        max_ploidy: u8,
        ploidy: Vec<u8>,
        missing: Vec<u32>,
        mut probs: Array2<f32>,
    ) -> Self {
        let row_starts = row_starts(&ploidy, phased);
        debug_assert_eq!(row_starts.last().copied(), Some(probs.nrows()));
        for &sample in &missing {
            let sample = sample as usize;
            probs
                .slice_mut(s![row_starts[sample]..row_starts[sample + 1], ..])
                .fill(f32::NAN);
        }
        Self {
            phased,
            min_ploidy,
            max_ploidy,
            ploidy,
            missing,
            row_starts,
            probs,
        }
    }

    pub fn phased(&self) -> bool {
        self.phased
    }

    pub fn min_ploidy(&self) -> u8 {
        self.min_ploidy
    }

    pub fn max_ploidy(&self) -> u8 {
        self.max_ploidy
    }

    pub fn ploidy(&self) -> &[u8] {
        &self.ploidy
    }

    pub fn missing(&self) -> &[u32] {
        &self.missing
    }

    pub fn is_missing(&self, sample: u32) -> bool {
        self.missing.binary_search(&sample).is_ok()
    }

    pub fn n_samples(&self) -> usize {
        self.ploidy.len()
    }

    pub fn max_probs(&self) -> usize {
        self.probs.ncols()
    }

    pub fn probabilities(&self) -> ArrayView2<'_, f32> {
        self.probs.view()
    }

    /// The rows belonging to `sample`: one row unphased, `ploidy[sample]` rows phased.
    /// `None` when `sample` is not in the block.
    pub fn sample_rows(&self, sample: usize) -> Option<ArrayView2<'_, f32>> {
        let start = *self.row_starts.get(sample)?;
        let end = *self.row_starts.get(sample.checked_add(1)?)?;
        Some(self.probs.slice(s![start..end, ..]))
    }
}

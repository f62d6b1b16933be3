use std::cmp::Ordering;

/// argmax returns the index of the maximum value in the array x (the first one in case of ties).
/// An empty array yields 0.
pub fn argmax(x: &[f64]) -> usize {
    let mut idx_max = 0;
    let mut val_max = match x.first() {
        Some(&val) => val,
        None => return 0,
    };

    for (i, &val) in x.iter().enumerate().skip(1) {
        if val > val_max {
            val_max = val;
            idx_max = i;
        }
    }

    idx_max
}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. The sort is stable, i.e. equal values
/// keep their original order, and NaN values are ordered by `f64::total_cmp`.
pub fn argsort(x: &[f64], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| x[a].total_cmp(&x[b])),
        SortOrder::Descending => indices.sort_by(|&a, &b| x[b].total_cmp(&x[a])),
    }
    indices
}

/// argsort_by_keys sorts by a primary key and breaks ties with a secondary key. Both keys are
/// sorted with their own order.
pub fn argsort_by_keys(
    primary: &[f64],
    primary_order: SortOrder,
    secondary: &[f64],
    secondary_order: SortOrder,
) -> Vec<usize> {
    let cmp = |x: &[f64], order: SortOrder, a: usize, b: usize| -> Ordering {
        match order {
            SortOrder::Ascending => x[a].total_cmp(&x[b]),
            SortOrder::Descending => x[b].total_cmp(&x[a]),
        }
    };

    let mut indices: Vec<usize> = (0..primary.len()).collect();
    indices.sort_by(|&a, &b| {
        cmp(primary, primary_order, a, b).then_with(|| cmp(secondary, secondary_order, a, b))
    });
    indices
}

/// stable_seed returns a 64 bit FNV-1a hash of the given string. In contrast to the hasher of the
/// standard library the result is identical across platforms and program runs.
pub fn stable_seed(key: &str) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// lin_interp returns the linearly interpolated value at x for given discrete data points xp, fp.
/// xp must be increasing and both slices must have the same, non-zero length. Values outside the
/// range of xp are clamped to the first or last value. Inspired by numpy.interp.
pub fn lin_interp(x: f64, xp: &[f64], fp: &[f64]) -> Option<f64> {
    if xp.len() != fp.len() || xp.is_empty() {
        return None;
    }

    if x <= xp[0] {
        return Some(fp[0]);
    }

    for i in 1..xp.len() {
        if x <= xp[i] {
            return Some(fp[i - 1] + (x - xp[i - 1]) * (fp[i] - fp[i - 1]) / (xp[i] - xp[i - 1]));
        }
    }

    fp.last().copied()
}
